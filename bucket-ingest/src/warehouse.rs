//! BigQuery load adapter.
//!
//! Submits a `load` job through `POST {base}/projects/{project}/jobs` and polls
//! `GET {base}/projects/{project}/jobs/{jobId}?location={location}` until the job reports
//! `DONE`. Job-level errors come back inside the [`JobOutcome`]; only transport and HTTP
//! failures are returned as `Err`.

use async_trait::async_trait;
use bucket_ingest_core::contract::{
    BoxError, ErrorDetail, JobOutcome, JobState, LoadJobDescriptor, LoadRequest, LoadService,
    SourceFormat, TableRef, WriteDisposition,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::{build_client, ensure_success, with_bearer};

pub struct BigQueryLoader {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    poll_interval: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobInsert<'a> {
    configuration: JobConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadConfiguration<'a> {
    source_uris: Vec<&'a str>,
    destination_table: DestinationTable<'a>,
    source_format: SourceFormat,
    field_delimiter: String,
    skip_leading_rows: u32,
    allow_jagged_rows: bool,
    write_disposition: WriteDisposition,
    autodetect: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DestinationTable<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error_result: Option<ErrorDetail>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

fn insert_body<'a>(source_uri: &'a str, table: &'a TableRef, d: &LoadJobDescriptor) -> JobInsert<'a> {
    JobInsert {
        configuration: JobConfiguration {
            load: LoadConfiguration {
                source_uris: vec![source_uri],
                destination_table: DestinationTable {
                    project_id: &table.project_id,
                    dataset_id: &table.dataset_id,
                    table_id: &table.table_id,
                },
                source_format: d.source_format,
                field_delimiter: d.delimiter.to_string(),
                skip_leading_rows: d.skip_leading_rows,
                allow_jagged_rows: d.allow_jagged_rows,
                write_disposition: d.write_disposition,
                autodetect: d.autodetect,
            },
        },
    }
}

impl BigQueryLoader {
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        poll_interval: Duration,
    ) -> Result<Self, BoxError> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into(),
            access_token,
            poll_interval,
        })
    }

    async fn insert(&self, req: &LoadRequest) -> Result<JobResource, BoxError> {
        let url = format!(
            "{}/projects/{}/jobs",
            self.base_url, req.destination.project_id
        );
        let body = insert_body(&req.source_uri, &req.destination, &req.descriptor);
        let resp = with_bearer(self.http.post(url), self.access_token.as_deref())
            .json(&body)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json::<JobResource>().await?)
    }

    async fn get(&self, project: &str, reference: &JobReference) -> Result<JobResource, BoxError> {
        let url = format!("{}/projects/{}/jobs/{}", self.base_url, project, reference.job_id);
        let mut request = with_bearer(self.http.get(url), self.access_token.as_deref());
        if let Some(location) = &reference.location {
            request = request.query(&[("location", location)]);
        }
        let resp = request.send().await?;
        Ok(ensure_success(resp).await?.json::<JobResource>().await?)
    }
}

fn into_outcome(job: JobResource) -> JobOutcome {
    let JobStatus {
        state,
        error_result,
        mut errors,
    } = job.status;
    if errors.is_empty() {
        errors.extend(error_result);
    }
    JobOutcome {
        job_id: job.job_reference.job_id,
        state: JobState::from(state.as_deref().unwrap_or("UNKNOWN")),
        errors,
    }
}

#[async_trait]
impl LoadService for BigQueryLoader {
    async fn run_load(&self, req: &LoadRequest) -> Result<JobOutcome, BoxError> {
        let mut job = self.insert(req).await?;
        tracing::info!(
            job_id = %job.job_reference.job_id,
            source = %req.source_uri,
            table = %req.destination,
            "[LOAD] Job submitted"
        );
        loop {
            if job.status.state.as_deref() == Some("DONE") {
                return Ok(into_outcome(job));
            }
            tracing::debug!(
                job_id = %job.job_reference.job_id,
                state = ?job.status.state,
                "[LOAD] Job not done yet, polling"
            );
            tokio::time::sleep(self.poll_interval).await;
            job = self
                .get(&req.destination.project_id, &job.job_reference)
                .await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_body_matches_load_api_shape() {
        let table = TableRef {
            project_id: "p".into(),
            dataset_id: "d".into(),
            table_id: "t".into(),
        };
        let descriptor = LoadJobDescriptor::csv_append('\t');
        let body = serde_json::to_value(insert_body("gs://b/x.csv", &table, &descriptor)).unwrap();
        let load = &body["configuration"]["load"];
        assert_eq!(load["sourceUris"][0], "gs://b/x.csv");
        assert_eq!(load["destinationTable"]["tableId"], "t");
        assert_eq!(load["sourceFormat"], "CSV");
        assert_eq!(load["fieldDelimiter"], "\t");
        assert_eq!(load["skipLeadingRows"], 1);
        assert_eq!(load["allowJaggedRows"], true);
        assert_eq!(load["writeDisposition"], "WRITE_APPEND");
        assert_eq!(load["autodetect"], false);
    }

    #[test]
    fn error_result_is_kept_when_errors_list_is_empty() {
        let job: JobResource = serde_json::from_value(serde_json::json!({
            "jobReference": {"jobId": "job_1"},
            "status": {
                "state": "DONE",
                "errorResult": {"reason": "invalid", "message": "bad row"}
            }
        }))
        .unwrap();
        let outcome = into_outcome(job);
        assert_eq!(outcome.state, JobState::Done);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].message, "bad row");
    }
}
