//! HTTP client for the tracking service: status updates, run-status checks and expected
//! checksums.
//!
//! - `POST {base}/status` with `{"fileName", "statusCode"}`; the response text is the
//!   `TrackingResponse` body the pipeline inspects.
//! - `POST {base}/runstatus` with `{"fileName"}`; the response is ignored.
//! - `GET {base}/checksum?fileName={key}`; the response text is the expected hash.

use async_trait::async_trait;
use bucket_ingest_core::contract::{BoxError, TrackingResponse, TrackingService};
use serde::Serialize;

use crate::http::{build_client, ensure_success};

pub struct TrackingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate<'a> {
    file_name: &'a str,
    status_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunStatusRequest<'a> {
    file_name: &'a str,
}

impl TrackingClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, BoxError> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into(),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[async_trait]
impl TrackingService for TrackingClient {
    async fn update_status(
        &self,
        file_name: &str,
        code: &str,
    ) -> Result<TrackingResponse, BoxError> {
        tracing::debug!(file = file_name, code, "POST status update");
        let resp = self
            .request(reqwest::Method::POST, "/status")
            .json(&StatusUpdate {
                file_name,
                status_code: code,
            })
            .send()
            .await?;
        let body = ensure_success(resp).await?.text().await?;
        tracing::debug!(file = file_name, body = %body, "Tracking service answered status update");
        Ok(TrackingResponse::new(body))
    }

    async fn check_run_status(&self, file_name: &str) -> Result<(), BoxError> {
        let resp = self
            .request(reqwest::Method::POST, "/runstatus")
            .json(&RunStatusRequest { file_name })
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn get_checksum(&self, key: &str) -> Result<TrackingResponse, BoxError> {
        let resp = self
            .request(reqwest::Method::GET, "/checksum")
            .query(&[("fileName", key)])
            .send()
            .await?;
        let body = ensure_success(resp).await?.text().await?;
        Ok(TrackingResponse::new(body))
    }
}
