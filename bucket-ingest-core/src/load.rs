//! Load-job submission and terminal-outcome classification.
//!
//! [`LoadOrchestrator::submit`] reports IN_PROGRESS, submits the load and waits (bounded by
//! the configured timeout) for the job's terminal state. Whatever happens, the caller
//! gets a [`LoadClassification`]; transport failures and timeouts are folded into
//! [`LoadClassification::Failure`] rather than returned as errors.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::contract::{JobOutcome, JobState, LoadJobDescriptor, LoadRequest, LoadService, TableRef};
use crate::error::IngestError;
use crate::event::FileEvent;
use crate::status::StatusReporter;

/// How a finished (or abandoned) load is treated by the rest of the workflow.
#[derive(Debug)]
pub enum LoadClassification {
    /// No errors and terminal state DONE.
    Success(JobOutcome),
    /// Job errors, transport errors or timeout.
    Failure(IngestError),
    /// Non-DONE state without reported errors.
    Incomplete(JobOutcome),
}

/// Errors take precedence over state; state is only inspected when `errors` is empty.
pub fn classify(outcome: JobOutcome) -> LoadClassification {
    if !outcome.errors.is_empty() {
        return LoadClassification::Failure(IngestError::LoadJob {
            job_id: outcome.job_id,
            errors: outcome.errors,
        });
    }
    match outcome.state {
        JobState::Done => LoadClassification::Success(outcome),
        JobState::Other(_) => LoadClassification::Incomplete(outcome),
    }
}

pub struct LoadOrchestrator<'a> {
    loader: &'a dyn LoadService,
    timeout: Duration,
}

impl<'a> LoadOrchestrator<'a> {
    pub fn new(loader: &'a dyn LoadService, timeout: Duration) -> Self {
        Self { loader, timeout }
    }

    /// Load `event` into `table`. Emits IN_PROGRESS through `reporter` first; a tracking
    /// failure there is logged and does not stop the load.
    pub async fn submit(
        &self,
        event: &FileEvent,
        table: &TableRef,
        descriptor: &LoadJobDescriptor,
        reporter: &StatusReporter<'_>,
    ) -> LoadClassification {
        self.picked_up(event, table);
        if let Err(e) = reporter.in_progress(&event.name).await {
            warn!(file = %event.name, error = %e, "[LOAD] Could not report IN_PROGRESS, continuing");
        }
        self.run(event, table, descriptor).await
    }

    /// Lifecycle log line emitted once per file before its load is attempted.
    pub fn picked_up(&self, event: &FileEvent, table: &TableRef) {
        info!(
            file = %event.name,
            table = %table,
            "[LOAD] The file has been picked up and is going to be stored"
        );
    }

    /// Submit and classify without any status reporting.
    pub async fn run(
        &self,
        event: &FileEvent,
        table: &TableRef,
        descriptor: &LoadJobDescriptor,
    ) -> LoadClassification {
        let req = LoadRequest {
            source_uri: event.source_uri(),
            destination: table.clone(),
            descriptor: descriptor.clone(),
        };

        let outcome = match tokio::time::timeout(self.timeout, self.loader.run_load(&req)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(
                    object = %format!("{}/{}", event.bucket, event.name),
                    table = %table,
                    error = %e,
                    "[LOAD] Error storing data"
                );
                return LoadClassification::Failure(IngestError::LoadSubmission {
                    table: table.to_string(),
                    source: e,
                });
            }
            Err(_) => {
                error!(
                    object = %format!("{}/{}", event.bucket, event.name),
                    table = %table,
                    timeout_secs = self.timeout.as_secs(),
                    "[LOAD] Load job did not finish in time"
                );
                return LoadClassification::Failure(IngestError::LoadTimeout {
                    table: table.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        info!(job_id = %outcome.job_id, file = %event.name, "[LOAD] Job completed");
        let classification = classify(outcome);
        match &classification {
            LoadClassification::Success(_) => {
                info!(file = %event.name, table = %table, "[LOAD] The file has been successfully stored")
            }
            LoadClassification::Failure(IngestError::LoadJob { job_id, errors }) => {
                error!(job_id = %job_id, ?errors, file = %event.name, table = %table, "[LOAD] Job reported errors")
            }
            LoadClassification::Failure(_) => {}
            LoadClassification::Incomplete(outcome) => {
                warn!(job_id = %outcome.job_id, state = ?outcome.state, file = %event.name, "[LOAD] Job ended without DONE state or errors")
            }
        }
        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ErrorDetail;

    fn outcome(state: JobState, errors: Vec<ErrorDetail>) -> JobOutcome {
        JobOutcome {
            job_id: "job-1".into(),
            state,
            errors,
        }
    }

    fn invalid() -> ErrorDetail {
        ErrorDetail {
            reason: "invalid".into(),
            ..Default::default()
        }
    }

    #[test]
    fn errors_mean_failure_whatever_the_state() {
        assert!(matches!(
            classify(outcome(JobState::Done, vec![invalid()])),
            LoadClassification::Failure(IngestError::LoadJob { .. })
        ));
        assert!(matches!(
            classify(outcome(JobState::Other("RUNNING".into()), vec![invalid()])),
            LoadClassification::Failure(IngestError::LoadJob { .. })
        ));
    }

    #[test]
    fn done_without_errors_is_success() {
        assert!(matches!(
            classify(outcome(JobState::Done, vec![])),
            LoadClassification::Success(_)
        ));
    }

    #[test]
    fn other_state_without_errors_is_incomplete() {
        assert!(matches!(
            classify(outcome(JobState::Other("PENDING".into()), vec![])),
            LoadClassification::Incomplete(_)
        ));
    }
}
