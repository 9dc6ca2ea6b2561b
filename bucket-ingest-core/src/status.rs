//! Lifecycle status reporting to the tracking service.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::StatusCodes;
use crate::contract::{TrackingResponse, TrackingService};
use crate::error::{IngestError, Result};

/// Substring the tracking service puts in its body when it actually persisted a change.
pub const UPDATED_MARKER: &str = "Updated";

/// Per-file workflow states. The last four are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Pending,
    InProgress,
    SuccessReported,
    RunStatusChecked,
    NotifiedInconsistency,
    FailureReported,
    Incomplete,
}

pub fn acknowledges_update(response: &TrackingResponse) -> bool {
    response.body.contains(UPDATED_MARKER)
}

/// What followed a SUCCESS report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessAck {
    /// The body contained [`UPDATED_MARKER`]; the run-status check was triggered.
    RunStatusChecked,
    /// The update was not acknowledged. Carries the body, or the transport error text.
    NotAcknowledged(String),
}

pub struct StatusReporter<'a> {
    tracking: &'a dyn TrackingService,
    codes: &'a StatusCodes,
}

impl<'a> StatusReporter<'a> {
    pub fn new(tracking: &'a dyn TrackingService, codes: &'a StatusCodes) -> Self {
        Self { tracking, codes }
    }

    /// Send `code` for `file_name`.
    pub async fn report(&self, file_name: &str, code: &str) -> Result<TrackingResponse> {
        info!(file = file_name, code, "[STATUS] Sending status update");
        self.tracking
            .update_status(file_name, code)
            .await
            .map_err(|source| IngestError::TrackingService {
                operation: "update_status",
                source,
            })
    }

    pub async fn in_progress(&self, file_name: &str) -> Result<TrackingResponse> {
        self.report(file_name, &self.codes.in_progress).await
    }

    pub async fn failure(&self, file_name: &str) -> Result<TrackingResponse> {
        self.report(file_name, &self.codes.failure).await
    }

    /// Report SUCCESS, then trigger the run-status check only if the tracking service
    /// acknowledged the update. The check starts after the report has completed.
    pub async fn success(&self, file_name: &str) -> SuccessAck {
        let response = match self.report(file_name, &self.codes.success).await {
            Ok(response) => response,
            Err(e) => {
                error!(file = file_name, error = %e, "[STATUS] SUCCESS report failed");
                return SuccessAck::NotAcknowledged(e.to_string());
            }
        };

        if !acknowledges_update(&response) {
            warn!(file = file_name, body = %response.body, "[STATUS] Tracking service did not acknowledge SUCCESS");
            return SuccessAck::NotAcknowledged(response.body);
        }

        info!(file = file_name, "[STATUS] SUCCESS acknowledged, triggering run-status check");
        if let Err(e) = self.tracking.check_run_status(file_name).await {
            warn!(file = file_name, error = %e, "[STATUS] Run-status check trigger failed");
        }
        SuccessAck::RunStatusChecked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_bodies_containing_updated_acknowledge() {
        assert!(acknowledges_update(&TrackingResponse::new("Row Updated")));
        assert!(acknowledges_update(&TrackingResponse::new("{\"result\":\"Updated\"}")));
        assert!(!acknowledges_update(&TrackingResponse::new("Not found")));
        assert!(!acknowledges_update(&TrackingResponse::new("updated")));
        assert!(!acknowledges_update(&TrackingResponse::new("")));
    }
}
