//! Per-file ingestion workflow: eligibility → routing → (dedup) → IN_PROGRESS →
//! (checksum gate) → load → SUCCESS / FAILURE handling.
//!
//! One [`IngestPipeline::handle`] call processes exactly one [`FileEvent`] and returns an
//! [`IngestReport`] describing every state the file passed through. The call always
//! completes: load and tracking failures end in a terminal state rather than an error.
//!
//! # Collaborators
//! The pipeline owns no clients. [`Collaborators`] borrows one implementation of each
//! contract from [`crate::contract`], so tests can pass mocks and the CLI passes the HTTP
//! adapters.
//!
//! # Ordering
//! - IN_PROGRESS is reported before the load is submitted.
//! - SUCCESS is reported, and only then is the run-status check triggered.
//! - FAILURE is reported before the failure notification is sent.
//!
//! # Redelivery
//! With a [`DedupStore`] configured, an event whose dedup key was already claimed ends as
//! [`IngestOutcome::Duplicate`] without touching the warehouse or the tracking service.
//! A claim is released again when the invocation ends in a failure or an incomplete load,
//! so the redelivery or manual replay that recovers from it is processed.

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::checksum::ChecksumValidator;
use crate::config::{IncompletePolicy, IngestConfig};
use crate::contract::{DedupStore, LoadService, Notifier, ObjectStore, TableRef, TrackingService};
use crate::eligibility::is_eligible;
use crate::error::{IngestError, Result};
use crate::event::FileEvent;
use crate::load::{LoadClassification, LoadOrchestrator};
use crate::notify::{
    inconsistency_message, integrity_failure_message, load_failure_message, NotificationGateway,
};
use crate::routing::resolve_table;
use crate::status::{StatusReporter, SuccessAck, WorkflowState};

/// Borrowed handles to every external collaborator.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub loader: &'a dyn LoadService,
    pub store: &'a dyn ObjectStore,
    pub tracking: &'a dyn TrackingService,
    pub notifier: &'a dyn Notifier,
    pub dedup: Option<&'a dyn DedupStore>,
}

/// Terminal result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Not in a trigger path or missing the marker.
    Ignored,
    /// Already processed by an earlier delivery.
    Duplicate,
    RunStatusChecked,
    NotifiedInconsistency { response: String, notified: bool },
    FailureReported { reason: String, notified: bool },
    /// The job ended in a non-DONE state without errors and the policy is to ignore it.
    Incomplete { state: String },
}

impl IngestOutcome {
    /// True when the load succeeded, whatever the tracking service said afterwards.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            IngestOutcome::RunStatusChecked | IngestOutcome::NotifiedInconsistency { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub invocation_id: String,
    pub bucket: String,
    pub file: String,
    pub table: Option<String>,
    pub job_id: Option<String>,
    pub states: Vec<WorkflowState>,
    #[serde(flatten)]
    pub outcome: IngestOutcome,
}

/// Result of claiming an event's dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    /// No dedup store, or the store could not be consulted.
    Untracked,
    Claimed,
    AlreadyClaimed,
}

/// Which notification wording a failure gets.
enum FailureKind {
    Load,
    Integrity,
}

pub struct IngestPipeline<'a> {
    config: &'a IngestConfig,
    clients: Collaborators<'a>,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(config: &'a IngestConfig, clients: Collaborators<'a>) -> Self {
        Self { config, clients }
    }

    /// Dry run: the destination table id if the event is eligible.
    pub fn route(&self, event: &FileEvent) -> Option<&'a str> {
        if is_eligible(event, &self.config.eligibility) {
            Some(resolve_table(event, &self.config.routing))
        } else {
            None
        }
    }

    /// Standalone, read-only checksum verification.
    pub async fn verify(&self, event: &FileEvent) -> Result<bool> {
        self.validator().validate(event).await
    }

    /// Run the whole workflow for one event.
    pub async fn handle(&self, event: &FileEvent) -> IngestReport {
        let invocation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "ingest",
            invocation_id = %invocation_id,
            bucket = %event.bucket,
            file = %event.name
        );
        self.handle_inner(event, invocation_id).instrument(span).await
    }

    async fn handle_inner(&self, event: &FileEvent, invocation_id: String) -> IngestReport {
        let mut report = IngestReport {
            invocation_id,
            bucket: event.bucket.clone(),
            file: event.name.clone(),
            table: None,
            job_id: None,
            states: vec![WorkflowState::Pending],
            outcome: IngestOutcome::Ignored,
        };

        let Some(table_id) = self.route(event) else {
            info!("[INGEST] Event is not eligible, ignoring");
            return report;
        };
        let table = self.config.table_ref(table_id);
        report.table = Some(table.to_string());

        let claim = self.claim(event).await;
        if claim == Claim::AlreadyClaimed {
            report.outcome = IngestOutcome::Duplicate;
            return report;
        }

        self.process(event, &table, &mut report).await;

        if claim == Claim::Claimed && !report.outcome.is_success() {
            self.release(event).await;
        }
        info!(outcome = ?report.outcome, "[INGEST] Workflow finished");
        report
    }

    /// IN_PROGRESS, optional checksum gate, load, then the terminal branch.
    async fn process(&self, event: &FileEvent, table: &TableRef, report: &mut IngestReport) {
        let reporter = StatusReporter::new(self.clients.tracking, &self.config.status_codes);
        let orchestrator = LoadOrchestrator::new(self.clients.loader, self.config.load_timeout);
        let descriptor = self.config.descriptor();
        report.states.push(WorkflowState::InProgress);

        let classification = if self.config.checksum.gate {
            orchestrator.picked_up(event, table);
            if let Err(e) = reporter.in_progress(&event.name).await {
                warn!(error = %e, "[INGEST] Could not report IN_PROGRESS, continuing");
            }
            let verified = match self.validator().fetch(event).await {
                Ok(pair) => pair.into_result(),
                Err(e) => Err(e),
            };
            if let Err(e) = verified {
                report.outcome = self
                    .fail(event, table, &reporter, e, FailureKind::Integrity)
                    .await;
                report.states.push(WorkflowState::FailureReported);
                return;
            }
            orchestrator.run(event, table, &descriptor).await
        } else {
            orchestrator.submit(event, table, &descriptor, &reporter).await
        };

        match classification {
            LoadClassification::Success(outcome) => {
                report.job_id = Some(outcome.job_id);
                report.states.push(WorkflowState::SuccessReported);
                match reporter.success(&event.name).await {
                    SuccessAck::RunStatusChecked => {
                        report.states.push(WorkflowState::RunStatusChecked);
                        report.outcome = IngestOutcome::RunStatusChecked;
                    }
                    SuccessAck::NotAcknowledged(response) => {
                        let gateway = NotificationGateway::new(self.clients.notifier);
                        let notified = gateway
                            .notify(&inconsistency_message(event, table, &response))
                            .await;
                        report.states.push(WorkflowState::NotifiedInconsistency);
                        report.outcome = IngestOutcome::NotifiedInconsistency { response, notified };
                    }
                }
            }
            LoadClassification::Failure(e) => {
                if let IngestError::LoadJob { job_id, .. } = &e {
                    report.job_id = Some(job_id.clone());
                }
                report.outcome = self.fail(event, table, &reporter, e, FailureKind::Load).await;
                report.states.push(WorkflowState::FailureReported);
            }
            LoadClassification::Incomplete(outcome) => {
                report.job_id = Some(outcome.job_id.clone());
                let state = outcome.state.to_string();
                match self.config.incomplete_policy {
                    IncompletePolicy::Ignore => {
                        info!(job_id = %outcome.job_id, state = %state, "[INGEST] Ignoring incomplete load job");
                        report.states.push(WorkflowState::Incomplete);
                        report.outcome = IngestOutcome::Incomplete { state };
                    }
                    IncompletePolicy::Fail => {
                        let e = IngestError::LoadIncomplete {
                            job_id: outcome.job_id,
                            state,
                        };
                        report.outcome =
                            self.fail(event, table, &reporter, e, FailureKind::Load).await;
                        report.states.push(WorkflowState::FailureReported);
                    }
                }
            }
        }
    }

    /// FAILURE status, then the alert. Neither step can abort the other.
    async fn fail(
        &self,
        event: &FileEvent,
        table: &TableRef,
        reporter: &StatusReporter<'_>,
        cause: IngestError,
        kind: FailureKind,
    ) -> IngestOutcome {
        warn!(error = %cause, "[INGEST] Taking the failure path");
        if let Err(e) = reporter.failure(&event.name).await {
            warn!(error = %e, "[INGEST] Could not report FAILURE, still notifying");
        }
        let message = match kind {
            FailureKind::Load => load_failure_message(event, table, &cause),
            FailureKind::Integrity => integrity_failure_message(event, table, &cause),
        };
        let notified = NotificationGateway::new(self.clients.notifier)
            .notify(&message)
            .await;
        IngestOutcome::FailureReported {
            reason: cause.to_string(),
            notified,
        }
    }

    /// Claim the event's dedup key. Store errors let the event through untracked.
    async fn claim(&self, event: &FileEvent) -> Claim {
        let Some(store) = self.clients.dedup else {
            return Claim::Untracked;
        };
        let key = event.dedup_key();
        match store.claim(&key).await {
            Ok(true) => Claim::Claimed,
            Ok(false) => {
                info!(key = %key, "[INGEST] Event already processed, skipping redelivery");
                Claim::AlreadyClaimed
            }
            Err(e) => {
                let e = IngestError::Dedup(e);
                warn!(key = %key, error = %e, "[INGEST] Dedup check failed, processing anyway");
                Claim::Untracked
            }
        }
    }

    /// Give the key back so a redelivery or replay of a failed event is processed again.
    async fn release(&self, event: &FileEvent) {
        let Some(store) = self.clients.dedup else {
            return;
        };
        let key = event.dedup_key();
        match store.release(&key).await {
            Ok(()) => info!(key = %key, "[INGEST] Released dedup key for retry"),
            Err(e) => {
                let e = IngestError::Dedup(e);
                warn!(key = %key, error = %e, "[INGEST] Could not release dedup key, a redelivery will be skipped");
            }
        }
    }

    fn validator(&self) -> ChecksumValidator<'a> {
        ChecksumValidator::new(
            self.clients.store,
            self.clients.tracking,
            &self.config.checksum.prefix,
        )
    }
}
