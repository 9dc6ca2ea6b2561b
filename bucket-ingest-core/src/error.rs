//! Error taxonomy for a single ingestion invocation.
//!
//! Collaborator traits in [`crate::contract`] return a boxed [`BoxError`]; the component
//! that calls a collaborator wraps that error into one of the variants below so the
//! pipeline can decide which terminal path a file takes.
//!
//! An ineligible event is not an error: it surfaces as
//! [`crate::pipeline::IngestOutcome::Ignored`].

use thiserror::Error;

use crate::contract::{BoxError, ErrorDetail};

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// A required configuration value is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The warehouse service could not be reached, rejected the request, or failed while
    /// the job was being awaited.
    #[error("Load submission into {table} failed: {source}")]
    LoadSubmission {
        table: String,
        #[source]
        source: BoxError,
    },

    /// The load job finished but reported errors.
    #[error("Load job {job_id} reported {} error(s)", .errors.len())]
    LoadJob {
        job_id: String,
        errors: Vec<ErrorDetail>,
    },

    /// The load job ended in a non-DONE state without reporting errors.
    #[error("Load job {job_id} ended in state {state} without completing")]
    LoadIncomplete { job_id: String, state: String },

    /// The load job did not reach a terminal state in time.
    #[error("Load into {table} did not finish within {secs}s")]
    LoadTimeout { table: String, secs: u64 },

    /// The tracking service was unreachable or answered with a non-success status.
    #[error("Tracking service {operation} failed: {source}")]
    TrackingService {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// The stored content hash did not match the tracking service's expected hash.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    /// Object-storage metadata could not be fetched.
    #[error("Object metadata lookup for {object} failed: {source}")]
    ObjectStore {
        object: String,
        #[source]
        source: BoxError,
    },

    /// The failure alert could not be delivered. Never propagated out of the pipeline.
    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(#[source] BoxError),

    /// The idempotency store could not be consulted.
    #[error("Dedup store error: {0}")]
    Dedup(#[source] BoxError),
}
