#![allow(unused)]

//! # contract: Interfaces to the external collaborators of an ingestion run
//!
//! The core never talks to the network itself. Everything outside the process is
//! reached through one of the traits below, and concrete clients (HTTP adapters in the
//! CLI crate, mocks in tests) are passed into the components at construction.
//!
//! ## Collaborators
//! - [`LoadService`]: the warehouse load API. Submits a load job and resolves once the
//!   job reaches a terminal state.
//! - [`ObjectStore`]: read-only access to object metadata (content hash, generation).
//! - [`TrackingService`]: the per-file system of record for ingestion status.
//! - [`Notifier`]: the human-facing alert channel.
//! - [`DedupStore`]: optional idempotency memory across redelivered events.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; with the `test-export-mocks` feature the
//!   generated `Mock*` types are public so integration tests in either crate can use them.
//!
//! ## Errors
//! - All methods return [`BoxError`] on failure. Callers in the core wrap it into a
//!   specific [`crate::error::IngestError`] variant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mockall::{automock, predicate::*};

/// Boxed error returned by every collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fully qualified destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Source format of the loaded object. Only CSV is ever produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceFormat {
    Csv,
}

/// How the load treats existing rows in the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteDisposition {
    #[serde(rename = "WRITE_APPEND")]
    Append,
}

/// Constant load configuration, built once per invocation from the field delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadJobDescriptor {
    pub source_format: SourceFormat,
    pub delimiter: char,
    pub skip_leading_rows: u32,
    pub allow_jagged_rows: bool,
    pub write_disposition: WriteDisposition,
    pub autodetect: bool,
}

impl LoadJobDescriptor {
    pub fn csv_append(delimiter: char) -> Self {
        Self {
            source_format: SourceFormat::Csv,
            delimiter,
            skip_leading_rows: 1,
            allow_jagged_rows: true,
            write_disposition: WriteDisposition::Append,
            autodetect: false,
        }
    }
}

/// Everything the warehouse needs to run one load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// `gs://{bucket}/{name}` of the triggering object.
    pub source_uri: String,
    pub destination: TableRef,
    pub descriptor: LoadJobDescriptor,
}

/// Terminal state reported by the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Done,
    Other(String),
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Done => f.write_str("DONE"),
            JobState::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        match s {
            "DONE" => JobState::Done,
            other => JobState::Other(other.to_string()),
        }
    }
}

/// One error entry reported by a load job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Result of a finished load job. A non-empty `errors` means failure whatever `state` says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub state: JobState,
    pub errors: Vec<ErrorDetail>,
}

/// Stored object metadata relevant to ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub md5_hash: Option<String>,
    pub generation: Option<String>,
}

/// Raw response of the tracking service. Only `body` is inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackingResponse {
    pub body: String,
}

impl TrackingResponse {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// Submits load jobs to the warehouse and awaits their terminal state.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LoadService: Send + Sync {
    /// Submit the load described by `req` and resolve once the job is terminal.
    ///
    /// Transport, authorization and malformed-request failures are returned as errors;
    /// job-level errors are reported inside the [`JobOutcome`].
    async fn run_load(&self, req: &LoadRequest) -> Result<JobOutcome, BoxError>;
}

/// Read-only access to object metadata in the storage service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn object_metadata(&self, bucket: &str, name: &str)
        -> Result<ObjectMetadata, BoxError>;
}

/// The external system of record for per-file ingestion status.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TrackingService: Send + Sync {
    /// Record `code` as the current status of `file_name`.
    async fn update_status(&self, file_name: &str, code: &str)
        -> Result<TrackingResponse, BoxError>;

    /// Trigger the downstream run-status consistency check. The response is not consumed.
    async fn check_run_status(&self, file_name: &str) -> Result<(), BoxError>;

    /// Fetch the expected content hash for a lookup key.
    async fn get_checksum(&self, key: &str) -> Result<TrackingResponse, BoxError>;
}

/// Human-facing alert channel.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, message: &str) -> Result<(), BoxError>;
}

/// Remembers which events have already been processed.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Claim `key`. Returns `true` if no earlier invocation claimed it.
    async fn claim(&self, key: &str) -> Result<bool, BoxError>;

    /// Drop the claim on `key`. Releasing a key that is not claimed is not an error.
    async fn release(&self, key: &str) -> Result<(), BoxError>;
}
