//! Validated configuration for the ingestion pipeline.
//!
//! Built once at startup with [`IngestConfig::from_lookup`] and handed to every component.
//! Where values come from (process environment, `.env`, YAML file) is the caller's concern;
//! this module only resolves keys and fails fast on anything missing or malformed.

use std::time::Duration;

use tracing::{debug, info};

use crate::contract::{LoadJobDescriptor, TableRef};
use crate::eligibility::EligibilityRule;
use crate::error::{IngestError, Result};
use crate::routing::RoutingRule;

pub const DEFAULT_FILE_MARKER: &str = "sales_forecast";
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 540;

/// The three opaque status codes understood by the tracking service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodes {
    pub in_progress: String,
    pub success: String,
    pub failure: String,
}

/// What to do with a load job that ended in a non-DONE state without reporting errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncompletePolicy {
    /// Log and end the workflow without a terminal status.
    #[default]
    Ignore,
    /// Take the FAILURE path.
    Fail,
}

impl std::str::FromStr for IncompletePolicy {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(IncompletePolicy::Ignore),
            "fail" => Ok(IncompletePolicy::Fail),
            other => Err(IngestError::Config(format!(
                "INCOMPLETE_POLICY must be 'ignore' or 'fail', got '{other}'"
            ))),
        }
    }
}

/// Checksum verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChecksumConfig {
    /// Verify the object before submitting the load.
    pub gate: bool,
    /// Prefix stripped from the object name to form the tracking lookup key.
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub delimiter: char,
    pub eligibility: EligibilityRule,
    pub routing: RoutingRule,
    pub status_codes: StatusCodes,
    pub load_timeout: Duration,
    pub incomplete_policy: IncompletePolicy,
    pub checksum: ChecksumConfig,
}

impl IngestConfig {
    /// Resolve every key through `lookup`. Required keys missing or blank are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(IngestError::Config(format!("{key} is required but not set"))),
            }
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let delimiter = parse_delimiter(&required("DELIMITER")?)?;

        let load_timeout_secs = match optional("LOAD_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                IngestError::Config(format!("LOAD_TIMEOUT_SECS must be an integer: {e}"))
            })?,
            None => DEFAULT_LOAD_TIMEOUT_SECS,
        };

        let incomplete_policy = match optional("INCOMPLETE_POLICY") {
            Some(raw) => raw.parse()?,
            None => IncompletePolicy::default(),
        };

        let gate = match optional("CHECKSUM_GATE") {
            Some(raw) => parse_bool("CHECKSUM_GATE", &raw)?,
            None => false,
        };

        let marker = optional("FILE_MARKER").unwrap_or_else(|| DEFAULT_FILE_MARKER.to_string());

        Ok(IngestConfig {
            project_id: required("PROJECT_ID")?,
            dataset_id: required("DATASET_ID")?,
            delimiter,
            eligibility: EligibilityRule::new(&required("TRIGGER_FILE_PATHS")?, &marker),
            routing: RoutingRule {
                default_table: required("TABLE_NAME")?,
                daily_table: required("DAILY_TABLE_NAME")?,
                weekly_table: required("WEEKLY_TABLE_NAME")?,
            },
            status_codes: StatusCodes {
                in_progress: required("IN_PROGRESS_CODE")?,
                success: required("SUCCESS_CODE")?,
                failure: required("FAILURE_CODE")?,
            },
            load_timeout: Duration::from_secs(load_timeout_secs),
            incomplete_policy,
            checksum: ChecksumConfig {
                gate,
                prefix: optional("CHECKSUM_PREFIX").unwrap_or_default(),
            },
        })
    }

    pub fn table_ref(&self, table_id: &str) -> TableRef {
        TableRef {
            project_id: self.project_id.clone(),
            dataset_id: self.dataset_id.clone(),
            table_id: table_id.to_string(),
        }
    }

    pub fn descriptor(&self) -> LoadJobDescriptor {
        LoadJobDescriptor::csv_append(self.delimiter)
    }

    pub fn trace_loaded(&self) {
        info!(
            project_id = %self.project_id,
            dataset_id = %self.dataset_id,
            trigger_paths = self.eligibility.target_paths.len(),
            marker = %self.eligibility.marker,
            load_timeout_secs = self.load_timeout.as_secs(),
            checksum_gate = self.checksum.gate,
            "Loaded IngestConfig"
        );
        debug!(?self, "IngestConfig loaded (full debug)");
    }
}

fn parse_delimiter(raw: &str) -> Result<char> {
    if raw == "\\t" {
        return Ok('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(IngestError::Config(format!(
            "DELIMITER must be a single character, got '{raw}'"
        ))),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(IngestError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}
