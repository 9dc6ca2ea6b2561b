/// `load_config` module: resolves every configuration key from the process environment,
/// falling back to an optional flat YAML file, and validates the result once at startup.
///
/// # Responsibilities
/// - Merge environment variables (which win) with the optional YAML file
/// - Hand the merged lookup to [`IngestConfig::from_lookup`] for the pipeline settings
/// - Resolve the endpoint settings used by the HTTP adapters
/// - Fail with a message naming the offending key or file before any event is handled
///
/// The YAML file is a flat map using the same upper-case keys as the environment, e.g.
///
/// ```yaml
/// PROJECT_ID: my-project
/// DATASET_ID: forecasts
/// LOAD_TIMEOUT_SECS: 300
/// ```
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use bucket_ingest_core::config::IngestConfig;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_WAREHOUSE_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com/storage/v1";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Where the HTTP adapters send their requests.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub tracking_base_url: String,
    pub notify_url: String,
    pub warehouse_base_url: String,
    pub storage_base_url: String,
    /// Bearer token forwarded to the warehouse and storage APIs.
    pub access_token: Option<String>,
    pub tracking_api_key: Option<String>,
    pub poll_interval: Duration,
    pub dedup_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub endpoints: EndpointConfig,
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        self.ingest.trace_loaded();
        info!(
            tracking_base_url = %self.endpoints.tracking_base_url,
            warehouse_base_url = %self.endpoints.warehouse_base_url,
            storage_base_url = %self.endpoints.storage_base_url,
            access_token_set = self.endpoints.access_token.is_some(),
            dedup = self.endpoints.dedup_dir.is_some(),
            "Loaded EndpointConfig"
        );
    }
}

/// Load configuration from the environment, with `path` (if any) as fallback source.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let file_values = match path {
        Some(p) => read_yaml(p)?,
        None => HashMap::new(),
    };
    let lookup = |key: &str| -> Option<String> {
        std::env::var(key)
            .ok()
            .or_else(|| file_values.get(key).cloned())
            .filter(|v| !v.trim().is_empty())
    };

    let ingest = IngestConfig::from_lookup(lookup).map_err(|e| {
        error!(error = %e, "Invalid ingest configuration");
        anyhow::anyhow!(e)
    })?;

    let required = |key: &str| -> Result<String> {
        lookup(key).ok_or_else(|| {
            error!(key, "Required configuration key missing");
            anyhow::anyhow!("{key} is required but not set")
        })
    };

    let poll_interval_ms = match lookup("LOAD_POLL_INTERVAL_MS") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("LOAD_POLL_INTERVAL_MS must be an integer, got '{raw}'"))?,
        None => DEFAULT_POLL_INTERVAL_MS,
    };

    let endpoints = EndpointConfig {
        tracking_base_url: trim_slash(required("TRACKING_BASE_URL")?),
        notify_url: required("NOTIFY_URL")?,
        warehouse_base_url: trim_slash(
            lookup("WAREHOUSE_BASE_URL").unwrap_or_else(|| DEFAULT_WAREHOUSE_BASE_URL.to_string()),
        ),
        storage_base_url: trim_slash(
            lookup("STORAGE_BASE_URL").unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_string()),
        ),
        access_token: lookup("ACCESS_TOKEN"),
        tracking_api_key: lookup("TRACKING_API_KEY"),
        poll_interval: Duration::from_millis(poll_interval_ms),
        dedup_dir: lookup("DEDUP_DIR").map(PathBuf::from),
    };

    info!(config_file = ?path, "Config loaded and merged successfully");
    Ok(AppConfig { ingest, endpoints })
}

fn read_yaml(path: &Path) -> Result<HashMap<String, String>> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    let raw: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;

    let mut values = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let value = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Null => continue,
            other => anyhow::bail!("Config key {key} must be a scalar, got {other:?}"),
        };
        values.insert(key, value);
    }
    debug!(keys = values.len(), "Parsed config YAML");
    Ok(values)
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
