//! Shared reqwest plumbing for the service adapters.

use bucket_ingest_core::contract::BoxError;
use std::time::Duration;

/// Per-request timeout. Load polling issues many short requests, so this bounds each one,
/// not the whole load.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub fn build_client() -> Result<reqwest::Client, BoxError> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("bucket-ingest/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Turn a non-2xx response into an error carrying status and body.
pub async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, BoxError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().clone();
    let body = resp.text().await.unwrap_or_default();
    Err(format!("request to {url} returned {status}: {}", body.trim()).into())
}

/// Attach a bearer token when one is configured.
pub fn with_bearer(req: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        Some(t) => req.bearer_auth(t),
        None => req,
    }
}
