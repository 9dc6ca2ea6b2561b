//! Email relay client. Posts `{"message": ...}` to the configured notification endpoint.

use async_trait::async_trait;
use bucket_ingest_core::contract::{BoxError, Notifier};
use serde::Serialize;

use crate::http::{build_client, ensure_success};

pub struct EmailNotifier {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    message: &'a str,
}

impl EmailNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, BoxError> {
        Ok(Self {
            http: build_client()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_email(&self, message: &str) -> Result<(), BoxError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&EmailRequest { message })
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }
}
