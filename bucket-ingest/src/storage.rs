//! Object metadata lookups against the Cloud Storage JSON API
//! (`GET {base}/b/{bucket}/o/{object}`).

use async_trait::async_trait;
use bucket_ingest_core::contract::{BoxError, ObjectMetadata, ObjectStore};
use reqwest::Url;
use serde::Deserialize;

use crate::http::{build_client, ensure_success, with_bearer};

pub struct GcsMetadata {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    #[serde(default)]
    md5_hash: Option<String>,
    #[serde(default)]
    generation: Option<String>,
}

impl GcsMetadata {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Result<Self, BoxError> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into(),
            access_token,
        })
    }

    /// Object names may contain `/`, which must be percent-encoded as a single path segment.
    fn object_url(&self, bucket: &str, name: &str) -> Result<Url, BoxError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| format!("storage base url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["b", bucket, "o", name]);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsMetadata {
    async fn object_metadata(
        &self,
        bucket: &str,
        name: &str,
    ) -> Result<ObjectMetadata, BoxError> {
        let url = self.object_url(bucket, name)?;
        tracing::debug!(%url, "Fetching object metadata");
        let resp = with_bearer(self.http.get(url), self.access_token.as_deref())
            .send()
            .await?;
        let object: ObjectResource = ensure_success(resp).await?.json().await?;
        Ok(ObjectMetadata {
            md5_hash: object.md5_hash,
            generation: object.generation,
        })
    }
}
