//! Directory-backed [`DedupStore`]: one empty marker file per claimed event. Releasing a
//! claim removes its marker.
//!
//! The marker name is the SHA-256 hex digest of the dedup key, so arbitrary object names map
//! to safe file names. Claims use `create_new`, which makes two racing invocations on the
//! same directory agree on a single winner.

use async_trait::async_trait;
use bucket_ingest_core::contract::{BoxError, DedupStore};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct FileDedupStore {
    dir: PathBuf,
}

impl FileDedupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn marker_path(&self, key: &str) -> PathBuf {
        self.dir.join(hex::encode(Sha256::digest(key.as_bytes())))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DedupStore for FileDedupStore {
    async fn claim(&self, key: &str) -> Result<bool, BoxError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.marker_path(key);
        let created = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        match created {
            Ok(_) => {
                tracing::debug!(key, marker = ?path, "Claimed dedup key");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, key: &str) -> Result<(), BoxError> {
        let path = self.marker_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, marker = ?path, "Released dedup key");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
