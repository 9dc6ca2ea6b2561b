//! Content-hash verification against the tracking service.
//!
//! Read-only: it fetches the object's stored hash and the expected hash, and compares
//! them byte for byte. A failed fetch on either side is an error, never a `false`.

use tracing::{info, warn};

use crate::contract::{ObjectStore, TrackingService};
use crate::error::{IngestError, Result};
use crate::event::FileEvent;

/// Expected (tracking service) and actual (stored metadata) hash of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPair {
    pub expected: String,
    pub actual: String,
}

impl ChecksumPair {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }

    /// `Ok(())` on a match, [`IngestError::IntegrityMismatch`] otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.matches() {
            Ok(())
        } else {
            Err(IngestError::IntegrityMismatch {
                expected: self.expected,
                actual: self.actual,
            })
        }
    }
}

/// Lookup key for the tracking service: the object name without `prefix`.
pub fn lookup_key<'a>(name: &'a str, prefix: &str) -> &'a str {
    name.strip_prefix(prefix).unwrap_or(name)
}

pub struct ChecksumValidator<'a> {
    store: &'a dyn ObjectStore,
    tracking: &'a dyn TrackingService,
    prefix: &'a str,
}

impl<'a> ChecksumValidator<'a> {
    pub fn new(store: &'a dyn ObjectStore, tracking: &'a dyn TrackingService, prefix: &'a str) -> Self {
        Self {
            store,
            tracking,
            prefix,
        }
    }

    /// Fetch both hashes.
    pub async fn fetch(&self, event: &FileEvent) -> Result<ChecksumPair> {
        let object = format!("{}/{}", event.bucket, event.name);
        let metadata = self
            .store
            .object_metadata(&event.bucket, &event.name)
            .await
            .map_err(|source| IngestError::ObjectStore {
                object: object.clone(),
                source,
            })?;
        let actual = metadata.md5_hash.ok_or_else(|| IngestError::ObjectStore {
            object: object.clone(),
            source: "object metadata carries no content hash".into(),
        })?;

        let key = lookup_key(&event.name, self.prefix);
        let expected = self
            .tracking
            .get_checksum(key)
            .await
            .map_err(|source| IngestError::TrackingService {
                operation: "get_checksum",
                source,
            })?
            .body;

        Ok(ChecksumPair { expected, actual })
    }

    /// True iff the stored hash equals the expected hash.
    pub async fn validate(&self, event: &FileEvent) -> Result<bool> {
        let pair = self.fetch(event).await?;
        let valid = pair.matches();
        if valid {
            info!(file = %event.name, hash = %pair.actual, "[CHECKSUM] Checksum verified");
        } else {
            warn!(file = %event.name, expected = %pair.expected, actual = %pair.actual, "[CHECKSUM] Checksum mismatch");
        }
        Ok(valid)
    }
}
