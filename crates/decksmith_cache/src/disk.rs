//! On-disk cache tier.
//!
//! Each key is stored as one JSON document named by the SHA-256 of the key:
//!
//! ```text
//! cache/
//! ├── 3f0c...e1.json   {"key": "card:89631139", "value": {...}, "expires_at": ...}
//! └── 9a41...07.json
//! ```

use crate::{CacheResult, CacheTier};
use chrono::{DateTime, Utc};
use decksmith_error::{CacheError, CacheErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Document persisted for one key.
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    key: String,
    value: JsonValue,
    expires_at: DateTime<Utc>,
}

/// Persistent tier backed by a directory of JSON documents.
///
/// Writes are atomic (temp file + rename). Expired documents are treated as
/// absent and deleted when read.
#[derive(Debug, Clone)]
pub struct DiskTier {
    base_path: PathBuf,
}

impl DiskTier {
    /// Create a disk tier rooted at `base_path`.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> CacheResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %base_path.display(), "Opened disk cache tier");
        Ok(Self { base_path })
    }

    /// Root directory of this tier.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn compute_hash(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", Self::compute_hash(key)))
    }

    /// Fetch a live value together with the time it has left.
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be read, decoded or removed.
    #[tracing::instrument(skip(self), fields(tier = "disk"))]
    pub async fn get_with_remaining(&self, key: &str) -> CacheResult<Option<(JsonValue, Duration)>> {
        let path = self.path_for(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::Read(format!(
                    "{}: {}",
                    path.display(),
                    e
                ))));
            }
        };

        let record: DiskRecord = serde_json::from_slice(&bytes).map_err(|e| {
            CacheError::new(CacheErrorKind::Serialization(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;

        // Hash collisions are not served
        if record.key != key {
            return Ok(None);
        }

        let now = Utc::now();
        if now >= record.expires_at {
            tracing::debug!(path = %path.display(), "Disk entry expired, removing");
            Self::remove_file(&path).await?;
            return Ok(None);
        }

        let remaining = (record.expires_at - now).to_std().unwrap_or(Duration::ZERO);
        Ok(Some((record.value, remaining)))
    }

    async fn remove_file(path: &Path) -> CacheResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::new(CacheErrorKind::Write(format!(
                "remove {}: {}",
                path.display(),
                e
            )))),
        }
    }
}

#[async_trait::async_trait]
impl CacheTier for DiskTier {
    async fn get(&self, key: &str) -> CacheResult<Option<JsonValue>> {
        Ok(self.get_with_remaining(key).await?.map(|(value, _)| value))
    }

    #[tracing::instrument(skip(self, value), fields(tier = "disk"))]
    async fn set(&self, key: &str, value: &JsonValue, ttl: Duration) -> CacheResult<()> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let record = DiskRecord {
            key: key.to_string(),
            value: value.clone(),
            expires_at: Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| CacheError::new(CacheErrorKind::Serialization(e.to_string())))?;

        let path = self.path_for(key);

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored disk entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        Self::remove_file(&self.path_for(key)).await
    }

    async fn len(&self) -> CacheResult<usize> {
        let read_err = |e: std::io::Error| {
            CacheError::new(CacheErrorKind::Read(format!(
                "{}: {}",
                self.base_path.display(),
                e
            )))
        };

        let mut dir = tokio::fs::read_dir(&self.base_path).await.map_err(read_err)?;
        let mut count = 0;
        while let Some(entry) = dir.next_entry().await.map_err(read_err)? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
