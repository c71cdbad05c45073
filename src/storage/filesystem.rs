//! Filesystem-backed key-value store.
//!
//! The whole store is one JSON object on disk. Every write goes to a sibling
//! temp file that is then renamed over the original, so a crash mid-write
//! leaves the previous document intact.

use super::{KeyValueStore, Record};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Maximum store file size (64 MiB).
/// Larger files are refused rather than read into memory.
const MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Key-value store persisted as a single JSON document.
#[derive(Debug)]
pub struct FilesystemStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FilesystemStore {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Record> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Record::new()),
            Err(e) => return Err(Error::operation("read_store", e)),
        };

        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "store file exceeds maximum size of {MAX_FILE_SIZE} bytes: {}",
                self.path.display()
            )));
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::operation("read_store", e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Record::new());
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::InvalidInput(format!(
                "store file is not a JSON object: {}",
                self.path.display()
            ))),
            Err(e) => Err(Error::operation("parse_store", e)),
        }
    }

    async fn write_document(&self, document: &Record) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::operation("create_store_dir", e))?;
        }

        let bytes =
            serde_json::to_vec(document).map_err(|e| Error::operation("serialize_store", e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Error::operation("write_store", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::operation("rename_store", e))?;

        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "Store written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FilesystemStore {
    async fn get(&self, keys: &[&str]) -> Result<Record> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        Ok(keys
            .iter()
            .filter_map(|k| document.remove(*k).map(|v| ((*k).to_string(), v)))
            .collect())
    }

    async fn set(&self, record: Record) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.extend(record);
        self.write_document(&document).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let before = document.len();
        for key in keys {
            document.remove(*key);
        }
        if document.len() == before {
            return Ok(());
        }
        self.write_document(&document).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_document(&Record::new()).await
    }
}
