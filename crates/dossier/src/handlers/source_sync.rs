//! External-source synchronization handler.
//!
//! Pulls entries from a configured source (a remote drive, a watched
//! share) through the [`SourceConnector`] seam and ingests each one as a
//! stored document, with optional content-hash deduplication.

use std::path::PathBuf;
use std::sync::Arc;

use log::warn;
use serde::Deserialize;
use serde_json::json;
use walkdir::WalkDir;

use crate::documents::{DocumentRecord, DocumentStore};
use crate::error::HandlerError;
use crate::handlers::process_document::compute_content_hash;
use crate::jobs::handler::{JobHandler, ProgressSink};

/// A file visible in an external source.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Source-relative path of the entry.
    pub path: String,
    /// Bare filename.
    pub name: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

/// Connector to an external document source. The remote API (auth, paging,
/// delta tokens) lives behind this seam.
pub trait SourceConnector: Send + Sync {
    /// Lists entries under `folder_path` (the source root when `None`).
    fn list_entries(
        &self,
        folder_path: Option<&str>,
        recursive: bool,
    ) -> Result<Vec<SourceEntry>, HandlerError>;

    /// Fetches an entry's content.
    fn fetch(&self, entry: &SourceEntry) -> Result<Vec<u8>, HandlerError>;
}

/// Treats a local directory as a source. Useful for watched shares and
/// for exercising the sync flow without a remote account.
pub struct DirectoryConnector {
    root: PathBuf,
}

impl DirectoryConnector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceConnector for DirectoryConnector {
    fn list_entries(
        &self,
        folder_path: Option<&str>,
        recursive: bool,
    ) -> Result<Vec<SourceEntry>, HandlerError> {
        let base = match folder_path {
            Some(folder) => self.root.join(folder),
            None => self.root.clone(),
        };

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut entries = Vec::new();

        for entry in WalkDir::new(&base).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.map_err(|e| HandlerError::Source(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();
            let name = entry.file_name().to_string_lossy().to_string();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let mime_type = mime_guess::from_path(entry.path())
                .first()
                .map(|m| m.to_string());

            entries.push(SourceEntry {
                path,
                name,
                mime_type,
                size,
            });
        }

        Ok(entries)
    }

    fn fetch(&self, entry: &SourceEntry) -> Result<Vec<u8>, HandlerError> {
        let path = self.root.join(&entry.path);
        std::fs::read(&path).map_err(|e| HandlerError::ReadFile { path, source: e })
    }
}

#[derive(Debug, Deserialize)]
struct SourceSyncParams {
    #[serde(default)]
    folder_path: Option<String>,
    #[serde(default = "default_true")]
    recursive: bool,
    #[serde(default = "default_true")]
    deduplicate: bool,
}

fn default_true() -> bool {
    true
}

/// Syncs an external source folder into the document store. Individual
/// entry failures are counted and logged; only a listing failure fails
/// the whole job.
pub struct SourceSyncHandler {
    connector: Arc<dyn SourceConnector>,
    store: Arc<dyn DocumentStore>,
}

impl SourceSyncHandler {
    pub fn new(connector: Arc<dyn SourceConnector>, store: Arc<dyn DocumentStore>) -> Self {
        Self { connector, store }
    }

    fn ingest(&self, entry: &SourceEntry, deduplicate: bool) -> Result<bool, HandlerError> {
        let content = self.connector.fetch(entry)?;
        let file_hash = compute_content_hash(&content);

        if deduplicate && self.store.find_by_hash(&file_hash).is_some() {
            return Ok(false);
        }

        let text = String::from_utf8_lossy(&content).into_owned();
        let mime_type = entry
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut record = DocumentRecord::new(&entry.name, &mime_type, &file_hash, text);
        record.file_size = entry.size;
        self.store.insert(record)?;
        Ok(true)
    }
}

impl JobHandler for SourceSyncHandler {
    fn execute(
        &self,
        payload: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        let params: SourceSyncParams =
            serde_json::from_value(payload.clone()).map_err(|e| HandlerError::InvalidPayload {
                reason: e.to_string(),
            })?;

        progress.update(0.0, "Listing source entries...");
        let entries = self
            .connector
            .list_entries(params.folder_path.as_deref(), params.recursive)?;
        let total = entries.len();

        let mut synced = 0_usize;
        let mut skipped = 0_usize;
        let mut failed = 0_usize;

        for (i, entry) in entries.iter().enumerate() {
            match self.ingest(entry, params.deduplicate) {
                Ok(true) => synced += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    warn!("Failed to sync '{}': {}", entry.path, e);
                    failed += 1;
                }
            }

            let fraction = (i + 1) as f64 / total.max(1) as f64;
            progress.update(fraction, &format!("Synced {} of {} entries", i + 1, total));
        }

        progress.update(1.0, "Sync complete");
        Ok(json!({
            "synced": synced,
            "skipped": skipped,
            "failed": failed,
            "total": total,
        }))
    }
}
