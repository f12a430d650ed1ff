//! Duplicate document scan handler.
//!
//! Groups stored documents by content hash and reports every group that
//! contains more than one document. The scan never deletes anything;
//! cleanup is a separate decision made on the report.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::documents::DocumentStore;
use crate::error::HandlerError;
use crate::jobs::handler::{JobHandler, ProgressSink};

/// Reports groups of documents that share a content hash.
pub struct DedupScanHandler {
    store: Arc<dyn DocumentStore>,
}

impl DedupScanHandler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl JobHandler for DedupScanHandler {
    fn execute(
        &self,
        _payload: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        progress.update(0.1, "Loading documents...");
        let documents = self.store.list_all();
        let scanned = documents.len();

        progress.update(0.5, "Grouping by content hash...");
        let mut by_hash: HashMap<String, Vec<String>> = HashMap::new();
        for doc in documents {
            by_hash.entry(doc.file_hash).or_default().push(doc.id);
        }

        let mut groups: Vec<(String, Vec<String>)> = by_hash
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .collect();
        // Deterministic report order regardless of map iteration.
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, ids) in groups.iter_mut() {
            ids.sort();
        }

        let duplicate_count: usize = groups.iter().map(|(_, ids)| ids.len() - 1).sum();
        let report: Vec<serde_json::Value> = groups
            .iter()
            .map(|(file_hash, ids)| {
                json!({
                    "file_hash": file_hash,
                    "count": ids.len(),
                    "document_ids": ids,
                })
            })
            .collect();

        progress.update(1.0, "Scan complete");
        Ok(json!({
            "groups": report,
            "duplicate_count": duplicate_count,
            "scanned": scanned,
        }))
    }
}
