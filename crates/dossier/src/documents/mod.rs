//! Document store seam shared by the job handlers.
//!
//! The pipeline treats persistence as an external collaborator behind the
//! [`DocumentStore`] trait; [`MemoryDocumentStore`] is the in-process
//! implementation used by default and by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HandlerError;

/// A stored document as the pipeline sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    /// Case this document belongs to, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_name: Option<String>,
    pub mime_type: String,
    /// SHA-256 of the document content, used for deduplication.
    pub file_hash: String,
    pub file_size: u64,
    pub char_count: usize,
    /// Extracted text content.
    pub text: String,
    /// Short summary, when one has been produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Document date (as found in the document), for timeline ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(filename: &str, mime_type: &str, file_hash: &str, text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            case_name: None,
            mime_type: mime_type.to_string(),
            file_hash: file_hash.to_string(),
            file_size: text.len() as u64,
            char_count: text.chars().count(),
            text,
            summary: None,
            doc_date: None,
            created_at: Utc::now(),
        }
    }
}

/// Pipeline-facing surface of the external persistence layer.
pub trait DocumentStore: Send + Sync {
    fn insert(&self, record: DocumentRecord) -> Result<(), HandlerError>;
    fn get(&self, id: &str) -> Option<DocumentRecord>;
    fn find_by_hash(&self, file_hash: &str) -> Option<DocumentRecord>;
    fn list_all(&self) -> Vec<DocumentRecord>;
    fn list_by_case(&self, case_name: &str) -> Vec<DocumentRecord>;
}

/// In-memory document store.
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, DocumentRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, DocumentRecord>> {
        match self.documents.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Document store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, record: DocumentRecord) -> Result<(), HandlerError> {
        let mut documents = match self.documents.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Document store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        documents.insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<DocumentRecord> {
        self.read().get(id).cloned()
    }

    fn find_by_hash(&self, file_hash: &str) -> Option<DocumentRecord> {
        self.read()
            .values()
            .find(|doc| doc.file_hash == file_hash)
            .cloned()
    }

    fn list_all(&self) -> Vec<DocumentRecord> {
        let mut documents: Vec<DocumentRecord> = self.read().values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        documents
    }

    fn list_by_case(&self, case_name: &str) -> Vec<DocumentRecord> {
        let mut documents: Vec<DocumentRecord> = self
            .read()
            .values()
            .filter(|doc| doc.case_name.as_deref() == Some(case_name))
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, hash: &str) -> DocumentRecord {
        DocumentRecord::new(filename, "text/plain", hash, format!("contents of {filename}"))
    }

    #[test]
    fn test_insert_and_get() {
        let store = MemoryDocumentStore::new();
        let doc = record("a.txt", "hash-a");
        let id = doc.id.clone();

        store.insert(doc).unwrap();

        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.filename, "a.txt");
        assert_eq!(fetched.char_count, fetched.text.chars().count());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_find_by_hash() {
        let store = MemoryDocumentStore::new();
        store.insert(record("a.txt", "hash-a")).unwrap();
        store.insert(record("b.txt", "hash-b")).unwrap();

        assert_eq!(store.find_by_hash("hash-b").unwrap().filename, "b.txt");
        assert!(store.find_by_hash("hash-c").is_none());
    }

    #[test]
    fn test_list_by_case() {
        let store = MemoryDocumentStore::new();

        let mut doc = record("a.txt", "hash-a");
        doc.case_name = Some("smith_v_jones".to_string());
        store.insert(doc).unwrap();

        let mut doc = record("b.txt", "hash-b");
        doc.case_name = Some("smith_v_jones".to_string());
        store.insert(doc).unwrap();

        store.insert(record("c.txt", "hash-c")).unwrap();

        assert_eq!(store.list_by_case("smith_v_jones").len(), 2);
        assert_eq!(store.list_by_case("other_case").len(), 0);
        assert_eq!(store.list_all().len(), 3);
    }

    #[test]
    fn test_list_all_sorted_by_creation() {
        let store = MemoryDocumentStore::new();
        for name in ["first.txt", "second.txt", "third.txt"] {
            store.insert(record(name, name)).unwrap();
        }

        let all = store.list_all();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }
}
