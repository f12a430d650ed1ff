//! Document ingestion handler: hash, dedupe, extract, enrich, store.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::documents::{DocumentRecord, DocumentStore};
use crate::error::HandlerError;
use crate::jobs::handler::{JobHandler, ProgressSink};

/// Extracts plain text from a document file. Real deployments plug in
/// PDF/OCR extraction here; the pipeline only cares about the text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, HandlerError>;
}

/// Reads the file as UTF-8 text (lossy). Sufficient for plain-text and
/// markdown sources.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, HandlerError> {
        let bytes = std::fs::read(path).map_err(|e| HandlerError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A named entity found in document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub text: String,
    pub kind: String,
}

/// Named-entity extraction seam. The actual NER model is an external
/// service; the pipeline only records what comes back.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<Entity>;
}

/// Capitalized-sequence heuristic: consecutive capitalized words become a
/// single "name" entity. A stand-in until a real NER service is wired up.
pub struct HeuristicEntityExtractor;

impl EntityExtractor for HeuristicEntityExtractor {
    fn extract(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for word in text.split_whitespace() {
            let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
            let capitalized = trimmed
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false);

            if capitalized && trimmed.len() > 1 {
                current.push(trimmed);
            } else {
                if current.len() >= 2 {
                    entities.push(Entity {
                        text: current.join(" "),
                        kind: "name".to_string(),
                    });
                }
                current.clear();
            }
        }
        if current.len() >= 2 {
            entities.push(Entity {
                text: current.join(" "),
                kind: "name".to_string(),
            });
        }

        entities.dedup();
        entities
    }
}

/// Embedding generation seam. The vector computation is an external
/// service and out of scope here.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, HandlerError>;
}

/// Produces no embedding. Placeholder until an embedding service is
/// wired in; ingestion proceeds without vectors.
pub struct NoopEmbedder;

impl Embedder for NoopEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, HandlerError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct ProcessDocumentParams {
    file_path: PathBuf,
    filename: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    case_name: Option<String>,
}

/// Runs a document through the full ingestion pipeline:
/// hash -> dedupe -> extract text -> extract entities -> embed -> store.
pub struct ProcessDocumentHandler {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    entities: Arc<dyn EntityExtractor>,
    embedder: Arc<dyn Embedder>,
}

impl ProcessDocumentHandler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        entities: Arc<dyn EntityExtractor>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            extractor,
            entities,
            embedder,
        }
    }
}

impl JobHandler for ProcessDocumentHandler {
    fn execute(
        &self,
        payload: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        let params: ProcessDocumentParams =
            serde_json::from_value(payload.clone()).map_err(|e| HandlerError::InvalidPayload {
                reason: e.to_string(),
            })?;

        progress.update(0.1, "Computing file hash...");
        let file_hash = compute_file_hash(&params.file_path)?;
        let file_size = std::fs::metadata(&params.file_path)
            .map(|m| m.len())
            .unwrap_or(0);

        if let Some(existing) = self.store.find_by_hash(&file_hash) {
            debug!(filename = %params.filename, "Duplicate document, skipping ingestion");
            progress.update(1.0, "Document already exists (duplicate)");
            return Ok(json!({
                "status": "duplicate",
                "document_id": existing.id,
                "file_hash": file_hash,
                "message": "Document with this hash already exists",
            }));
        }

        progress.update(0.3, "Extracting text...");
        let text = self.extractor.extract(&params.file_path)?;
        if text.trim().is_empty() {
            return Err(HandlerError::Extraction(
                "no text content could be extracted from the document".to_string(),
            ));
        }

        progress.update(0.6, "Extracting entities...");
        let entities = self.entities.extract(&text);

        progress.update(0.8, "Generating embeddings...");
        let _embedding = self.embedder.embed(&text)?;

        progress.update(0.9, "Storing document...");
        let mime_type = params
            .mime_type
            .or_else(|| detect_mime_type(&params.file_path))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut record = DocumentRecord::new(&params.filename, &mime_type, &file_hash, text);
        record.file_size = file_size;
        record.case_name = params.case_name;
        let document_id = record.id.clone();
        let text_length = record.text.len();
        self.store.insert(record)?;

        progress.update(1.0, "Processing complete");
        Ok(json!({
            "status": "success",
            "document_id": document_id,
            "file_hash": file_hash,
            "text_length": text_length,
            "entity_count": entities.len(),
        }))
    }
}

/// SHA-256 of the file content, streamed in 8 KiB chunks.
pub fn compute_file_hash(path: &Path) -> Result<String, HandlerError> {
    let mut file = std::fs::File::open(path).map_err(|e| HandlerError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = file.read(&mut buffer).map_err(|e| HandlerError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of an in-memory buffer.
pub fn compute_content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

fn detect_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.to_string())
}
