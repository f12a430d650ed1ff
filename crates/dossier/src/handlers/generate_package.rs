//! Case package generation handler.
//!
//! Collects every stored document for a case and renders a single
//! Markdown package: a title block, a timeline of dated documents, a
//! document index, and the full extracted text.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::documents::{DocumentRecord, DocumentStore};
use crate::error::HandlerError;
use crate::jobs::handler::{JobHandler, ProgressSink};

#[derive(Debug, Deserialize)]
struct GeneratePackageParams {
    case_name: String,
    output_dir: String,
}

/// Renders a case's documents into one Markdown package file.
pub struct GeneratePackageHandler {
    store: Arc<dyn DocumentStore>,
}

impl GeneratePackageHandler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

/// "arbitration_employment" -> "Arbitration Employment".
fn title_case(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_package(case_name: &str, documents: &[DocumentRecord]) -> String {
    let mut package = format!(
        "# {} - Case Package\n\n**Generated**: {}\n**Total Documents**: {}\n\n---\n\n",
        title_case(case_name),
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        documents.len(),
    );

    if documents.is_empty() {
        package.push_str("No documents found for this case.\n");
        return package;
    }

    package.push_str("## Timeline of Events\n\n");
    let mut dated: Vec<&DocumentRecord> = documents
        .iter()
        .filter(|doc| doc.doc_date.is_some())
        .collect();
    dated.sort_by(|a, b| a.doc_date.cmp(&b.doc_date));
    for doc in &dated {
        package.push_str(&format!(
            "**{}** - {}\n  {}\n\n",
            doc.doc_date.as_deref().unwrap_or(""),
            doc.filename,
            doc.summary.as_deref().unwrap_or("No summary"),
        ));
    }

    package.push_str("\n---\n\n## Document Index\n\n");
    for (i, doc) in documents.iter().enumerate() {
        package.push_str(&format!(
            "{}. **{}**\n   - Type: {}\n   - Summary: {}\n   - Length: {} characters\n\n",
            i + 1,
            doc.filename,
            doc.mime_type,
            doc.summary.as_deref().unwrap_or("No summary"),
            doc.char_count,
        ));
    }

    package.push_str("\n---\n\n## Full Document Text\n\n");
    for (i, doc) in documents.iter().enumerate() {
        package.push_str(&format!(
            "### Document {}: {}\n\n{}\n\n---\n\n",
            i + 1,
            doc.filename,
            if doc.text.is_empty() {
                "No text available"
            } else {
                &doc.text
            },
        ));
    }

    package
}

impl JobHandler for GeneratePackageHandler {
    fn execute(
        &self,
        payload: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        let params: GeneratePackageParams =
            serde_json::from_value(payload.clone()).map_err(|e| HandlerError::InvalidPayload {
                reason: e.to_string(),
            })?;

        progress.update(0.1, "Collecting case documents...");
        let documents = self.store.list_by_case(&params.case_name);

        progress.update(0.4, "Building timeline...");
        progress.update(0.7, "Rendering package...");
        let package = render_package(&params.case_name, &documents);

        progress.update(0.9, "Writing package file...");
        let output_dir = PathBuf::from(&params.output_dir);
        std::fs::create_dir_all(&output_dir).map_err(|e| HandlerError::WriteFile {
            path: output_dir.clone(),
            source: e,
        })?;
        let package_path = output_dir.join(format!("{}_package.md", params.case_name));
        std::fs::write(&package_path, &package).map_err(|e| HandlerError::WriteFile {
            path: package_path.clone(),
            source: e,
        })?;

        progress.update(1.0, "Package complete");
        Ok(json!({
            "case_name": params.case_name,
            "document_count": documents.len(),
            "package_path": package_path.to_string_lossy(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::MemoryDocumentStore;
    use crate::jobs::handler::NoopProgress;
    use tempfile::TempDir;

    fn case_doc(filename: &str, case: &str, date: Option<&str>, text: &str) -> DocumentRecord {
        let mut doc = DocumentRecord::new(filename, "text/plain", filename, text.to_string());
        doc.case_name = Some(case.to_string());
        doc.doc_date = date.map(|d| d.to_string());
        doc
    }

    fn store_with(docs: Vec<DocumentRecord>) -> Arc<MemoryDocumentStore> {
        let store = Arc::new(MemoryDocumentStore::new());
        for doc in docs {
            store.insert(doc).unwrap();
        }
        store
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("arbitration_employment"), "Arbitration Employment");
        assert_eq!(title_case("smith"), "Smith");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_generate_package_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = store_with(vec![
            case_doc("lease.txt", "acme", Some("2023-04-01"), "The lease terms."),
            case_doc("memo.txt", "acme", None, "Internal memo."),
        ]);
        let handler = GeneratePackageHandler::new(store);

        let result = handler
            .execute(
                &json!({"case_name": "acme", "output_dir": dir.path().to_string_lossy()}),
                &NoopProgress,
            )
            .unwrap();

        assert_eq!(result["case_name"], "acme");
        assert_eq!(result["document_count"], 2);

        let path = result["package_path"].as_str().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("# Acme - Case Package"));
        assert!(content.contains("**Total Documents**: 2"));
        assert!(content.contains("**2023-04-01** - lease.txt"));
        assert!(content.contains("## Document Index"));
        assert!(content.contains("The lease terms."));
    }

    #[test]
    fn test_timeline_sorted_by_date() {
        let docs = vec![
            case_doc("late.txt", "acme", Some("2024-06-01"), "later"),
            case_doc("early.txt", "acme", Some("2022-01-15"), "earlier"),
        ];
        let package = render_package("acme", &docs);

        let early = package.find("2022-01-15").unwrap();
        let late = package.find("2024-06-01").unwrap();
        assert!(early < late);
    }

    #[test]
    fn test_empty_case_still_produces_package() {
        let dir = TempDir::new().unwrap();
        let handler = GeneratePackageHandler::new(store_with(vec![]));

        let result = handler
            .execute(
                &json!({"case_name": "empty_case", "output_dir": dir.path().to_string_lossy()}),
                &NoopProgress,
            )
            .unwrap();

        assert_eq!(result["document_count"], 0);
        let content = std::fs::read_to_string(result["package_path"].as_str().unwrap()).unwrap();
        assert!(content.contains("No documents found for this case."));
    }

    #[test]
    fn test_invalid_payload_rejected() {
        let handler = GeneratePackageHandler::new(store_with(vec![]));
        let result = handler.execute(&json!({"case_name": "acme"}), &NoopProgress);
        assert!(matches!(result, Err(HandlerError::InvalidPayload { .. })));
    }
}
