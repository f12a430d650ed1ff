//! Built-in job handlers, one per job type.
//!
//! Each handler is a thin orchestration over the trait seams in
//! [`crate::documents`] and this module; the heavy collaborators
//! (extraction, embedding, external sources) plug in behind traits.

pub mod dedup_scan;
pub mod generate_package;
pub mod process_document;
pub mod source_sync;

pub use dedup_scan::DedupScanHandler;
pub use generate_package::GeneratePackageHandler;
pub use process_document::{
    compute_content_hash, compute_file_hash, Embedder, Entity, EntityExtractor,
    HeuristicEntityExtractor, NoopEmbedder, PlainTextExtractor, ProcessDocumentHandler,
    TextExtractor,
};
pub use source_sync::{DirectoryConnector, SourceConnector, SourceEntry, SourceSyncHandler};
