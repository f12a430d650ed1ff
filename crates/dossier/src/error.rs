use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DossierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Submission rejected: {0}")]
    Submit(#[from] SubmitError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to parse environment variable '{key}' = '{value}' as an integer")]
    ParseEnv { key: String, value: String },
}

/// Admission-time rejection. Recoverable by the caller via retry/backoff;
/// a rejected submission never creates a job record.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Job queue is full ({max_queue_size} queued) - try again later")]
    CapacityExceeded { max_queue_size: usize },

    #[error("Job queue is shut down")]
    QueueClosed,
}

/// Internal pipeline fault observed by a worker. Fatal for the affected
/// job only; the worker logs it and returns to polling.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Job '{job_id}' missing from registry")]
    MissingRecord { job_id: String },
}

/// Any error surfaced by a job handler during execution. Captured into the
/// job record's `error` field; never escapes the owning worker.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid job payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("Failed to read {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Source connector error: {0}")]
    Source(String),

    #[error("Job failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, DossierError>;
