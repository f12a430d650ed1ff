pub mod config;
pub mod documents;
pub mod error;
pub mod events;
pub mod handlers;
pub mod jobs;
pub mod logging;

pub use config::QueueConfig;
pub use logging::init_logging;
pub use documents::{DocumentRecord, DocumentStore, MemoryDocumentStore};
pub use error::{ConfigError, DossierError, HandlerError, Result, SubmitError, WorkerError};
pub use events::{JobEvent, JobEventBroadcaster, JobEventKind};
pub use jobs::{
    HandlerRegistry, JobHandler, JobQueue, JobRecord, JobRegistry, JobStatus, JobType,
    NoopProgress, ProgressSink, QueueStats, StatusCounts, SubmitReceipt,
};
