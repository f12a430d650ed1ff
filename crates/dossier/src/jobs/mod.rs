//! The asynchronous job pipeline: admission control, FIFO dispatch, a
//! fixed worker pool, and per-job lifecycle tracking.

pub mod handler;
pub mod pool;
pub mod queue;
pub mod record;
pub mod registry;
pub mod stats;

pub use handler::{HandlerRegistry, JobHandler, NoopProgress, ProgressSink};
pub use pool::WorkerPool;
pub use queue::{JobQueue, SubmitReceipt};
pub use record::{JobRecord, JobStatus, JobType};
pub use registry::{JobRegistry, StatusCounts};
pub use stats::QueueStats;
