//! Handler contract and the job-type -> handler dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::jobs::record::JobType;

/// Progress callback bound to a single job. Handlers may call `update`
/// zero or more times; fractions are expected to be non-decreasing in
/// [0.0, 1.0], which is the handler's contract and is not strictly
/// enforced by the pipeline.
pub trait ProgressSink: Send + Sync {
    fn update(&self, fraction: f64, message: &str);
}

/// No-op sink for unit tests.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update(&self, _fraction: f64, _message: &str) {}
}

/// The external collaborator that performs the actual work for one job
/// type. The call is synchronous from the worker's point of view; the
/// pipeline provides no built-in timeout, so a handler needing bounded
/// execution time must enforce it itself.
pub trait JobHandler: Send + Sync {
    fn execute(
        &self,
        payload: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError>;
}

/// Maps each job type to its handler. Populated once at startup and then
/// read-only; adding a job type means registering a new handler here, not
/// modifying the pipeline.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for a job type, replacing any previous one.
    pub fn register(&mut self, job_type: JobType, handler: Arc<dyn JobHandler>) -> &mut Self {
        if self.handlers.insert(job_type, handler).is_some() {
            log::warn!("Replacing previously registered handler for job type '{job_type}'");
        }
        self
    }

    pub fn resolve(&self, job_type: JobType) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(&job_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<JobType> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
