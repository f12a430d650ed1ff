//! Authoritative in-memory store mapping job identity to job record.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::jobs::record::{JobRecord, JobStatus};

/// Per-status totals as seen in a single registry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub error: usize,
}

/// Registry of all jobs the pipeline has accepted. Constructed once at
/// process start and injected into admission and the worker pool; the
/// pipeline itself never deletes records (retention is an external
/// concern).
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, JobRecord>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, JobRecord>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn insert(&self, record: JobRecord) {
        self.write().insert(record.job_id.clone(), record);
    }

    /// Returns a point-in-time snapshot of a record.
    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.read().get(job_id).cloned()
    }

    /// Applies a mutation to a record under the write lock, so readers
    /// never observe a partially updated record. Returns `None` when the
    /// job id is unknown.
    pub fn update<R>(&self, job_id: &str, f: impl FnOnce(&mut JobRecord) -> R) -> Option<R> {
        self.write().get_mut(job_id).map(f)
    }

    pub fn remove(&self, job_id: &str) -> Option<JobRecord> {
        self.write().remove(job_id)
    }

    pub fn counts(&self) -> StatusCounts {
        let jobs = self.read();
        let mut counts = StatusCounts::default();
        for record in jobs.values() {
            match record.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Done => counts.done += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
