//! Admission control, FIFO dispatch, and the pipeline facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::QueueConfig;
use crate::error::SubmitError;
use crate::events::{JobEvent, JobEventBroadcaster};
use crate::jobs::handler::HandlerRegistry;
use crate::jobs::pool::WorkerPool;
use crate::jobs::record::{JobRecord, JobStatus, JobType};
use crate::jobs::registry::JobRegistry;
use crate::jobs::stats::QueueStats;

/// Response for an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

impl SubmitReceipt {
    fn new(job_id: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            message: "Job queued for processing. Query the job status for progress.".to_string(),
        }
    }
}

/// The background job pipeline: bounded admission, FIFO dispatch across a
/// fixed worker pool, and lifecycle tracking per job.
///
/// Constructed once at process start with the full handler set; submissions
/// beyond `max_queue_size` queued jobs are rejected rather than buffered
/// unboundedly.
pub struct JobQueue {
    config: QueueConfig,
    registry: Arc<JobRegistry>,
    events: JobEventBroadcaster,
    /// Number of jobs currently counted as QUEUED by admission. Incremented
    /// by the compare-and-swap gate in `submit`, decremented by a worker
    /// only after the record has been marked RUNNING, so the registry's
    /// QUEUED count never exceeds this counter.
    queued: Arc<AtomicUsize>,
    job_sender: Sender<String>,
    pool: WorkerPool,
}

impl JobQueue {
    /// Validates the configuration and starts the worker pool.
    pub fn start(config: QueueConfig, handlers: HandlerRegistry) -> crate::Result<Self> {
        config.validate()?;

        let registry = Arc::new(JobRegistry::new());
        let events = JobEventBroadcaster::default();
        let queued = Arc::new(AtomicUsize::new(0));
        let (job_sender, job_receiver) = unbounded::<String>();

        let pool = WorkerPool::start(
            config.max_concurrent,
            job_receiver,
            Arc::clone(&registry),
            Arc::new(handlers),
            events.clone(),
            Arc::clone(&queued),
        );

        info!(
            "Job queue started (max_queue_size={}, max_concurrent={})",
            config.max_queue_size, config.max_concurrent
        );

        Ok(Self {
            config,
            registry,
            events,
            queued,
            job_sender,
            pool,
        })
    }

    /// Admits a new job, or rejects it when the queue is at capacity.
    ///
    /// The capacity check and the slot reservation are a single
    /// compare-and-swap, so concurrent submitters cannot both win the last
    /// slot. Never blocks waiting for a worker; on success the only side
    /// effect is the new QUEUED record and its dispatch entry.
    pub fn submit(
        &self,
        job_type: JobType,
        payload: serde_json::Value,
    ) -> Result<SubmitReceipt, SubmitError> {
        if self.pool.is_shutdown() {
            return Err(SubmitError::QueueClosed);
        }

        let mut current = self.queued.load(Ordering::Acquire);
        loop {
            if current >= self.config.max_queue_size {
                debug!(
                    "Rejecting '{}' submission: queue full ({} queued)",
                    job_type, current
                );
                return Err(SubmitError::CapacityExceeded {
                    max_queue_size: self.config.max_queue_size,
                });
            }
            match self.queued.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        let record = JobRecord::new(job_type, payload);
        let job_id = record.job_id.clone();
        let event = JobEvent::queued(&record);
        self.registry.insert(record);

        if self.job_sender.send(job_id.clone()).is_err() {
            // Workers are gone; roll the admission back.
            self.registry.remove(&job_id);
            self.queued.fetch_sub(1, Ordering::AcqRel);
            return Err(SubmitError::QueueClosed);
        }

        self.events.send(event);
        debug!("Job {} queued ({})", job_id, job_type);
        Ok(SubmitReceipt::new(job_id))
    }

    /// Returns a point-in-time snapshot of a job, or `None` for an id that
    /// was never issued (or has been purged by external retention).
    pub fn status(&self, job_id: &str) -> Option<JobRecord> {
        self.registry.get(job_id)
    }

    /// Queue-depth and worker-occupancy snapshot.
    pub fn stats(&self) -> QueueStats {
        QueueStats::from_counts(self.registry.counts(), &self.config)
    }

    /// Subscribes to the job lifecycle event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// The job registry; shared with status/stats readers.
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Signals workers to stop after their current job.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    /// Drops the dispatch channel and joins all workers.
    pub fn wait(self) {
        drop(self.job_sender);
        self.pool.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::jobs::handler::{JobHandler, ProgressSink};
    use serde_json::json;
    use std::time::{Duration, Instant};

    struct InstantHandler;

    impl JobHandler for InstantHandler {
        fn execute(
            &self,
            _payload: &serde_json::Value,
            progress: &dyn ProgressSink,
        ) -> Result<serde_json::Value, HandlerError> {
            progress.update(1.0, "done");
            Ok(json!({"ok": true}))
        }
    }

    fn small_queue(max_queue_size: usize, max_concurrent: usize) -> JobQueue {
        let mut handlers = HandlerRegistry::new();
        handlers.register(JobType::DedupScan, Arc::new(InstantHandler));
        let config = QueueConfig {
            max_queue_size,
            max_concurrent,
        };
        JobQueue::start(config, handlers).unwrap()
    }

    fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let config = QueueConfig {
            max_queue_size: 0,
            max_concurrent: 1,
        };
        assert!(JobQueue::start(config, HandlerRegistry::new()).is_err());
    }

    #[test]
    fn test_submit_and_complete() {
        let queue = small_queue(10, 2);

        let receipt = queue.submit(JobType::DedupScan, json!({})).unwrap();
        assert_eq!(receipt.status, JobStatus::Queued);

        let job_id = receipt.job_id.clone();
        assert!(wait_until(Duration::from_secs(5), || {
            queue
                .status(&job_id)
                .map(|job| job.status == JobStatus::Done)
                .unwrap_or(false)
        }));

        let record = queue.status(&job_id).unwrap();
        assert_eq!(record.result, Some(json!({"ok": true})));
        assert!(record.error.is_none());
        assert_eq!(record.progress, 1.0);

        queue.shutdown();
        queue.wait();
    }

    #[test]
    fn test_status_unknown_job() {
        let queue = small_queue(10, 1);
        assert!(queue.status("00000000-0000-0000-0000-000000000000").is_none());
        queue.shutdown();
        queue.wait();
    }

    #[test]
    fn test_stats_reflect_configuration() {
        let queue = small_queue(7, 2);
        let stats = queue.stats();
        assert_eq!(stats.max_queue_size, 7);
        assert_eq!(stats.max_concurrent, 2);
        assert_eq!(stats.queue_depth, 0);
        assert_eq!(stats.running_count, 0);
        queue.shutdown();
        queue.wait();
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let queue = small_queue(10, 1);
        queue.shutdown();

        let result = queue.submit(JobType::DedupScan, json!({}));
        assert!(matches!(result, Err(SubmitError::QueueClosed)));
        queue.wait();
    }

    #[test]
    fn test_receipt_serialization() {
        let receipt = SubmitReceipt::new("abc-123".to_string());
        let value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(value["job_id"], "abc-123");
        assert_eq!(value["status"], "QUEUED");
        assert!(value["message"].as_str().unwrap().contains("queued"));
    }
}
