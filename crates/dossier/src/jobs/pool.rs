use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use tracing::info_span;

use crate::error::WorkerError;
use crate::events::{JobEvent, JobEventBroadcaster};
use crate::jobs::handler::{HandlerRegistry, ProgressSink};
use crate::jobs::registry::JobRegistry;

/// Fixed-size pool of worker threads. Each worker claims the oldest queued
/// job, runs its handler, and records the terminal transition; a handler
/// failure or panic never takes the worker down.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `worker_count` workers pulling from `job_receiver`.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub(crate) fn start(
        worker_count: usize,
        job_receiver: Receiver<String>,
        registry: Arc<JobRegistry>,
        handlers: Arc<HandlerRegistry>,
        events: JobEventBroadcaster,
        queued: Arc<AtomicUsize>,
    ) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_registry = Arc::clone(&registry);
            let worker_handlers = Arc::clone(&handlers);
            let worker_events = events.clone();
            let worker_queued = Arc::clone(&queued);

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    job_rx,
                    shutdown_flag,
                    worker_registry,
                    worker_handlers,
                    worker_events,
                    worker_queued,
                );
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self { workers, shutdown }
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Joins all workers. The dispatch sender must be dropped first so
    /// blocked workers observe the disconnect.
    pub fn wait(self) {
        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<String>,
    shutdown: Arc<AtomicBool>,
    registry: Arc<JobRegistry>,
    handlers: Arc<HandlerRegistry>,
    events: JobEventBroadcaster,
    queued: Arc<AtomicUsize>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(job_id) => {
                process_job(worker_id, &job_id, &registry, &handlers, &events, &queued);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Claims a dequeued job, runs its handler, and records the terminal
/// transition. The claim (mark RUNNING) happens before the queued counter
/// is decremented, so the admission gate stays conservative and the
/// QUEUED count can never exceed capacity.
fn process_job(
    worker_id: usize,
    job_id: &str,
    registry: &Arc<JobRegistry>,
    handlers: &Arc<HandlerRegistry>,
    events: &JobEventBroadcaster,
    queued: &Arc<AtomicUsize>,
) {
    let claimed = registry.update(job_id, |job| job.mark_running());
    queued.fetch_sub(1, Ordering::AcqRel);

    match claimed {
        None => {
            // Internal fault: an id was dispatched for a record that no
            // longer exists, e.g. purged by external retention.
            let fault = WorkerError::MissingRecord {
                job_id: job_id.to_string(),
            };
            error!("Worker {}: {}", worker_id, fault);
            return;
        }
        Some(false) => {
            warn!(
                "Worker {}: job '{}' was no longer QUEUED at claim time, skipping",
                worker_id, job_id
            );
            return;
        }
        Some(true) => {}
    }

    let record = match registry.get(job_id) {
        Some(record) => record,
        None => {
            let fault = WorkerError::MissingRecord {
                job_id: job_id.to_string(),
            };
            error!("Worker {}: {} after claim", worker_id, fault);
            return;
        }
    };

    debug!(
        "Worker {} processing job {} ({})",
        worker_id, job_id, record.job_type
    );
    events.send(JobEvent::started(&record));

    let handler = match handlers.resolve(record.job_type) {
        Some(handler) => handler,
        None => {
            // Cannot happen through submit (closed enum), but is still
            // contained per-job rather than crashing the worker.
            let message = format!("No handler registered for job type: {}", record.job_type);
            error!("Worker {}: {}", worker_id, message);
            finish_error(job_id, &message, registry, events);
            return;
        }
    };

    let progress = RegistryProgress {
        job_id: job_id.to_string(),
        registry: Arc::clone(registry),
        events: events.clone(),
    };

    let span = info_span!("job", job_id = %job_id, job_type = %record.job_type, worker_id);
    let outcome = {
        let _guard = span.entered();
        catch_unwind(AssertUnwindSafe(|| {
            handler.execute(&record.payload, &progress)
        }))
    };

    match outcome {
        Ok(Ok(result)) => {
            let applied = registry.update(job_id, |job| job.mark_done(result));
            if applied != Some(true) {
                error!(
                    "Worker {}: completion transition rejected for job '{}'",
                    worker_id, job_id
                );
                return;
            }
            if let Some(record) = registry.get(job_id) {
                events.send(JobEvent::completed(&record));
            }
            debug!("Worker {} finished job {}", worker_id, job_id);
        }
        Ok(Err(e)) => {
            warn!("Worker {}: job {} failed: {}", worker_id, job_id, e);
            finish_error(job_id, &e.to_string(), registry, events);
        }
        Err(panic) => {
            let message = format!("Handler panicked: {}", panic_message(panic.as_ref()));
            error!("Worker {}: job {} {}", worker_id, job_id, message);
            finish_error(job_id, &message, registry, events);
        }
    }
}

fn finish_error(
    job_id: &str,
    message: &str,
    registry: &Arc<JobRegistry>,
    events: &JobEventBroadcaster,
) {
    let applied = registry.update(job_id, |job| job.mark_error(message));
    if applied != Some(true) {
        error!("Failure transition rejected for job '{}'", job_id);
        return;
    }
    if let Some(record) = registry.get(job_id) {
        events.send(JobEvent::failed(&record));
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Relays a handler's progress callbacks into the owning job's record and
/// the event stream. Updates for a job that is no longer RUNNING are a
/// contract violation and are dropped.
struct RegistryProgress {
    job_id: String,
    registry: Arc<JobRegistry>,
    events: JobEventBroadcaster,
}

impl ProgressSink for RegistryProgress {
    fn update(&self, fraction: f64, message: &str) {
        let applied = self
            .registry
            .update(&self.job_id, |job| job.record_progress(fraction, message));

        match applied {
            Some(true) => {
                if let Some(record) = self.registry.get(&self.job_id) {
                    self.events.send(JobEvent::progress(&record));
                }
            }
            Some(false) => {
                warn!(
                    "Dropping progress update for job '{}': job is not RUNNING",
                    self.job_id
                );
            }
            None => {
                warn!(
                    "Dropping progress update for unknown job '{}'",
                    self.job_id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::record::{JobRecord, JobStatus, JobType};
    use serde_json::json;

    #[test]
    fn test_registry_progress_updates_running_job() {
        let registry = Arc::new(JobRegistry::new());
        let mut record = JobRecord::new(JobType::ProcessDocument, json!({}));
        record.mark_running();
        let job_id = record.job_id.clone();
        registry.insert(record);

        let sink = RegistryProgress {
            job_id: job_id.clone(),
            registry: Arc::clone(&registry),
            events: JobEventBroadcaster::new(10),
        };
        sink.update(0.3, "Extracting text...");

        let record = registry.get(&job_id).unwrap();
        assert_eq!(record.progress, 0.3);
        assert_eq!(record.progress_message, "Extracting text...");
    }

    #[test]
    fn test_registry_progress_drops_update_after_terminal_state() {
        let registry = Arc::new(JobRegistry::new());
        let mut record = JobRecord::new(JobType::ProcessDocument, json!({}));
        record.mark_running();
        record.mark_done(json!({}));
        let job_id = record.job_id.clone();
        registry.insert(record);

        let events = JobEventBroadcaster::new(10);
        let mut rx = events.subscribe();
        let sink = RegistryProgress {
            job_id: job_id.clone(),
            registry: Arc::clone(&registry),
            events,
        };
        sink.update(0.2, "late update");

        let record = registry.get(&job_id).unwrap();
        assert_eq!(record.status, JobStatus::Done);
        assert_eq!(record.progress, 1.0);
        assert_ne!(record.progress_message, "late update");
        // No event emitted for the dropped update.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_registry_progress_unknown_job() {
        let registry = Arc::new(JobRegistry::new());
        let sink = RegistryProgress {
            job_id: "ghost".to_string(),
            registry,
            events: JobEventBroadcaster::new(10),
        };
        // Must not panic.
        sink.update(0.5, "nobody home");
    }

    #[test]
    fn test_panic_message_extraction() {
        let panic: Box<dyn std::any::Any + Send> = Box::new("str panic");
        assert_eq!(panic_message(panic.as_ref()), "str panic");

        let panic: Box<dyn std::any::Any + Send> = Box::new("owned panic".to_string());
        assert_eq!(panic_message(panic.as_ref()), "owned panic");

        let panic: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(panic.as_ref()), "unknown panic");
    }
}
