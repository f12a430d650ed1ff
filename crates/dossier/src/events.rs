//! Job lifecycle broadcaster for real-time status streaming.
//!
//! Every admission, transition, and progress update emits a [`JobEvent`],
//! so embedding applications can stream job state to clients instead of
//! polling the status endpoint.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::jobs::record::{JobRecord, JobStatus, JobType};

/// What happened to the job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Queued,
    Started,
    Progress,
    Completed,
    Failed,
}

/// Lifecycle event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub kind: JobEventKind,
    pub status: JobStatus,
    /// Fractional completion at the time of the event.
    pub progress: f64,
    /// Human-readable message describing the current activity.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Error message (set on failure events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobEvent {
    fn from_record(record: &JobRecord, kind: JobEventKind, message: &str) -> Self {
        Self {
            job_id: record.job_id.clone(),
            job_type: record.job_type,
            kind,
            status: record.status,
            progress: record.progress,
            message: message.to_string(),
            timestamp: Utc::now(),
            error: record.error.clone(),
        }
    }

    pub fn queued(record: &JobRecord) -> Self {
        Self::from_record(record, JobEventKind::Queued, "Job queued for processing")
    }

    pub fn started(record: &JobRecord) -> Self {
        Self::from_record(record, JobEventKind::Started, "Job started")
    }

    pub fn progress(record: &JobRecord) -> Self {
        Self::from_record(record, JobEventKind::Progress, &record.progress_message)
    }

    pub fn completed(record: &JobRecord) -> Self {
        Self::from_record(record, JobEventKind::Completed, "Job completed successfully")
    }

    pub fn failed(record: &JobRecord) -> Self {
        Self::from_record(record, JobEventKind::Failed, "Job failed")
    }
}

/// Broadcasts job events to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: JobEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for job events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
