use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of background job kinds. Adding a kind means adding a
/// variant here and registering a handler for it, nothing else.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ProcessDocument,
    SourceSync,
    GeneratePackage,
    DedupScan,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ProcessDocument => "process_document",
            JobType::SourceSync => "source_sync",
            JobType::GeneratePackage => "generate_package",
            JobType::DedupScan => "dedup_scan",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job. Transitions are strictly forward:
/// `QUEUED -> RUNNING -> {DONE, ERROR}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "QUEUED"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Done => write!(f, "DONE"),
            JobStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// State tracked per submission. Created by admission in QUEUED state and
/// mutated only by the worker that claims it; every transition method
/// returns whether it applied, so an out-of-order call is a no-op the
/// caller can log instead of a corrupted record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    /// Fractional completion in [0.0, 1.0]; meaningful only while RUNNING.
    pub progress: f64,
    /// Human-readable description of the current step, overwritten on each
    /// progress update.
    pub progress_message: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Handler result payload; set exactly once, on transition to DONE.
    pub result: Option<serde_json::Value>,
    /// Failure description; set exactly once, on transition to ERROR.
    pub error: Option<String>,
    /// Submission payload, understood only by the job type's handler.
    #[serde(skip)]
    pub payload: serde_json::Value,
}

impl JobRecord {
    /// Creates a new QUEUED record with a freshly allocated identifier.
    pub fn new(job_type: JobType, payload: serde_json::Value) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            job_type,
            status: JobStatus::Queued,
            progress: 0.0,
            progress_message: String::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            payload,
        }
    }

    /// QUEUED -> RUNNING. Sets `started_at` exactly once.
    pub fn mark_running(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// Progress update while RUNNING. Fractions are clamped to [0.0, 1.0];
    /// monotonicity is the handler's contract and is not enforced here.
    pub fn record_progress(&mut self, fraction: f64, message: &str) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.progress = fraction.clamp(0.0, 1.0);
        self.progress_message = message.to_string();
        true
    }

    /// RUNNING -> DONE. Sets `completed_at` and the result payload, and
    /// forces progress to 1.0.
    pub fn mark_done(&mut self, result: serde_json::Value) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Done;
        self.completed_at = Some(Utc::now());
        self.progress = 1.0;
        self.result = Some(result);
        true
    }

    /// RUNNING -> ERROR. Sets `completed_at` and the failure description.
    pub fn mark_error(&mut self, error: &str) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Error;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.to_string());
        true
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
