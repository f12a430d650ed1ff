//! Shared helpers for queue integration tests.
//!
//! Provides controllable handlers (instant, gated, failing, panicking) and
//! a polling helper for asserting on asynchronous state transitions.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde_json::json;

use dossier::error::HandlerError;
use dossier::jobs::{JobHandler, ProgressSink};

/// Completes immediately, echoing the payload back as the result.
pub struct InstantHandler;

impl JobHandler for InstantHandler {
    fn execute(
        &self,
        payload: &serde_json::Value,
        progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        progress.update(0.5, "Halfway");
        Ok(json!({ "echo": payload }))
    }
}

/// Blocks inside `execute` until a token is released, so tests can hold
/// workers busy while asserting on queue state.
pub struct GatedHandler {
    tokens: Receiver<()>,
}

impl GatedHandler {
    /// Returns the handler and the sender used to release one job per token.
    pub fn new() -> (Self, Sender<()>) {
        let (release, tokens) = unbounded();
        (Self { tokens }, release)
    }
}

impl JobHandler for GatedHandler {
    fn execute(
        &self,
        _payload: &serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        self.tokens
            .recv_timeout(Duration::from_secs(10))
            .map_err(|_| HandlerError::Failed("gate timed out".to_string()))?;
        Ok(json!({ "released": true }))
    }
}

/// Always fails with the given message.
pub struct FailingHandler {
    pub message: String,
}

impl JobHandler for FailingHandler {
    fn execute(
        &self,
        _payload: &serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        Err(HandlerError::Failed(self.message.clone()))
    }
}

/// Panics inside `execute`.
pub struct PanickingHandler;

impl JobHandler for PanickingHandler {
    fn execute(
        &self,
        _payload: &serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        panic!("handler exploded");
    }
}

/// Records the `label` field of each payload it sees, in execution order.
pub struct RecordingHandler {
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl JobHandler for RecordingHandler {
    fn execute(
        &self,
        payload: &serde_json::Value,
        _progress: &dyn ProgressSink,
    ) -> Result<serde_json::Value, HandlerError> {
        let label = payload["label"].as_str().unwrap_or("").to_string();
        self.seen.lock().unwrap().push(label);
        Ok(json!(null))
    }
}

/// Polls `condition` until it holds or `deadline` elapses.
pub fn wait_for(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
