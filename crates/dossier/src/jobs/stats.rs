//! Read-only queue introspection snapshot.

use serde::{Deserialize, Serialize};

use crate::config::QueueConfig;
use crate::jobs::registry::StatusCounts;

/// Snapshot of queue depth and worker occupancy for monitoring and
/// backpressure visibility. Derived from a single registry pass, so
/// `queue_depth` and `running_count` are mutually consistent; the hard
/// bounds (`max_queue_size`, `max_concurrent`) are enforced structurally
/// by admission and the fixed pool size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of jobs in QUEUED state.
    pub queue_depth: usize,
    /// Number of jobs in RUNNING state.
    pub running_count: usize,
    pub max_queue_size: usize,
    pub max_concurrent: usize,
}

impl QueueStats {
    pub fn from_counts(counts: StatusCounts, config: &QueueConfig) -> Self {
        Self {
            queue_depth: counts.queued,
            running_count: counts.running,
            max_queue_size: config.max_queue_size,
            max_concurrent: config.max_concurrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts() {
        let counts = StatusCounts {
            queued: 4,
            running: 2,
            done: 10,
            error: 1,
        };
        let config = QueueConfig {
            max_queue_size: 100,
            max_concurrent: 3,
        };

        let stats = QueueStats::from_counts(counts, &config);
        assert_eq!(stats.queue_depth, 4);
        assert_eq!(stats.running_count, 2);
        assert_eq!(stats.max_queue_size, 100);
        assert_eq!(stats.max_concurrent, 3);
    }

    #[test]
    fn test_serialization_shape() {
        let stats = QueueStats {
            queue_depth: 0,
            running_count: 1,
            max_queue_size: 100,
            max_concurrent: 3,
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["queue_depth"], 0);
        assert_eq!(value["running_count"], 1);
        assert_eq!(value["max_queue_size"], 100);
        assert_eq!(value["max_concurrent"], 3);
    }
}
