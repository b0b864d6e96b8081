//! Progress model for the provisioning sequence.
//!
//! Each step produces an immutable snapshot that is appended to the job's
//! history; the status surface always reads the latest snapshot. Flags are
//! monotonic within one execution and counters never decrease.

use serde::{Deserialize, Serialize};

use crate::broadcast::JobProgressTracker;

use super::runner::GroupResult;

/// Step-by-step progress of one provisioning job. Field names are the wire
/// format the polling client renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub group_created: bool,
    #[serde(default)]
    pub avatar_uploaded: bool,
    #[serde(default)]
    pub cover_uploaded: bool,
    #[serde(default)]
    pub posts_published: u32,
    #[serde(default)]
    pub total_posts: u32,
    #[serde(default)]
    pub reviews_topic_created: bool,
    #[serde(default)]
    pub market_enabled: bool,
    #[serde(default)]
    pub services_added: u32,
    #[serde(default)]
    pub total_services: u32,
    #[serde(default)]
    pub address_added: bool,
    #[serde(default)]
    pub auto_responder_enabled: bool,
    /// Free-text label of the step currently executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

/// Events emitted by the workflow while it runs. Terminal transitions
/// (completed/failed) are reported by the queue runtime, which owns the
/// retry policy.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A fresh snapshot after a sub-step.
    Snapshot {
        progress: Progress,
        group_id: Option<i64>,
    },
    /// The job finished; carries the final snapshot and the result.
    Completed {
        progress: Progress,
        result: GroupResult,
    },
    /// The job terminally failed; carries the partial snapshot reached.
    Failed { progress: Progress, error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges workflow events to the broadcast channel and the job store.
pub struct BroadcastProgress {
    tracker: JobProgressTracker,
}

impl BroadcastProgress {
    pub fn new(tracker: JobProgressTracker) -> Self {
        Self { tracker }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Snapshot { progress, group_id } => {
                self.tracker.snapshot(&progress, group_id);
            }
            ProgressEvent::Completed { progress, result } => {
                self.tracker.completed(&progress, &result);
            }
            ProgressEvent::Failed { progress, error } => {
                self.tracker.failed(&progress, &error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_progress_is_all_clear() {
        let progress = Progress::default();
        assert!(!progress.group_created);
        assert!(!progress.auto_responder_enabled);
        assert_eq!(progress.posts_published, 0);
        assert_eq!(progress.total_services, 0);
        assert!(progress.step.is_none());
    }

    #[test]
    fn test_progress_serde_uses_snake_case_wire_names() {
        let mut progress = Progress::default();
        progress.group_created = true;
        progress.posts_published = 2;
        progress.step = Some("publishing_posts".to_string());

        let json = serde_json::to_string(&progress).unwrap();
        assert!(json.contains("\"group_created\":true"));
        assert!(json.contains("\"posts_published\":2"));
        assert!(json.contains("\"step\":\"publishing_posts\""));
    }

    #[test]
    fn test_progress_deserializes_from_partial_json() {
        // Old snapshots may miss newer fields; they default to unset.
        let progress: Progress =
            serde_json::from_str(r#"{"group_created": true, "total_posts": 5}"#).unwrap();
        assert!(progress.group_created);
        assert_eq!(progress.total_posts, 5);
        assert!(!progress.market_enabled);
    }
}
