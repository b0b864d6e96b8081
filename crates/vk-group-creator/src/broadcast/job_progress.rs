//! Job progress broadcaster for real-time status streaming.
//!
//! Every sub-step of a provisioning job emits a [`JobProgressEvent`]
//! snapshot. Events fan out over a tokio broadcast channel (for streaming
//! consumers) and are applied to the [`JobStore`](crate::broadcast::JobStore)
//! that backs the polling surface.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::provision::{GroupResult, Progress};
use crate::queue::job::{JobState, QueueKind};

use super::job_store::JobStore;

/// One progress snapshot of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    /// Unique job identifier.
    pub job_id: String,
    /// Which queue the job belongs to.
    pub queue: QueueKind,
    /// The student whose community is being provisioned.
    pub student_id: String,
    /// Overall job state.
    pub status: JobState,
    /// Step-by-step progress at the time of this event.
    pub progress: Progress,
    /// VK group id, once the group exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    /// Final result (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GroupResult>,
    /// Error message (set on terminal failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    /// Creates an in-flight snapshot event.
    pub fn snapshot(
        job_id: &str,
        queue: QueueKind,
        student_id: &str,
        progress: &Progress,
        group_id: Option<i64>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            queue,
            student_id: student_id.to_string(),
            status: JobState::Active,
            progress: progress.clone(),
            group_id,
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a completion event.
    pub fn completed(
        job_id: &str,
        queue: QueueKind,
        student_id: &str,
        progress: &Progress,
        result: &GroupResult,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            queue,
            student_id: student_id.to_string(),
            status: JobState::Completed,
            progress: progress.clone(),
            group_id: Some(result.group_id),
            result: Some(result.clone()),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a terminal failure event carrying the partial progress.
    pub fn failed(
        job_id: &str,
        queue: QueueKind,
        student_id: &str,
        progress: &Progress,
        group_id: Option<i64>,
        error: &str,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            queue,
            student_id: student_id.to_string(),
            status: JobState::Failed,
            progress: progress.clone(),
            group_id,
            result: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    /// Completion event for a post-scheduling job (no group result).
    pub fn batch_completed(
        job_id: &str,
        student_id: &str,
        progress: &Progress,
        group_id: Option<i64>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            queue: QueueKind::PostScheduling,
            student_id: student_id.to_string(),
            status: JobState::Completed,
            progress: progress.clone(),
            group_id,
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts job progress events for streaming consumers.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers. No active receivers is fine.
    pub fn send(&self, event: JobProgressEvent) {
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker for one job, wired to this broadcaster and the
    /// given store.
    pub fn start_job(
        &self,
        job_id: &str,
        queue: QueueKind,
        student_id: &str,
        store: Arc<JobStore>,
    ) -> JobProgressTracker {
        JobProgressTracker {
            job_id: job_id.to_string(),
            queue,
            student_id: student_id.to_string(),
            sender: Arc::clone(&self.sender),
            store,
        }
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Emits progress events for a single job: over the broadcast channel and
/// into the job store, so polling clients and streaming clients observe
/// the same snapshots.
pub struct JobProgressTracker {
    job_id: String,
    queue: QueueKind,
    student_id: String,
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
    store: Arc<JobStore>,
}

impl JobProgressTracker {
    fn emit(&self, event: JobProgressEvent) {
        self.store.apply(&event);
        let _ = self.sender.send(event);
    }

    /// Pushes an in-flight snapshot.
    pub fn snapshot(&self, progress: &Progress, group_id: Option<i64>) {
        self.emit(JobProgressEvent::snapshot(
            &self.job_id,
            self.queue,
            &self.student_id,
            progress,
            group_id,
        ));
    }

    /// Marks the job as completed.
    pub fn completed(&self, progress: &Progress, result: &GroupResult) {
        self.emit(JobProgressEvent::completed(
            &self.job_id,
            self.queue,
            &self.student_id,
            progress,
            result,
        ));
    }

    /// Marks a post-scheduling job as completed.
    pub fn batch_completed(&self, progress: &Progress, group_id: Option<i64>) {
        self.emit(JobProgressEvent::batch_completed(
            &self.job_id,
            &self.student_id,
            progress,
            group_id,
        ));
    }

    /// Marks the job as terminally failed.
    pub fn failed(&self, progress: &Progress, error: &str) {
        let group_id = self.store.get(&self.job_id).and_then(|j| j.group_id);
        self.emit(JobProgressEvent::failed(
            &self.job_id,
            self.queue,
            &self.student_id,
            progress,
            group_id,
            error,
        ));
    }
}
