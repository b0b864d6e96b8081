//! Job data types shared by the queue runtime and the status surface.

use serde::{Deserialize, Serialize};

use crate::profile::Profile;

/// Observable job lifecycle state.
///
/// `Delayed` only occurs on the post-scheduling queue, for batches carrying
/// a future publish time that have not been picked up yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        };
        write!(f, "{}", label)
    }
}

/// Which queue a job belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    GroupCreation,
    PostScheduling,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::GroupCreation => "group_creation",
            QueueKind::PostScheduling => "post_scheduling",
        }
    }
}

/// Payload of a group-creation job. The access token is not carried here:
/// it is stored encrypted at enqueue time and decrypted by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCreationJobData {
    pub student_id: String,
    pub profile: Profile,
}

/// One post handed to the post-scheduling queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredPost {
    pub content: String,
    /// Days until publication; `None` publishes immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_days: Option<u32>,
}

/// Payload of a post-scheduling job, spawned by the provisioning workflow
/// for posts beyond the immediate-publish quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSchedulingJobData {
    pub group_id: i64,
    pub student_id: String,
    pub posts: Vec<DeferredPost>,
}

impl PostSchedulingJobData {
    /// True when any post in the batch carries a future publish time.
    pub fn has_delayed_posts(&self) -> bool {
        self.posts.iter().any(|p| p.delay_days.is_some())
    }
}
