//! Job queue and worker runtime: bounded-concurrency execution of
//! provisioning jobs with whole-job retry and a status-lookup surface.

pub mod job;
pub mod runtime;

pub use job::{
    DeferredPost, GroupCreationJobData, JobState, PostSchedulingJobData, QueueKind,
};
pub use runtime::{PostQueueHandle, QueueRuntime};
