//! The provisioning workflow: an ordered, resumable sequence of VK API
//! operations turning a profile into a fully configured community.

pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use context::ProvisionContext;
pub use error::ProvisionError;
pub use progress::{BroadcastProgress, NoopProgress, Progress, ProgressEvent, ProgressReporter};
pub use runner::{GroupResult, ProvisionStep, Provisioner, STEP_SEQUENCE};
