use crate::profile::Profile;
use crate::queue::job::DeferredPost;

use super::progress::Progress;

/// Mutable state of one provisioning execution.
///
/// A fresh job starts with [`ProvisionContext::new`]; a queue-level retry
/// rebuilds the context from the last persisted snapshot with
/// [`ProvisionContext::resume`] so completed steps are not re-issued.
pub struct ProvisionContext {
    pub student_id: String,
    pub profile: Profile,
    pub progress: Progress,
    /// Set by the create-group step (or restored on resume).
    pub group_id: Option<i64>,
    /// Built by the publish-posts step, consumed by the scheduling step.
    pub deferred: Vec<DeferredPost>,
}

impl ProvisionContext {
    pub fn new(student_id: String, profile: Profile) -> Self {
        Self {
            student_id,
            profile,
            progress: Progress::default(),
            group_id: None,
            deferred: Vec::new(),
        }
    }

    pub fn resume(
        student_id: String,
        profile: Profile,
        progress: Progress,
        group_id: Option<i64>,
    ) -> Self {
        Self {
            student_id,
            profile,
            progress,
            group_id,
            deferred: Vec::new(),
        }
    }
}
