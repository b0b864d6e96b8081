use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{ContentError, QueueError};
use crate::secrets::SecretError;
use crate::vk::VkError;

#[derive(Error, Debug)]
pub enum ProvisionError {
    /// A remote call failed; `step` names the workflow step for the status
    /// surface ("group created, but market setup failed").
    #[error("Step '{step}' failed: {source}")]
    Vk {
        step: &'static str,
        #[source]
        source: VkError,
    },

    /// No stored credential for this student. Retrying cannot help.
    #[error("No stored access token for student {student_id}")]
    MissingCredential { student_id: String },

    /// The stored credential could not be decrypted. Retrying cannot help.
    #[error("Failed to decrypt stored access token: {0}")]
    Credential(#[from] SecretError),

    #[error("Content generation failed: {0}")]
    Content(#[from] ContentError),

    /// Scheduling the deferred post batch failed; the job aborts.
    #[error("Failed to enqueue deferred posts: {0}")]
    Enqueue(#[from] QueueError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Internal invariant: steps past the first require a group id.
    #[error("No group id available although group_created is set")]
    MissingGroupId,
}

impl ProvisionError {
    /// Local precondition failures abort without consuming queue retries;
    /// everything else is eligible for the whole-job retry policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProvisionError::MissingCredential { .. } | ProvisionError::Credential(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let missing = ProvisionError::MissingCredential {
            student_id: "s1".to_string(),
        };
        assert!(missing.is_fatal());

        let vk = ProvisionError::Vk {
            step: "creating_group",
            source: VkError::Api {
                code: 100,
                message: "bad params".to_string(),
            },
        };
        assert!(!vk.is_fatal());
    }

    #[test]
    fn test_step_context_in_message() {
        let err = ProvisionError::Vk {
            step: "setting_up_market",
            source: VkError::Api {
                code: 214,
                message: "Access denied".to_string(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("setting_up_market"));
        assert!(text.contains("214"));
    }
}
