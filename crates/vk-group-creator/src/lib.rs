pub mod broadcast;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod logging;
pub mod profile;
pub mod provision;
pub mod queue;
pub mod secrets;
pub mod vk;

pub use broadcast::{JobProgressBroadcaster, JobProgressEvent, JobStore, StoredJob};
pub use config::{Config, QueueSettings, VkSettings};
pub use error::{ConfigError, GroupCreatorError, ProfileError, QueueError, Result};
pub use profile::{PricingItem, Profile};
pub use provision::{GroupResult, Progress, ProvisionError, Provisioner};
pub use queue::{JobState, QueueKind, QueueRuntime};
pub use secrets::{SecretError, TokenEncryptor};
pub use vk::{OAuthClient, VkApi, VkApiConfig, VkClient, VkError};
