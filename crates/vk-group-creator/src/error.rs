use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroupCreatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("VK API error: {0}")]
    Vk(#[from] crate::vk::VkError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] crate::provision::ProvisionError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {name}")]
    MissingEnv { name: &'static str },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvNotUnicode { name: &'static str },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Could not determine a database path (no home directory)")]
    NoDatabasePath,
}

/// Validation failures for a submitted profile.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("At least one massage technique is required")]
    NoTechniques,

    #[error("At least one priced service is required")]
    NoPricing,

    #[error("Service '{title}' must have a price greater than zero")]
    InvalidPrice { title: String },

    #[error("An address is required when home visits are not offered")]
    MissingAddress,
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue is shutting down, job rejected")]
    ShuttingDown,

    #[error("Invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),

    #[error("Queue channel closed unexpectedly")]
    ChannelClosed,

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

pub type Result<T> = std::result::Result<T, GroupCreatorError>;
