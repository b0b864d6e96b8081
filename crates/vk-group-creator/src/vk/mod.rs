//! VK API client: generic call wrapper plus typed wrappers for the subset
//! of remote procedures the provisioning workflow issues.

pub mod board;
pub mod client;
pub mod error;
pub mod groups;
pub mod market;
pub mod oauth;
pub mod photos;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;
pub mod wall;

use std::sync::Arc;

pub use client::{HttpTransport, Transport, VkApiConfig, VkClient};
pub use error::{TransportError, VkError};
pub use oauth::{AccessToken, OAuthClient};
pub use types::{
    CreatedGroup, CreatedMarketItem, CreatedPost, CreatedTopic, UploadServer, UploadTicket,
    VkApiError, VkApiResponse,
};

/// Typed facade over [`VkClient`]. Method wrappers live in the sibling
/// modules (`groups`, `photos`, `wall`, `board`, `market`) as `impl` blocks.
pub struct VkApi {
    client: Arc<VkClient>,
}

impl VkApi {
    pub fn new(client: VkClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &VkClient {
        &self.client
    }
}

/// Builds one form parameter pair.
pub(crate) fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}
