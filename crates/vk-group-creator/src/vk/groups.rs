//! `groups.*` method wrappers.

use super::types::CreatedGroup;
use super::{param, VkApi, VkError};

/// Parameters for `groups.create`.
#[derive(Debug, Clone)]
pub struct GroupCreateRequest {
    pub title: String,
    /// VK community type, e.g. "page".
    pub group_type: String,
    /// Public page subtype, e.g. "company".
    pub subtype: String,
    pub public_category: u32,
    pub public_subcategory: u32,
}

/// Parameters for `groups.edit`. Only the features this service toggles.
#[derive(Debug, Clone, Default)]
pub struct GroupEditRequest {
    pub group_id: i64,
    pub description: Option<String>,
    pub website: Option<String>,
    pub wall: Option<u8>,
    pub topics: Option<u8>,
    pub photos: Option<u8>,
    pub market: Option<u8>,
    pub messages: Option<u8>,
}

impl VkApi {
    /// Creates a community and returns its numeric id.
    pub async fn create_group(&self, req: &GroupCreateRequest) -> Result<CreatedGroup, VkError> {
        self.client()
            .call(
                "groups.create",
                vec![
                    param("title", &req.title),
                    param("type", &req.group_type),
                    param("subtype", &req.subtype),
                    param("public_category", req.public_category),
                    param("public_subcategory", req.public_subcategory),
                ],
            )
            .await
    }

    /// Edits community settings, enabling the sections later steps depend on.
    pub async fn edit_group(&self, req: &GroupEditRequest) -> Result<(), VkError> {
        let mut params = vec![param("group_id", req.group_id)];
        if let Some(ref description) = req.description {
            params.push(param("description", description));
        }
        if let Some(ref website) = req.website {
            params.push(param("website", website));
        }
        if let Some(wall) = req.wall {
            params.push(param("wall", wall));
        }
        if let Some(topics) = req.topics {
            params.push(param("topics", topics));
        }
        if let Some(photos) = req.photos {
            params.push(param("photos", photos));
        }
        if let Some(market) = req.market {
            params.push(param("market", market));
        }
        if let Some(messages) = req.messages {
            params.push(param("messages", messages));
        }

        self.client().call_method("groups.edit", params).await?;
        Ok(())
    }

    /// Toggles the community marketplace with a fixed currency.
    pub async fn toggle_market(
        &self,
        group_id: i64,
        enabled: bool,
        currency: u32,
    ) -> Result<(), VkError> {
        self.client()
            .call_method(
                "groups.toggleMarket",
                vec![
                    param("group_id", group_id),
                    param("enabled", u8::from(enabled)),
                    param("currency", currency),
                ],
            )
            .await?;
        Ok(())
    }

    /// Enables the Bots Long Poll API so incoming messages get an automatic
    /// acknowledgement.
    pub async fn set_long_poll_settings(
        &self,
        group_id: i64,
        enabled: bool,
        message_new: bool,
    ) -> Result<(), VkError> {
        self.client()
            .call_method(
                "groups.setLongPollSettings",
                vec![
                    param("group_id", group_id),
                    param("enabled", u8::from(enabled)),
                    param("message_new", u8::from(message_new)),
                ],
            )
            .await?;
        Ok(())
    }
}
