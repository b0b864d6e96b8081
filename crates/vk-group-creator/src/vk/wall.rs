//! `wall.*` method wrappers.

use super::types::CreatedPost;
use super::{param, VkApi, VkError};

/// Parameters for `wall.post`. A `publish_date` in the future makes VK hold
/// the post and publish it at that unix timestamp.
#[derive(Debug, Clone)]
pub struct WallPostRequest {
    /// Negative community id (`-group_id`) to post on a community wall.
    pub owner_id: i64,
    pub message: String,
    pub from_group: bool,
    pub publish_date: Option<i64>,
}

impl VkApi {
    pub async fn post_to_wall(&self, req: &WallPostRequest) -> Result<CreatedPost, VkError> {
        let mut params = vec![
            param("owner_id", req.owner_id),
            param("message", &req.message),
            param("from_group", u8::from(req.from_group)),
        ];
        if let Some(publish_date) = req.publish_date {
            params.push(param("publish_date", publish_date));
        }

        self.client().call("wall.post", params).await
    }
}
