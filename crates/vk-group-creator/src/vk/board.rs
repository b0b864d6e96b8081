//! `board.*` method wrappers.

use super::types::CreatedTopic;
use super::{param, VkApi, VkError};

impl VkApi {
    /// Opens a discussion topic on the community board.
    pub async fn add_topic(
        &self,
        group_id: i64,
        title: &str,
        text: &str,
        from_group: bool,
    ) -> Result<CreatedTopic, VkError> {
        self.client()
            .call(
                "board.addTopic",
                vec![
                    param("group_id", group_id),
                    param("title", title),
                    param("text", text),
                    param("from_group", u8::from(from_group)),
                ],
            )
            .await
    }
}
