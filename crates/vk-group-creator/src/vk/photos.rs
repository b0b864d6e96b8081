//! `photos.*` method wrappers: upload-server negotiation and photo commits.

use super::types::{UploadServer, UploadTicket};
use super::{param, VkApi, VkError};

impl VkApi {
    /// Negotiates an upload endpoint for the community owner photo (avatar).
    pub async fn owner_photo_upload_server(&self) -> Result<UploadServer, VkError> {
        self.client()
            .call("photos.getOwnerPhotoUploadServer", vec![])
            .await
    }

    /// Commits an uploaded owner photo.
    pub async fn save_owner_photo(&self, ticket: &UploadTicket) -> Result<(), VkError> {
        self.client()
            .call_method(
                "photos.saveOwnerPhoto",
                vec![
                    param("photo", &ticket.photo),
                    param("server", ticket.server),
                    param("hash", &ticket.hash),
                ],
            )
            .await?;
        Ok(())
    }

    /// Negotiates a group-scoped upload endpoint for the cover photo.
    pub async fn owner_cover_upload_server(&self, group_id: i64) -> Result<UploadServer, VkError> {
        self.client()
            .call(
                "photos.getOwnerCoverPhotoUploadServer",
                vec![param("group_id", group_id)],
            )
            .await
    }

    /// Commits an uploaded cover photo.
    pub async fn save_owner_cover_photo(&self, ticket: &UploadTicket) -> Result<(), VkError> {
        self.client()
            .call_method(
                "photos.saveOwnerCoverPhoto",
                vec![param("photo", &ticket.photo), param("hash", &ticket.hash)],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vk::client::{VkApiConfig, VkClient};
    use crate::vk::testing::FakeTransport;
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn api_with(transport: Arc<FakeTransport>) -> VkApi {
        VkApi::new(VkClient::new(
            SecretString::from("t".to_string()),
            VkApiConfig {
                base_url: "https://api.vk.test".to_string(),
                api_version: "5.199".to_string(),
                retry_attempts: 3,
                retry_delay: Duration::from_millis(10),
            },
            transport,
        ))
    }

    #[tokio::test]
    async fn test_upload_server_negotiation() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(
            "photos.getOwnerPhotoUploadServer",
            json!({"response": {"upload_url": "https://pu.vk.test/xyz"}}),
        );
        let api = api_with(Arc::clone(&transport));

        let server = api.owner_photo_upload_server().await.unwrap();
        assert_eq!(server.upload_url, "https://pu.vk.test/xyz");
    }

    #[tokio::test]
    async fn test_cover_upload_server_is_group_scoped() {
        let transport = Arc::new(FakeTransport::new());
        let api = api_with(Arc::clone(&transport));

        api.owner_cover_upload_server(42).await.unwrap();

        let form = transport
            .form_of("photos.getOwnerCoverPhotoUploadServer", 0)
            .unwrap();
        assert!(form.contains(&("group_id".to_string(), "42".to_string())));
    }

    #[tokio::test]
    async fn test_save_owner_photo_echoes_ticket() {
        let transport = Arc::new(FakeTransport::new());
        let api = api_with(Arc::clone(&transport));

        let ticket = UploadTicket {
            server: 9,
            photo: "[payload]".to_string(),
            hash: "h".to_string(),
        };
        api.save_owner_photo(&ticket).await.unwrap();

        let form = transport.form_of("photos.saveOwnerPhoto", 0).unwrap();
        assert!(form.contains(&("server".to_string(), "9".to_string())));
        assert!(form.contains(&("photo".to_string(), "[payload]".to_string())));
        assert!(form.contains(&("hash".to_string(), "h".to_string())));
    }
}
