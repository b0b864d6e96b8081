//! `market.*` method wrappers.

use super::types::CreatedMarketItem;
use super::{param, VkApi, VkError};

/// Parameters for `market.add`.
#[derive(Debug, Clone)]
pub struct MarketItemRequest {
    /// Negative community id (`-group_id`).
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub category_id: u32,
    /// Price in whole rubles.
    pub price: u32,
    pub currency_id: u32,
}

impl VkApi {
    pub async fn add_market_item(
        &self,
        req: &MarketItemRequest,
    ) -> Result<CreatedMarketItem, VkError> {
        self.client()
            .call(
                "market.add",
                vec![
                    param("owner_id", req.owner_id),
                    param("name", &req.name),
                    param("description", &req.description),
                    param("category_id", req.category_id),
                    param("price", req.price),
                    param("currency_id", req.currency_id),
                ],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vk::client::{VkApiConfig, VkClient};
    use crate::vk::testing::FakeTransport;
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_add_market_item() {
        let transport = Arc::new(FakeTransport::new());
        let api = VkApi::new(VkClient::new(
            SecretString::from("t".to_string()),
            VkApiConfig {
                base_url: "https://api.vk.test".to_string(),
                api_version: "5.199".to_string(),
                retry_attempts: 3,
                retry_delay: Duration::from_millis(10),
            },
            Arc::clone(&transport),
        ));

        api.add_market_item(&MarketItemRequest {
            owner_id: -42,
            name: "Classic 60min".to_string(),
            description: "Описание услуги".to_string(),
            category_id: 1,
            price: 2500,
            currency_id: 1,
        })
        .await
        .unwrap();

        let form = transport.form_of("market.add", 0).unwrap();
        assert!(form.contains(&("owner_id".to_string(), "-42".to_string())));
        assert!(form.contains(&("price".to_string(), "2500".to_string())));
        assert!(form.contains(&("currency_id".to_string(), "1".to_string())));
    }
}
