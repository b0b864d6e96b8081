//! VK OAuth authorization-code exchange.
//!
//! The HTTP session around the flow (state storage, redirects) belongs to
//! the embedding server; this module only builds the authorize URL and
//! exchanges a code for an access token.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::VkSettings;

use super::error::{TransportError, VkError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Token response from `oauth.vk.com/access_token`.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    pub user_id: i64,
}

// The token itself must never leak through debug formatting.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: String,
}

pub struct OAuthClient {
    http: reqwest::Client,
    settings: VkSettings,
}

impl OAuthClient {
    pub fn new(settings: VkSettings) -> Result<Self, VkError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| VkError::Transport {
                attempts: 0,
                source: TransportError::Http(e),
            })?;
        Ok(Self { http, settings })
    }

    /// URL the end user is sent to for granting access.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&scope={}&response_type=code&state={}&v={}",
            self.settings.oauth_base_url,
            urlencode(&self.settings.client_id),
            urlencode(&self.settings.redirect_uri),
            urlencode(&self.settings.scope),
            urlencode(state),
            urlencode(&self.settings.api_version),
        )
    }

    /// Exchanges an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, VkError> {
        use secrecy::ExposeSecret;

        let url = format!("{}/access_token", self.settings.oauth_base_url);
        debug!("exchanging oauth code for access token");

        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.expose_secret()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("code", code),
        ];

        let body: serde_json::Value = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| VkError::Transport {
                attempts: 1,
                source: TransportError::Http(e),
            })?
            .json()
            .await
            .map_err(|e| VkError::Transport {
                attempts: 1,
                source: TransportError::Http(e),
            })?;

        if body.get("error").is_some() {
            let error: OAuthErrorBody =
                serde_json::from_value(body).map_err(|e| VkError::MalformedResponse {
                    method: "oauth.access_token".to_string(),
                    reason: e.to_string(),
                })?;
            return Err(VkError::OAuth {
                error: error.error,
                description: error.error_description,
            });
        }

        serde_json::from_value(body).map_err(|e| VkError::MalformedResponse {
            method: "oauth.access_token".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Percent-encodes the characters that matter for VK OAuth query values.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn settings() -> VkSettings {
        VkSettings {
            client_id: "12345".to_string(),
            client_secret: SecretString::from("secret".to_string()),
            redirect_uri: "http://localhost:3001/api/v1/oauth/callback".to_string(),
            api_version: "5.199".to_string(),
            base_url: "https://api.vk.com".to_string(),
            oauth_base_url: "https://oauth.vk.com".to_string(),
            scope: "groups,photos,wall,market,docs".to_string(),
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }

    #[test]
    fn test_authorize_url() {
        let client = OAuthClient::new(settings()).unwrap();
        let url = client.authorize_url("abc123");

        assert!(url.starts_with("https://oauth.vk.com/authorize?"));
        assert!(url.contains("client_id=12345"));
        assert!(url.contains("scope=groups%2Cphotos%2Cwall%2Cmarket%2Cdocs"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3001"));
    }

    #[test]
    fn test_access_token_debug_redacted() {
        let token = AccessToken {
            access_token: "vk1.a.very-secret".to_string(),
            expires_in: 86400,
            user_id: 99,
        };
        let debug = format!("{:?}", token);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("abc-123_~."), "abc-123_~.");
        assert_eq!(urlencode("a b/c"), "a%20b%2Fc");
    }
}
