//! Generic VK API call wrapper with retry, backoff and error classification.
//!
//! The client knows nothing about the provisioning workflow. It appends the
//! auth/version parameters to every call, classifies provider errors into
//! retryable (rate-limit class) and terminal ones, and retries transport
//! failures with exponential backoff up to a fixed attempt ceiling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::VkSettings;

use super::error::{is_rate_limit_code, TransportError, VkError, ERROR_CAPTCHA_REQUIRED};
use super::types::{UploadTicket, VkApiError, VkApiResponse};

/// Connect timeout for the underlying HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw HTTP boundary of the client. Production uses [`HttpTransport`];
/// tests script responses through a fake.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs a form-encoded body and decodes the JSON response.
    async fn send_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<Value, TransportError>;

    /// POSTs one file as multipart form data and decodes the JSON response.
    /// A non-2xx status is an error; the body is not consulted.
    async fn upload(
        &self,
        url: &str,
        field_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, TransportError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<Value, TransportError> {
        let response = self.http.post(url).form(form).send().await?;
        Ok(response.json().await?)
    }

    async fn upload(
        &self,
        url: &str,
        field_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, TransportError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("image.jpg")
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new().part(field_name.to_string(), part);

        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Tuning knobs for the call wrapper, derived from [`VkSettings`].
#[derive(Debug, Clone)]
pub struct VkApiConfig {
    pub base_url: String,
    pub api_version: String,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&VkSettings> for VkApiConfig {
    fn from(settings: &VkSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            api_version: settings.api_version.clone(),
            retry_attempts: settings.retry_attempts,
            retry_delay: settings.retry_delay,
        }
    }
}

/// Stateless call executor for one access token. No local state is retained
/// between calls beyond the HTTP connection pool.
pub struct VkClient {
    transport: Arc<dyn Transport>,
    token: SecretString,
    config: VkApiConfig,
}

impl VkClient {
    pub fn new(token: SecretString, config: VkApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            token,
            config,
        }
    }

    /// Convenience constructor with the production HTTP transport.
    pub fn with_http(token: SecretString, settings: &VkSettings) -> Result<Self, VkError> {
        let transport = HttpTransport::new(settings.timeout)
            .map_err(|e| VkError::Transport {
                attempts: 0,
                source: e,
            })?;
        Ok(Self::new(token, settings.into(), Arc::new(transport)))
    }

    /// Executes one VK API method and returns the decoded `response` payload.
    ///
    /// Rate-limit class errors (codes 6 and 9) and transport failures are
    /// retried with exponential backoff (`retry_delay * 2^(attempt-1)`) up
    /// to `retry_attempts` executions. Every other provider error is
    /// terminal on the first occurrence.
    pub async fn call_method(
        &self,
        method: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, VkError> {
        let url = format!("{}/method/{}", self.config.base_url, method);

        let mut form: Vec<(String, String)> = Vec::with_capacity(params.len() + 2);
        form.push((
            "access_token".to_string(),
            self.token.expose_secret().to_string(),
        ));
        form.push(("v".to_string(), self.config.api_version.clone()));
        form.extend(params);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(method, attempt, "vk api call");

            match self.transport.send_form(&url, &form).await {
                Ok(body) => match decode_envelope(method, body)? {
                    Envelope::Success(payload) => return Ok(payload),
                    Envelope::Error(error) => {
                        if is_rate_limit_code(error.error_code) {
                            if attempt < self.config.retry_attempts {
                                let delay = self.backoff_delay(attempt);
                                warn!(
                                    method,
                                    attempt,
                                    code = error.error_code,
                                    delay_ms = delay.as_millis() as u64,
                                    "vk rate limit, backing off"
                                );
                                tokio::time::sleep(delay).await;
                                continue;
                            }
                            return Err(VkError::RateLimited {
                                code: error.error_code,
                                message: error.error_msg,
                                attempts: attempt,
                            });
                        }

                        if error.error_code == ERROR_CAPTCHA_REQUIRED {
                            warn!(method, "vk captcha challenge, cannot proceed");
                            return Err(VkError::CaptchaRequired {
                                message: error.error_msg,
                            });
                        }

                        return Err(VkError::Api {
                            code: error.error_code,
                            message: error.error_msg,
                        });
                    }
                },
                Err(transport_error) => {
                    if attempt < self.config.retry_attempts {
                        let delay = self.backoff_delay(attempt);
                        warn!(
                            method,
                            attempt,
                            error = %transport_error,
                            delay_ms = delay.as_millis() as u64,
                            "vk transport failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(VkError::Transport {
                        attempts: attempt,
                        source: transport_error,
                    });
                }
            }
        }
    }

    /// Like [`call_method`](Self::call_method), decoding the payload into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, VkError> {
        let payload = self.call_method(method, params).await?;
        serde_json::from_value(payload).map_err(|e| VkError::MalformedResponse {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    /// One-shot multipart upload to a pre-obtained upload endpoint.
    ///
    /// Upload URLs are single-use and short-lived, so there is no retry:
    /// any failure is terminal.
    pub async fn upload_file(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        field_name: &str,
    ) -> Result<UploadTicket, VkError> {
        debug!(field_name, size = bytes.len(), "vk file upload");

        let body = self
            .transport
            .upload(upload_url, field_name, bytes)
            .await
            .map_err(VkError::Upload)?;

        serde_json::from_value(body).map_err(|e| VkError::MalformedResponse {
            method: "upload".to_string(),
            reason: e.to_string(),
        })
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        // attempt is 1-based: first retry waits the base delay.
        self.config.retry_delay * 2u32.saturating_pow(attempt - 1)
    }
}

enum Envelope {
    Success(Value),
    Error(VkApiError),
}

fn decode_envelope(method: &str, body: Value) -> Result<Envelope, VkError> {
    let envelope: VkApiResponse<Value> =
        serde_json::from_value(body).map_err(|e| VkError::MalformedResponse {
            method: method.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(error) = envelope.error {
        return Ok(Envelope::Error(error));
    }
    match envelope.response {
        Some(payload) => Ok(Envelope::Success(payload)),
        None => Err(VkError::MalformedResponse {
            method: method.to_string(),
            reason: "neither 'response' nor 'error' present".to_string(),
        }),
    }
}
