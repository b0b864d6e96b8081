//! Error taxonomy for the VK API client.

use thiserror::Error;

/// "Too many requests per second": retryable.
pub const ERROR_TOO_MANY_REQUESTS: i64 = 6;
/// "Flood control": retryable.
pub const ERROR_FLOOD_CONTROL: i64 = 9;
/// "Captcha needed": requires human intervention, never retried.
pub const ERROR_CAPTCHA_REQUIRED: i64 = 14;

/// Returns true for provider error codes the client retries with backoff.
pub fn is_rate_limit_code(code: i64) -> bool {
    code == ERROR_TOO_MANY_REQUESTS || code == ERROR_FLOOD_CONTROL
}

/// Failures below the VK protocol layer: connection errors, timeouts,
/// unexpected HTTP statuses, undecodable bodies.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned HTTP {0}")]
    Status(u16),
}

#[derive(Error, Debug)]
pub enum VkError {
    /// Non-retryable provider rejection, surfaced with the provider's code.
    #[error("VK API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The provider demands a human challenge; the worker cannot solve it.
    #[error("Captcha required: {message}")]
    CaptchaRequired { message: String },

    /// Rate-limit class error still present after the attempt ceiling.
    #[error("Rate limited by VK after {attempts} attempts (error {code}: {message})")]
    RateLimited {
        code: i64,
        message: String,
        attempts: u32,
    },

    /// Transport-level failure still present after the attempt ceiling.
    #[error("Transport failure after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// One-shot upload failure. Upload URLs are single-use, so this is
    /// terminal without retry.
    #[error("Upload failed: {0}")]
    Upload(#[source] TransportError),

    /// OAuth token exchange rejection.
    #[error("OAuth error '{error}': {description}")]
    OAuth { error: String, description: String },

    #[error("Malformed VK response for {method}: {reason}")]
    MalformedResponse { method: String, reason: String },
}
