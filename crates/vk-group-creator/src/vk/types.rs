//! Wire types for the VK API subset this service consumes.
//!
//! Every call returns JSON with either a `response` payload or an `error`
//! object carrying a numeric code, a message and the echoed request
//! parameters.

use serde::Deserialize;

/// Envelope of every VK API response.
#[derive(Debug, Clone, Deserialize)]
pub struct VkApiResponse<T> {
    #[serde(default)]
    pub response: Option<T>,
    #[serde(default)]
    pub error: Option<VkApiError>,
}

/// Provider-side error object.
#[derive(Debug, Clone, Deserialize)]
pub struct VkApiError {
    pub error_code: i64,
    pub error_msg: String,
    #[serde(default)]
    pub request_params: Vec<RequestParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestParam {
    pub key: String,
    pub value: String,
}

/// Response of `photos.getOwnerPhotoUploadServer` and
/// `photos.getOwnerCoverPhotoUploadServer`: a pre-negotiated, short-lived
/// upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadServer {
    pub upload_url: String,
}

/// Response of a multipart upload to an upload endpoint. Handed back to the
/// corresponding `photos.save*` commit call.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadTicket {
    #[serde(default)]
    pub server: i64,
    pub photo: String,
    pub hash: String,
}

/// Response of `groups.create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedGroup {
    pub id: i64,
}

/// Response of `wall.post`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub post_id: i64,
}

/// Response of `board.addTopic`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTopic {
    pub topic_id: i64,
}

/// Response of `market.add`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedMarketItem {
    pub market_item_id: i64,
}
