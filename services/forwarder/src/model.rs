//! Wire models.

use serde::{Deserialize, Serialize};

/// Metadata attached to every forwarded request.
pub const DEFAULT_METADATA: &str = "hardcoded metadata for now";

/// A request accepted upstream and published to the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneRequest {
    /// Caller's user id
    pub user_id: String,
    /// Free-form prompt
    #[serde(default)]
    pub prompt: String,
    /// Key/value attachments
    #[serde(default)]
    pub data: Vec<Item>,
}

/// One key/value attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Attachment key
    pub key: String,
    /// Attachment value
    pub value: String,
}

/// The request posted to the downstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeRequest {
    /// Unique id of this forwarded request
    pub id: String,
    /// Free-form metadata
    pub metadata: String,
    /// The original request
    pub one_request: OneRequest,
}

impl ThreeRequest {
    /// Wrap `one_request` under `id` with the default metadata.
    #[must_use]
    pub fn new(id: String, one_request: OneRequest) -> Self {
        Self {
            id,
            metadata: DEFAULT_METADATA.to_string(),
            one_request,
        }
    }
}
