//! Wire envelope exchanged with the bot process

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One JSON text frame on the bot channel.
///
/// Requests carry a fresh `id`; the bot echoes it on the response. Frames
/// without an `id` are notifications, or responses from a bot that only
/// echoes the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn request(kind: impl Into<String>, id: Uuid, data: Value) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id),
            data,
        }
    }

    pub fn notification(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            data,
        }
    }

    /// Build the response to this envelope, keeping its type and id.
    pub fn reply(&self, data: Value) -> Self {
        Self {
            kind: self.kind.clone(),
            id: self.id,
            data,
        }
    }
}
