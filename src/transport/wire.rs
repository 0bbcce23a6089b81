//! Wire types for the backend's HTTP endpoints and push channel

use crate::conversation::{Message, Origin};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /api/upload`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadRequest {
    pub video_url: String,
}

/// Body of `POST /api/ask_question`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    pub question: String,
}

/// Error body some endpoints return alongside a non-2xx status
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response of `POST /api/upload`.
///
/// Older backends answer `{ "content": ... }`; current ones answer
/// `{ "summary": ..., "chunk_summaries": [...] }`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunk_summaries: Vec<String>,
}

impl ContentDescriptor {
    /// The main description of the processed content, if the backend sent one
    pub fn headline(&self) -> Option<&str> {
        self.content.as_deref().or(self.summary.as_deref())
    }
}

/// Payload of a server-to-client `message` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    /// Claimed sender. Informational only; see [`InboundMessage::into_message`].
    /// Values that are not strings are accepted and read as absent.
    #[serde(
        default,
        deserialize_with = "claimed_sender",
        skip_serializing_if = "Option::is_none"
    )]
    pub from: Option<String>,
}

fn claimed_sender<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(from) => Ok(Some(from)),
        _ => Ok(None),
    }
}

impl InboundMessage {
    #[cfg(test)]
    pub fn new(text: impl Into<String>, from: Option<&str>) -> Self {
        Self {
            text: text.into(),
            from: from.map(String::from),
        }
    }

    /// Convert to a [`Message`] carrying the claimed origin. The reconciler
    /// normalizes it to system on append.
    pub fn into_message(self) -> Message {
        let origin = Origin::from_wire(self.from.as_deref());
        Message::new(self.text, origin)
    }
}

/// Payload of a client-to-server `send_message` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub from: String,
}

impl OutboundMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from: Origin::User.as_str().to_string(),
        }
    }
}

/// A push channel frame: `{"event": <name>, "data": <payload>}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChannelFrame {
    Message(InboundMessage),
    SendMessage(OutboundMessage),
}
