//! Conversation buffer and message reconciliation
//!
//! Two sources feed one buffer: messages the user types, appended
//! optimistically before any network round trip, and messages pushed by the
//! backend, appended on arrival. Both go through [`ConversationBuffer`],
//! which only ever appends.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logical source of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Typed locally
    User,
    /// Delivered from the backend
    System,
}

impl Origin {
    /// Parse the `from` field of a wire payload. Anything that is not
    /// `"user"` counts as the system.
    pub fn from_wire(from: Option<&str>) -> Self {
        match from {
            Some(f) if f.eq_ignore_ascii_case("user") => Origin::User,
            _ => Origin::System,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::System => "system",
        }
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    text: String,
    origin: Origin,
}

impl Message {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Origin::User)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(text, Origin::System)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Consume the message, keeping only its text
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Input rejected before anything is appended or sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("URL is empty")]
    EmptyUrl,
    #[error("message text is empty")]
    EmptyMessage,
}

/// Ordered, append-only sequence of messages.
///
/// Once a message is appended its position and content never change. The
/// buffer can only be emptied by replacing it wholesale (session reset).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a locally typed message.
    ///
    /// Blank text (empty or whitespace only) is rejected and leaves the
    /// buffer untouched. The text is stored as typed; trimming is only used
    /// for the emptiness check.
    pub fn append_local(&mut self, text: &str) -> Result<&Message, ValidationFailure> {
        if is_blank(text) {
            return Err(ValidationFailure::EmptyMessage);
        }
        Ok(self.push(Message::user(text)))
    }

    /// Append a message delivered by the backend.
    ///
    /// The origin is always normalized to [`Origin::System`], whatever the
    /// payload claimed. No deduplication: the same payload delivered twice is
    /// appended twice.
    pub fn append_remote(&mut self, message: Message) -> &Message {
        if message.origin() != Origin::System {
            tracing::debug!(
                claimed = message.origin().as_str(),
                "Normalizing pushed message origin to system"
            );
        }
        self.push(Message::system(message.into_text()))
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConversationBuffer {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Empty or whitespace-only text
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
