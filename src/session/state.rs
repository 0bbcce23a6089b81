//! Session state types

use crate::conversation::ConversationBuffer;
use crate::transport::ContentDescriptor;
use serde::{Deserialize, Serialize};

/// Which part of the flow the session is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No URL submitted yet; the URL form is shown
    #[default]
    Idle,
    /// URL submitted, waiting for the backend before showing the chat.
    /// Only reachable with [`SubmitPolicy::AwaitConfirmation`].
    Submitting,
    /// Chat surface shown
    Active,
}

impl SessionPhase {
    pub fn shows_chat(self) -> bool {
        matches!(self, SessionPhase::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Submitting => "submitting",
            SessionPhase::Active => "active",
        }
    }
}

/// Full session state. Owned by the runtime; the view only sees snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub buffer: ConversationBuffer,
    /// Pending input-field text
    pub input: String,
    /// Latest successful submission response
    pub content: Option<ContentDescriptor>,
    pub submitted_url: Option<String>,
    /// Bumped on every reset, so observers can tell a fresh conversation
    /// from one that merely grew
    pub resets: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// When the phase changes after a URL is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPolicy {
    /// Show the chat immediately, before the request resolves. A failed
    /// request is logged and the chat stays open.
    #[default]
    Optimistic,
    /// Wait in `Submitting` for the response; failure returns to `Idle`.
    AwaitConfirmation,
}

/// Which path carries outgoing questions. Exactly one is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPath {
    /// `POST /api/ask_question`
    #[default]
    Request,
    /// `send_message` frame on the push channel
    Channel,
}

/// Immutable configuration for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionContext {
    pub submit_policy: SubmitPolicy,
    pub send_path: SendPath,
}

impl SessionContext {
    pub fn new(submit_policy: SubmitPolicy, send_path: SendPath) -> Self {
        Self {
            submit_policy,
            send_path,
        }
    }
}
