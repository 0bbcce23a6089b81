//! Events that can occur in a session

use crate::conversation::Message;
use crate::transport::{ContentDescriptor, TransportError};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // View events
    SubmitUrl {
        url: String,
    },
    InputChanged {
        text: String,
    },
    UserMessage {
        text: String,
    },
    Reset,

    // Submission request completions
    UrlSubmitted {
        url: String,
        content: ContentDescriptor,
    },
    UrlSubmitFailed {
        url: String,
        error: TransportError,
    },

    // Question delivery failed on whichever path carried it
    QuestionFailed {
        text: String,
        error: TransportError,
    },

    // Push channel arrival
    RemoteMessage {
        message: Message,
    },
}

impl Event {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::SubmitUrl { .. } => "submit_url",
            Event::InputChanged { .. } => "input_changed",
            Event::UserMessage { .. } => "user_message",
            Event::Reset => "reset",
            Event::UrlSubmitted { .. } => "url_submitted",
            Event::UrlSubmitFailed { .. } => "url_submit_failed",
            Event::QuestionFailed { .. } => "question_failed",
            Event::RemoteMessage { .. } => "remote_message",
        }
    }
}
