//! Effects produced by state transitions

use crate::transport::TransportError;

/// Effects to be executed after a state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Issue the submission request (fire-and-forget)
    SubmitUrl { url: String },

    /// Send a question over the request/response path
    AskQuestion { text: String },

    /// Send a question as a `send_message` frame on the push channel
    SendOverChannel { text: String },

    /// Record a non-fatal transport failure
    LogFailure {
        operation: &'static str,
        /// The URL or question that failed
        subject: String,
        error: TransportError,
    },
}

impl Effect {
    pub fn log_failure(
        operation: &'static str,
        subject: impl Into<String>,
        error: TransportError,
    ) -> Self {
        Effect::LogFailure {
            operation,
            subject: subject.into(),
            error,
        }
    }
}
