//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same new
//! state and effects. All I/O happens in the runtime that executes the
//! effects.

use super::{Effect, Event, SendPath, SessionContext, SessionPhase, SessionState, SubmitPolicy};
use crate::conversation::{is_blank, ValidationFailure};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Nothing is sent and nothing is shown for these
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationFailure),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state.phase, event) {
        // ============================================================
        // URL submission
        // ============================================================
        (SessionPhase::Idle, Event::SubmitUrl { url }) => {
            let url = url.trim();
            if url.is_empty() {
                return Err(ValidationFailure::EmptyUrl.into());
            }

            let mut next = state.clone();
            next.phase = match context.submit_policy {
                SubmitPolicy::Optimistic => SessionPhase::Active,
                SubmitPolicy::AwaitConfirmation => SessionPhase::Submitting,
            };
            next.submitted_url = Some(url.to_string());

            Ok(TransitionResult::new(next).with_effect(Effect::SubmitUrl {
                url: url.to_string(),
            }))
        }

        (phase, Event::SubmitUrl { .. }) => Err(TransitionError::InvalidTransition(format!(
            "URL already submitted (phase {})",
            phase.as_str()
        ))),

        // Success (re-)opens the chat, including after a reset: the request
        // is never cancelled, so a late response still applies.
        (_, Event::UrlSubmitted { url, content }) => {
            let mut next = state.clone();
            next.submitted_url.get_or_insert(url);
            next.phase = SessionPhase::Active;
            next.content = Some(content);
            Ok(TransitionResult::new(next))
        }

        // Only the confirmation policy rolls back
        (SessionPhase::Submitting, Event::UrlSubmitFailed { url, error }) => {
            let mut next = state.clone();
            next.phase = SessionPhase::Idle;
            next.submitted_url = None;
            Ok(TransitionResult::new(next).with_effect(Effect::log_failure("submit_url", url, error)))
        }

        (_, Event::UrlSubmitFailed { url, error }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::log_failure("submit_url", url, error))),

        // ============================================================
        // Chat messages
        // ============================================================
        (SessionPhase::Active, Event::UserMessage { text }) => {
            let mut next = state.clone();
            next.buffer.append_local(&text)?;
            next.input.clear();

            let effect = match context.send_path {
                SendPath::Request => Effect::AskQuestion { text },
                SendPath::Channel => Effect::SendOverChannel { text },
            };
            Ok(TransitionResult::new(next).with_effect(effect))
        }

        (phase, Event::UserMessage { text }) => {
            if is_blank(&text) {
                Err(ValidationFailure::EmptyMessage.into())
            } else {
                Err(TransitionError::InvalidTransition(format!(
                    "Chat is not open (phase {})",
                    phase.as_str()
                )))
            }
        }

        // The push channel outlives sessions, so arrivals land in any phase
        (_, Event::RemoteMessage { message }) => {
            let mut next = state.clone();
            next.buffer.append_remote(message);
            Ok(TransitionResult::new(next))
        }

        (_, Event::QuestionFailed { text, error }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::log_failure("ask_question", text, error))),

        // ============================================================
        // Input field and reset
        // ============================================================
        (_, Event::InputChanged { text }) => {
            let mut next = state.clone();
            next.input = text;
            Ok(TransitionResult::new(next))
        }

        // Full reinitialization; in-flight requests are not cancelled
        (_, Event::Reset) => Ok(TransitionResult::new(SessionState {
            resets: state.resets.wrapping_add(1),
            ..SessionState::default()
        })),
    }
}
