//! Property-based tests for the session state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::conversation::{ConversationBuffer, Message, Origin};
use crate::transport::{ContentDescriptor, TransportError};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_context() -> impl Strategy<Value = SessionContext> {
    (
        prop_oneof![
            Just(SubmitPolicy::Optimistic),
            Just(SubmitPolicy::AwaitConfirmation)
        ],
        prop_oneof![Just(SendPath::Request), Just(SendPath::Channel)],
    )
        .prop_map(|(policy, path)| SessionContext::new(policy, path))
}

fn arb_phase() -> impl Strategy<Value = SessionPhase> {
    prop_oneof![
        Just(SessionPhase::Idle),
        Just(SessionPhase::Submitting),
        Just(SessionPhase::Active),
    ]
}

/// Text with at least one visible character
fn arb_text() -> impl Strategy<Value = String> {
    "[ \t]{0,3}[a-zA-Z0-9?!.]{1,20}[ a-z]{0,10}"
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\r\n]{0,8}"
}

fn arb_message() -> impl Strategy<Value = Message> {
    (
        arb_text(),
        prop_oneof![Just(Origin::User), Just(Origin::System)],
    )
        .prop_map(|(text, origin)| Message::new(text, origin))
}

fn arb_buffer() -> impl Strategy<Value = ConversationBuffer> {
    proptest::collection::vec(arb_message(), 0..6).prop_map(|messages| {
        let mut buffer = ConversationBuffer::new();
        for message in messages {
            match message.origin() {
                Origin::User => {
                    buffer.append_local(message.text()).unwrap();
                }
                Origin::System => {
                    buffer.append_remote(message);
                }
            }
        }
        buffer
    })
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    (
        arb_phase(),
        arb_buffer(),
        "[a-z ]{0,10}",
        proptest::option::of("https?://[a-z]{3,8}\\.com"),
        0u64..8,
    )
        .prop_map(|(phase, buffer, input, submitted_url, resets)| SessionState {
            phase,
            buffer,
            input,
            content: None,
            submitted_url,
            resets,
        })
}

fn arb_active_state() -> impl Strategy<Value = SessionState> {
    arb_state().prop_map(|mut state| {
        state.phase = SessionPhase::Active;
        state
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z:/.]{0,20}".prop_map(|url| Event::SubmitUrl { url }),
        "[a-z ]{0,10}".prop_map(|text| Event::InputChanged { text }),
        prop_oneof![arb_text(), arb_blank()].prop_map(|text| Event::UserMessage { text }),
        Just(Event::Reset),
        "[a-z]{0,10}".prop_map(|summary| Event::UrlSubmitted {
            url: "http://example.com".to_string(),
            content: ContentDescriptor {
                summary: Some(summary),
                ..ContentDescriptor::default()
            },
        }),
        Just(Event::UrlSubmitFailed {
            url: "http://example.com".to_string(),
            error: TransportError::network("refused"),
        }),
        Just(Event::QuestionFailed {
            text: "q".to_string(),
            error: TransportError::status(502, "bad gateway"),
        }),
        arb_message().prop_map(|message| Event::RemoteMessage { message }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Non-blank text in an open chat always lands last, as a user message,
    /// with the input field cleared
    #[test]
    fn local_append_lands_last(state in arb_active_state(), context in arb_context(), text in arb_text()) {
        let result = transition(&state, &context, Event::UserMessage { text: text.clone() }).unwrap();

        prop_assert_eq!(result.new_state.buffer.len(), state.buffer.len() + 1);
        prop_assert_eq!(result.new_state.buffer.last(), Some(&Message::user(text)));
        prop_assert!(result.new_state.input.is_empty());
        prop_assert_eq!(result.effects.len(), 1);
    }

    /// Blank text never changes anything and never reaches the network
    #[test]
    fn blank_local_append_is_rejected(state in arb_state(), context in arb_context(), text in arb_blank()) {
        let result = transition(&state, &context, Event::UserMessage { text });
        prop_assert!(matches!(result, Err(TransitionError::Validation(_))));
    }

    /// Pushed messages always append at the end as system messages,
    /// whatever the payload claimed and whatever the phase
    #[test]
    fn remote_append_is_system(state in arb_state(), context in arb_context(), message in arb_message()) {
        let text = message.text().to_string();
        let result = transition(&state, &context, Event::RemoteMessage { message }).unwrap();

        prop_assert_eq!(result.new_state.phase, state.phase);
        prop_assert_eq!(result.new_state.buffer.last(), Some(&Message::system(text)));
        prop_assert!(result.effects.is_empty());
    }

    /// Reset yields the initial state from anywhere
    #[test]
    fn reset_is_total(state in arb_state(), context in arb_context()) {
        let result = transition(&state, &context, Event::Reset).unwrap();

        prop_assert_eq!(
            &result.new_state,
            &SessionState { resets: state.resets + 1, ..SessionState::default() }
        );
        prop_assert_eq!(result.new_state.phase, SessionPhase::Idle);
        prop_assert!(result.new_state.buffer.is_empty());
        prop_assert!(result.new_state.input.is_empty());
        prop_assert!(result.effects.is_empty());
    }

    /// Optimistic submit from idle opens the chat at once
    #[test]
    fn optimistic_submit_activates(url in "[a-z]{1,10}") {
        let result = transition(
            &SessionState::new(),
            &SessionContext::default(),
            Event::SubmitUrl { url },
        ).unwrap();
        prop_assert_eq!(result.new_state.phase, SessionPhase::Active);
    }

    /// The optimistic policy never moves an open chat back to idle except
    /// through reset
    #[test]
    fn optimistic_chat_stays_open(state in arb_active_state(), events in proptest::collection::vec(arb_event(), 0..20)) {
        let context = SessionContext::default();
        let mut current = state;
        for event in events {
            let was_reset = matches!(event, Event::Reset);
            if let Ok(result) = transition(&current, &context, event) {
                current = result.new_state;
            }
            if was_reset {
                break;
            }
            prop_assert_eq!(current.phase, SessionPhase::Active);
        }
    }

    /// Between resets the buffer only grows, and existing entries never change
    #[test]
    fn buffer_is_append_only(
        state in arb_state(),
        context in arb_context(),
        events in proptest::collection::vec(arb_event(), 0..30),
    ) {
        let mut current = state;
        for event in events {
            let was_reset = matches!(event, Event::Reset);
            let Ok(result) = transition(&current, &context, event) else {
                continue;
            };
            if !was_reset {
                let before = current.buffer.messages();
                let after = result.new_state.buffer.messages();
                prop_assert!(after.len() >= before.len());
                prop_assert!(after.len() <= before.len() + 1);
                prop_assert_eq!(&after[..before.len()], before);
            }
            current = result.new_state;
        }
    }

    /// Every accepted transition emits at most one effect
    #[test]
    fn at_most_one_effect(state in arb_state(), context in arb_context(), event in arb_event()) {
        if let Ok(result) = transition(&state, &context, event) {
            prop_assert!(result.effects.len() <= 1);
        }
    }

    /// Questions go over exactly one path
    #[test]
    fn one_send_path(state in arb_active_state(), context in arb_context(), text in arb_text()) {
        let result = transition(&state, &context, Event::UserMessage { text }).unwrap();
        let asks = result.effects.iter().filter(|e| matches!(e, Effect::AskQuestion { .. })).count();
        let sends = result.effects.iter().filter(|e| matches!(e, Effect::SendOverChannel { .. })).count();
        prop_assert_eq!(asks + sends, 1);
        match context.send_path {
            SendPath::Request => prop_assert_eq!(asks, 1),
            SendPath::Channel => prop_assert_eq!(sends, 1),
        }
    }
}
