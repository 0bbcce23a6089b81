//! Chat session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: view
//! and transport events go in, a new state and a list of effects come out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{SendPath, SessionContext, SessionPhase, SessionState, SubmitPolicy};
pub use transition::{transition, TransitionError};
