//! Runtime for a chat session
//!
//! One task owns the [`SessionState`] and applies events to it strictly in
//! arrival order. Network calls run as separate tasks and report back as
//! events, so every buffer mutation completes before the next one starts.

mod executor;
pub mod traits;


pub use executor::SessionRuntime;
pub use traits::*;

use crate::session::{Event, SessionContext, SessionState};
use crate::transport::ChannelState;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;

/// What the view gets to read after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub channel: ChannelState,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session runtime has stopped")]
    Stopped,
}

/// Handle used by the view to drive a session and observe it.
///
/// Cheap to clone. The runtime stops once every handle is dropped and no
/// request is still in flight.
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Submit a content URL. Blank URLs are ignored.
    pub async fn submit(&self, url: impl Into<String>) -> Result<(), RuntimeError> {
        self.dispatch(Event::SubmitUrl { url: url.into() }).await
    }

    /// Append a user message and send it. Blank text is ignored.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.dispatch(Event::UserMessage { text: text.into() }).await
    }

    /// Update the pending input-field text
    pub async fn set_input(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.dispatch(Event::InputChanged { text: text.into() }).await
    }

    /// Clear the conversation and return to the URL form
    pub async fn reset(&self) -> Result<(), RuntimeError> {
        self.dispatch(Event::Reset).await
    }

    pub async fn dispatch(&self, event: Event) -> Result<(), RuntimeError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified after every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stream of snapshots, starting with the current one
    pub fn updates(&self) -> WatchStream<SessionSnapshot> {
        WatchStream::new(self.subscribe())
    }
}

/// Build a runtime for a fresh session and spawn it on the current Tokio
/// runtime.
pub fn spawn_session<S, C>(context: SessionContext, submission: Arc<S>, channel: Arc<C>) -> SessionHandle
where
    S: SubmissionService + 'static,
    C: PushChannel + 'static,
{
    let (runtime, handle) = SessionRuntime::new(context, submission, channel);
    tokio::spawn(runtime.run());
    handle
}
