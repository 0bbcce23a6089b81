//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::transport::{
    ChannelConnection, ChannelState, ContentDescriptor, HttpTransport, OutboundMessage,
    Subscription, TransportError,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Request/response side of the transport
#[async_trait]
pub trait SubmissionService: Send + Sync {
    /// Submit a content URL for processing
    async fn submit_url(&self, url: &str) -> Result<ContentDescriptor, TransportError>;

    /// Ask a question; the reply arrives over the push channel
    async fn ask_question(&self, text: &str) -> Result<(), TransportError>;
}

/// Duplex push channel
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Register for inbound messages
    fn subscribe(&self) -> Subscription;

    /// Best-effort emit of an outgoing message
    async fn send_message(&self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Observe connection state changes
    fn watch_state(&self) -> watch::Receiver<ChannelState>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SubmissionService + ?Sized> SubmissionService for Arc<T> {
    async fn submit_url(&self, url: &str) -> Result<ContentDescriptor, TransportError> {
        (**self).submit_url(url).await
    }

    async fn ask_question(&self, text: &str) -> Result<(), TransportError> {
        (**self).ask_question(text).await
    }
}

#[async_trait]
impl<T: PushChannel + ?Sized> PushChannel for Arc<T> {
    fn subscribe(&self) -> Subscription {
        (**self).subscribe()
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<(), TransportError> {
        (**self).send_message(message).await
    }

    fn watch_state(&self) -> watch::Receiver<ChannelState> {
        (**self).watch_state()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

#[async_trait]
impl SubmissionService for HttpTransport {
    async fn submit_url(&self, url: &str) -> Result<ContentDescriptor, TransportError> {
        HttpTransport::submit_url(self, url).await
    }

    async fn ask_question(&self, text: &str) -> Result<(), TransportError> {
        HttpTransport::ask_question(self, text).await
    }
}

#[async_trait]
impl PushChannel for ChannelConnection {
    fn subscribe(&self) -> Subscription {
        ChannelConnection::subscribe(self)
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<(), TransportError> {
        ChannelConnection::send_message(self, message).await
    }

    fn watch_state(&self) -> watch::Receiver<ChannelState> {
        ChannelConnection::watch_state(self)
    }
}
