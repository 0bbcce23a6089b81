//! Duplex push channel
//!
//! A single WebSocket connection per process. The backend pushes `message`
//! frames over it; the client may emit `send_message` frames. The connection
//! lives independently of any chat session and is never torn down by a
//! session reset.
//!
//! State machine: `Disconnected -> connect() -> Connected -> (failure) ->
//! Disconnected`. There is no automatic reconnection.

use super::wire::{ChannelFrame, InboundMessage, OutboundMessage};
use super::TransportError;
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;

/// Capacity of the inbound fan-out buffer; slower subscribers skip ahead
const INBOUND_CAPACITY: usize = 256;
const OUTBOUND_CAPACITY: usize = 64;

static GLOBAL_CHANNEL: OnceLock<Arc<ChannelConnection>> = OnceLock::new();

/// Connection state of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connected,
}

/// The push channel connection.
///
/// Only the transport mutates it; everyone else subscribes or sends.
pub struct ChannelConnection {
    url: String,
    inbound_tx: broadcast::Sender<InboundMessage>,
    /// Writer queue, present only while connected
    outbound: Arc<Mutex<Option<mpsc::Sender<WsMessage>>>>,
    state_tx: Arc<watch::Sender<ChannelState>>,
    /// Serializes `connect()` calls
    connecting: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

impl ChannelConnection {
    pub fn new(url: impl Into<String>) -> Self {
        let (inbound_tx, _) = broadcast::channel(INBOUND_CAPACITY);
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        Self {
            url: url.into(),
            inbound_tx,
            outbound: Arc::new(Mutex::new(None)),
            state_tx: Arc::new(state_tx),
            connecting: tokio::sync::Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    /// The process-wide connection.
    ///
    /// The first call creates it; later calls return the same connection and
    /// ignore `url`. Code that needs its own connection (tests) should call
    /// [`ChannelConnection::new`] and pass the result in.
    pub fn global(url: &str) -> Arc<Self> {
        let channel = GLOBAL_CHANNEL.get_or_init(|| Arc::new(Self::new(url)));
        if channel.url != url {
            tracing::debug!(
                requested = %url,
                existing = %channel.url,
                "Push channel already initialized, reusing existing connection"
            );
        }
        Arc::clone(channel)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ChannelState {
        *self.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// Open the connection. A no-op when already connected.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let _guard = self.connecting.lock().await;
        if self.state() == ChannelState::Connected {
            return Ok(());
        }
        if self.shutdown.is_cancelled() {
            return Err(TransportError::channel("push channel has been shut down"));
        }

        tracing::debug!(url = %self.url, "Opening push channel");
        let (ws_stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::channel(format!("Failed to connect to {}: {e}", self.url)))?;
        let (mut write, mut read) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<WsMessage>(OUTBOUND_CAPACITY);
        *lock(&self.outbound) = Some(out_tx);
        self.state_tx.send_replace(ChannelState::Connected);
        tracing::info!(url = %self.url, "Push channel connected");

        // Writer: drains the outbound queue until it closes or the socket fails
        tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                if let Err(e) = write.send(message).await {
                    tracing::debug!(error = %e, "Push channel write failed");
                    break;
                }
            }
            let _ = write.close().await;
        });

        // Reader: fans inbound messages out to subscribers
        let inbound_tx = self.inbound_tx.clone();
        let outbound = Arc::clone(&self.outbound);
        let state_tx = Arc::clone(&self.state_tx);
        let shutdown = self.shutdown.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::debug!("Push channel reader stopping on shutdown");
                        break;
                    }
                    frame = read.next() => match frame {
                        Some(Ok(WsMessage::Text(text))) => dispatch_frame(&text, &inbound_tx),
                        Some(Ok(WsMessage::Close(_))) | None => {
                            tracing::warn!(url = %url, "Push channel closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(url = %url, error = %e, "Push channel failed");
                            break;
                        }
                    }
                }
            }

            // Dropping the sender ends the writer task
            lock(&outbound).take();
            state_tx.send_replace(ChannelState::Disconnected);
            tracing::info!(url = %url, "Push channel disconnected");
        });

        Ok(())
    }

    /// Register for inbound messages. Every subscriber receives every message.
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.inbound_tx.subscribe())
    }

    /// Best-effort emit of a `send_message` frame
    pub async fn send_message(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let Some(tx) = lock(&self.outbound).clone() else {
            return Err(TransportError::channel("push channel is not connected"));
        };

        let text = serde_json::to_string(&ChannelFrame::SendMessage(message))
            .map_err(|e| TransportError::decode(format!("Failed to encode frame: {e}")))?;
        tx.send(WsMessage::Text(text.into()))
            .await
            .map_err(|_| TransportError::channel("push channel closed while sending"))
    }

    /// Stop the reader task. Used at process exit; there is no way back.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

fn dispatch_frame(text: &str, inbound_tx: &broadcast::Sender<InboundMessage>) {
    match serde_json::from_str::<ChannelFrame>(text) {
        Ok(ChannelFrame::Message(message)) => {
            // No subscribers is not an error; the message is simply dropped
            let _ = inbound_tx.send(message);
        }
        Ok(ChannelFrame::SendMessage(_)) => {
            tracing::debug!("Ignoring client-bound send_message frame");
        }
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unrecognized push frame");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A registration for inbound push messages.
///
/// Dropping it unsubscribes; [`Subscription::unsubscribe`] does the same
/// explicitly.
pub struct Subscription {
    rx: broadcast::Receiver<InboundMessage>,
}

impl Subscription {
    pub(crate) fn new(rx: broadcast::Receiver<InboundMessage>) -> Self {
        Self { rx }
    }

    /// Next inbound message, or `None` once the channel is gone for good
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Push subscriber lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {
        tracing::debug!("Push subscription released");
    }
}
