//! Transport adapter
//!
//! Request/response calls are used to *send* (submit a URL, ask a
//! question); the duplex push channel is used to *receive*. Replies to
//! questions never come back in the HTTP response body.

mod channel;
mod error;
mod http;
pub(crate) mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{ChannelConnection, ChannelState, Subscription};
pub use error::TransportError;
pub use http::HttpTransport;
pub use wire::{ContentDescriptor, OutboundMessage};
