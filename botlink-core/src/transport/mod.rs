//! Bot channel transport
//!
//! `BotChannel` is the seam every consumer (negotiator, resolvers, dispatcher)
//! talks to; `ChannelClient` is the WebSocket implementation.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Request/response access to the bot process.
#[async_trait]
pub trait BotChannel: Send + Sync {
    /// Send `payload` tagged with `kind` and wait for the matching response.
    /// Without a `timeout` the call waits until the channel is closed.
    async fn call(&self, kind: &str, payload: Value, timeout: Option<Duration>) -> Result<Value>;

    /// Queue a message without waiting for any response. At most once, no retries.
    fn notify(&self, kind: &str, payload: Value) -> Result<()>;
}

pub mod connection;
pub mod pending;
pub mod websocket;

pub use connection::{ChannelOptions, DEFAULT_RECONNECT_INTERVAL};
pub use pending::{PendingCallRegistry, PendingGuard};
pub use websocket::ChannelClient;
