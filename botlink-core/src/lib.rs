//! # botlink core
//!
//! Coordination layer between a workflow-engine plugin and a separately
//! running chat-bot process: a shared WebSocket channel with correlated
//! calls, login negotiation, countdown/loading loops on chat messages, and
//! workflow trigger delivery with self-deactivation on failure.

pub mod dispatch;
pub mod error;
pub mod models;
pub mod polling;
pub mod resolvers;
pub mod services;
pub mod session;
pub mod state;
pub mod transport;

pub use dispatch::TriggerDispatcher;
pub use error::{BridgeError, Result};
pub use resolvers::BotResolvers;
pub use session::SessionNegotiator;
pub use state::ProcessState;
pub use transport::{BotChannel, ChannelClient};
