//! Error types shared by the coordination layer

use thiserror::Error;

/// Failure of a bridge operation.
///
/// `Display` renders the short reason string that callers show directly to
/// the user (e.g. `"credentials missing"`, `"timeout"`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Input rejected before any I/O was attempted.
    #[error("{0}")]
    Validation(String),

    /// A channel exchange exceeded its deadline.
    #[error("timeout")]
    Timeout,

    /// The bot answered with one of its recognised failure tokens.
    #[error("{0}")]
    Protocol(String),

    /// Channel or HTTP layer failure.
    #[error("{0}")]
    Transport(String),

    /// The channel client was shut down while the call was pending.
    #[error("channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout)
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Transport(format!("invalid payload: {}", err))
    }
}

/// Errors raised while loading or saving configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,
}
