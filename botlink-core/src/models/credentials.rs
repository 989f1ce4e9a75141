//! Bot credentials and the outcome of a login negotiation

use serde::{Deserialize, Serialize};

/// Credentials handed to the bot process for login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub client_id: String,
    pub token: String,
    #[serde(default)]
    pub api_key: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        token: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            token: token.into(),
            api_key: api_key.into(),
        }
    }

    /// Both `client_id` and `token` are present (the API key is optional).
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.token.trim().is_empty()
    }
}

/// Classification of the bot's answer to a credentials handshake. A missing
/// answer is not an outcome; it surfaces as `BridgeError::Timeout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Bot logged in with these credentials.
    Ready,
    /// Bot was already logged in with these credentials.
    AlreadyReady,
    /// A login is in progress.
    LoggingIn,
    /// A login with other credentials is in progress.
    DifferentCredentials,
    /// Bot rejected the credentials.
    LoginError,
    /// Any other answer; treated as success.
    Other(String),
}

impl SessionOutcome {
    /// Map a raw bot answer. Only `error`, `login` and `different` denote failure.
    pub fn classify(raw: &str) -> Self {
        match raw {
            "ready" => SessionOutcome::Ready,
            "already" => SessionOutcome::AlreadyReady,
            "login" => SessionOutcome::LoggingIn,
            "different" => SessionOutcome::DifferentCredentials,
            "error" => SessionOutcome::LoginError,
            other => SessionOutcome::Other(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SessionOutcome::Ready | SessionOutcome::AlreadyReady | SessionOutcome::Other(_)
        )
    }

    /// Reason shown to the user for a failed negotiation.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            SessionOutcome::LoginError => Some("Invalid credentials"),
            SessionOutcome::LoggingIn => Some("Already logging in"),
            SessionOutcome::DifferentCredentials => {
                Some("Already logging in with different credentials")
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOutcome::Ready => write!(f, "ready"),
            SessionOutcome::AlreadyReady => write!(f, "already"),
            SessionOutcome::Other(raw) => write!(f, "{}", raw),
            failed => write!(f, "{}", failed.failure_reason().unwrap_or("failed")),
        }
    }
}
