//! Login negotiation with the bot process

use crate::error::{BridgeError, Result};
use crate::models::{Credentials, SessionOutcome};
use crate::transport::BotChannel;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Deadline for the credentials handshake
pub const CREDENTIALS_TIMEOUT: Duration = Duration::from_secs(15);

/// Performs the credentials handshake and classifies the bot's login state.
#[derive(Clone)]
pub struct SessionNegotiator {
    channel: Arc<dyn BotChannel>,
    timeout: Duration,
}

impl SessionNegotiator {
    pub fn new(channel: Arc<dyn BotChannel>) -> Self {
        Self {
            channel,
            timeout: CREDENTIALS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the bot to log in with `credentials`.
    ///
    /// Succeeds with `Ready`, `AlreadyReady` or any unrecognised answer
    /// (`Other`). Fails with `Validation` before any I/O when the client id or
    /// token is missing, `Protocol` for `error`/`login`/`different`, and
    /// `Timeout` when the bot does not answer in time.
    pub async fn negotiate(&self, credentials: &Credentials) -> Result<SessionOutcome> {
        if !credentials.is_complete() {
            return Err(BridgeError::Validation("credentials missing".to_string()));
        }

        let payload = serde_json::to_value(credentials)?;
        let raw = self
            .channel
            .call("credentials", payload, Some(self.timeout))
            .await?;

        let outcome = SessionOutcome::classify(&answer_text(&raw));
        match outcome.failure_reason() {
            Some(reason) => {
                tracing::info!(client_id = %credentials.client_id, outcome = ?outcome, "Login refused");
                Err(BridgeError::Protocol(reason.to_string()))
            }
            None => {
                tracing::debug!(client_id = %credentials.client_id, outcome = ?outcome, "Login accepted");
                Ok(outcome)
            }
        }
    }
}

fn answer_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_answer_text() {
        assert_eq!(answer_text(&json!("ready")), "ready");
        assert_eq!(answer_text(&json!(true)), "true");
        assert_eq!(answer_text(&Value::Null), "null");
    }
}
