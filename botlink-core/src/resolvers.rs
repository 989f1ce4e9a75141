//! Queries used by the workflow node: dropdown lists, execution registration
//! and raw requests.
//!
//! The dropdown resolvers never fail. Every error turns into a single
//! placeholder option so the UI always has something to render.

use crate::error::Result;
use crate::models::{Credentials, DropdownOption, ExecutionNotice, RoleEntry};
use crate::session::SessionNegotiator;
use crate::transport::BotChannel;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Deadline for list queries issued after a successful login
pub const LIST_TIMEOUT: Duration = Duration::from_secs(5);

const EVERYONE_ROLE: &str = "@everyone";
const REOPEN_HINT: &str = "then close and reopen this node";
const RETRY_HINT: &str = "close and reopen this node to retry";

#[derive(Clone)]
pub struct BotResolvers {
    channel: Arc<dyn BotChannel>,
    negotiator: SessionNegotiator,
    list_timeout: Duration,
}

impl BotResolvers {
    pub fn new(channel: Arc<dyn BotChannel>) -> Self {
        Self {
            negotiator: SessionNegotiator::new(Arc::clone(&channel)),
            channel,
            list_timeout: LIST_TIMEOUT,
        }
    }

    pub fn with_negotiator(mut self, negotiator: SessionNegotiator) -> Self {
        self.negotiator = negotiator;
        self
    }

    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    pub fn negotiator(&self) -> &SessionNegotiator {
        &self.negotiator
    }

    /// Text channels of the bot's server, or one placeholder explaining why there are none.
    pub async fn get_channels(&self, credentials: &Credentials) -> Vec<DropdownOption> {
        if let Err(e) = self.negotiator.negotiate(credentials).await {
            return vec![DropdownOption::placeholder(e.to_string())];
        }

        let channels = match self.list("list:channels").await {
            Ok(value) => parse_list::<DropdownOption>(value),
            Err(reason) => return vec![DropdownOption::placeholder(reason)],
        };

        if channels.is_empty() {
            vec![DropdownOption::placeholder(format!(
                "Your server has no text channels, add at least one, {}",
                REOPEN_HINT
            ))]
        } else {
            channels
        }
    }

    /// Roles of the bot's server without `@everyone`, or one placeholder.
    pub async fn get_roles(&self, credentials: &Credentials) -> Vec<DropdownOption> {
        if let Err(e) = self.negotiator.negotiate(credentials).await {
            return vec![DropdownOption::placeholder(e.to_string())];
        }

        let roles: Vec<DropdownOption> = match self.list("list:roles").await {
            Ok(value) => parse_list::<RoleEntry>(value)
                .into_iter()
                .filter(|role| role.name != EVERYONE_ROLE)
                .map(DropdownOption::from)
                .collect(),
            Err(reason) => return vec![DropdownOption::placeholder(reason)],
        };

        if roles.is_empty() {
            vec![DropdownOption::placeholder(format!(
                "Your server has no roles, add at least one, {}",
                REOPEN_HINT
            ))]
        } else {
            roles
        }
    }

    /// Tell the bot which placeholder and channel belong to a workflow execution.
    pub async fn register_execution(&self, notice: &ExecutionNotice) -> Result<Value> {
        let payload = serde_json::to_value(notice)?;
        self.channel.call("execution", payload, None).await
    }

    /// Arbitrary request to the bot, waiting without deadline.
    pub async fn ipc_request(&self, kind: &str, payload: Value) -> Result<Value> {
        self.channel.call(kind, payload, None).await
    }

    async fn list(&self, kind: &str) -> std::result::Result<Value, String> {
        self.channel
            .call(kind, Value::Null, Some(self.list_timeout))
            .await
            .map_err(|e| {
                tracing::warn!(kind = kind, error = %e, "List query failed");
                format!("Could not load the list from the bot ({}), {}", e, RETRY_HINT)
            })
    }
}

/// Falsy and malformed answers count as an empty list.
fn parse_list<T: serde::de::DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(_) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unexpected list entries from bot");
            Vec::new()
        }),
        _ => Vec::new(),
    }
}
