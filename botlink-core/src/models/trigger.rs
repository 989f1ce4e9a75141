//! Workflow trigger records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A workflow activation bound to a webhook identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub webhook_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Trigger-specific settings (channel filters, patterns, ...), passed through untouched.
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

impl Trigger {
    pub fn new(webhook_id: impl Into<String>) -> Self {
        Self {
            webhook_id: webhook_id.into(),
            active: true,
            config: Map::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Event posted to the workflow engine when a trigger fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub content: String,
    pub channel_id: String,
    pub user_id: String,
}

/// Execution registration sent to the bot once a workflow run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionNotice {
    pub execution_id: String,
    pub placeholder_id: String,
    pub channel_id: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}
