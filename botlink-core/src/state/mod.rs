//! Shared process state: triggers, logs, prompt answers and placeholder matching
//!
//! One `ProcessState` exists per running bot-process supervisor. It is built at
//! startup, shared as `Arc<ProcessState>` and dropped at shutdown; nothing in
//! this crate reaches it through a global.

mod logs;

pub use logs::{LogBuffer, MAX_LOG_LINES};

use crate::error::Result;
use crate::models::{Configuration, Trigger};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Destination for log lines mirrored into a chat channel.
#[async_trait]
pub trait LogMirror: Send + Sync {
    async fn mirror(&self, channel_id: &str, line: &str) -> Result<()>;
}

/// Answer slot for an interactive prompt, written by an external responder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptEntry {
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default)]
struct AutoLogSettings {
    ready: bool,
    enabled: bool,
    channel_id: String,
}

impl AutoLogSettings {
    fn mirror_channel(&self) -> Option<&str> {
        if self.ready && self.enabled && !self.channel_id.is_empty() {
            Some(&self.channel_id)
        } else {
            None
        }
    }
}

pub struct ProcessState {
    webhook_host: String,
    test_mode: bool,
    triggers: RwLock<HashMap<String, Trigger>>,
    logs: LogBuffer,
    auto_logs: RwLock<AutoLogSettings>,
    prompt_data: RwLock<HashMap<String, PromptEntry>>,
    placeholder_matching: RwLock<HashMap<String, String>>,
    log_mirror: Option<Arc<dyn LogMirror>>,
}

impl ProcessState {
    pub fn new(webhook_host: impl Into<String>, test_mode: bool) -> Self {
        Self {
            webhook_host: webhook_host.into(),
            test_mode,
            triggers: RwLock::new(HashMap::new()),
            logs: LogBuffer::default(),
            auto_logs: RwLock::new(AutoLogSettings::default()),
            prompt_data: RwLock::new(HashMap::new()),
            placeholder_matching: RwLock::new(HashMap::new()),
            log_mirror: None,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.webhook_host.clone(), config.test_mode)
    }

    /// Attach the sink used to mirror log lines into a chat channel.
    pub fn with_log_mirror(mut self, mirror: Arc<dyn LogMirror>) -> Self {
        self.log_mirror = Some(mirror);
        self
    }

    pub fn webhook_host(&self) -> &str {
        &self.webhook_host
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    // --- logs ---

    /// Append a log line. When the bot is ready and auto-logs are enabled the
    /// line is also mirrored to the configured chat channel in the background.
    pub async fn add_log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!(target: "botlink::state", "{}", message);

        let line = format!(
            "{} - {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        self.logs.push(line.clone()).await;

        let channel_id = self
            .auto_logs
            .read()
            .await
            .mirror_channel()
            .map(str::to_string);
        if let (Some(channel_id), Some(mirror)) = (channel_id, self.log_mirror.clone()) {
            tokio::spawn(async move {
                if let Err(e) = mirror.mirror(&channel_id, &line).await {
                    tracing::debug!(channel_id = %channel_id, error = %e, "Log mirror failed");
                }
            });
        }
    }

    pub async fn logs(&self) -> Vec<String> {
        self.logs.snapshot().await
    }

    pub async fn log_count(&self) -> usize {
        self.logs.len().await
    }

    pub async fn set_ready(&self, ready: bool) {
        self.auto_logs.write().await.ready = ready;
    }

    pub async fn is_ready(&self) -> bool {
        self.auto_logs.read().await.ready
    }

    pub async fn set_auto_logs(&self, enabled: bool, channel_id: impl Into<String>) {
        let mut settings = self.auto_logs.write().await;
        settings.enabled = enabled;
        settings.channel_id = channel_id.into();
    }

    // --- triggers ---

    pub async fn register_trigger(&self, trigger: Trigger) {
        self.triggers
            .write()
            .await
            .insert(trigger.webhook_id.clone(), trigger);
    }

    pub async fn remove_trigger(&self, webhook_id: &str) -> Option<Trigger> {
        self.triggers.write().await.remove(webhook_id)
    }

    pub async fn trigger(&self, webhook_id: &str) -> Option<Trigger> {
        self.triggers.read().await.get(webhook_id).cloned()
    }

    /// Mark a trigger inactive and return the updated record.
    pub(crate) async fn deactivate_trigger(&self, webhook_id: &str) -> Option<Trigger> {
        let mut triggers = self.triggers.write().await;
        let trigger = triggers.get_mut(webhook_id)?;
        trigger.active = false;
        Some(trigger.clone())
    }

    // --- prompts ---

    /// Create an empty answer slot for a prompt message.
    pub async fn open_prompt(&self, message_id: impl Into<String>) {
        self.prompt_data
            .write()
            .await
            .insert(message_id.into(), PromptEntry::default());
    }

    pub async fn set_prompt_value(&self, message_id: impl Into<String>, value: Value) {
        self.prompt_data
            .write()
            .await
            .entry(message_id.into())
            .or_default()
            .value = Some(value);
    }

    pub async fn prompt_value(&self, message_id: &str) -> Option<Value> {
        self.prompt_data
            .read()
            .await
            .get(message_id)
            .and_then(|entry| entry.value.clone())
    }

    pub async fn clear_prompt(&self, message_id: &str) -> Option<PromptEntry> {
        self.prompt_data.write().await.remove(message_id)
    }

    // --- placeholders ---

    pub async fn match_placeholder(
        &self,
        placeholder_id: impl Into<String>,
        message_id: impl Into<String>,
    ) {
        self.placeholder_matching
            .write()
            .await
            .insert(placeholder_id.into(), message_id.into());
    }

    pub async fn unmatch_placeholder(&self, placeholder_id: &str) -> Option<String> {
        self.placeholder_matching.write().await.remove(placeholder_id)
    }

    pub async fn placeholder_message(&self, placeholder_id: &str) -> Option<String> {
        self.placeholder_matching
            .read()
            .await
            .get(placeholder_id)
            .cloned()
    }
}
