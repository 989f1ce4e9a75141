//! Workflow trigger delivery
//!
//! Posts trigger events to the workflow engine's webhook. A failed delivery
//! deactivates the trigger and tells the bot, so it stops firing a workflow
//! that is no longer listening. Test executions never touch trigger state.

use crate::error::BridgeError;
use crate::models::{Trigger, TriggerEvent};
use crate::state::ProcessState;
use crate::transport::BotChannel;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookBody<'a> {
    content: &'a str,
    channel_id: &'a str,
    placeholder_id: &'a str,
    user_id: &'a str,
}

pub struct TriggerDispatcher {
    state: Arc<ProcessState>,
    channel: Arc<dyn BotChannel>,
    client: Client,
}

impl TriggerDispatcher {
    pub fn new(state: Arc<ProcessState>, channel: Arc<dyn BotChannel>) -> Self {
        Self {
            state,
            channel,
            client: Client::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Webhook URL for `webhook_id`, honouring test mode.
    pub fn webhook_url(&self, webhook_id: &str) -> String {
        let suffix = if self.state.test_mode() { "-test" } else { "" };
        format!(
            "{}/webhook{}/{}/webhook",
            self.state.webhook_host().trim_end_matches('/'),
            suffix,
            webhook_id
        )
    }

    /// Deliver one trigger event. Returns true when the engine accepted it.
    pub async fn dispatch(
        &self,
        webhook_id: &str,
        event: &TriggerEvent,
        placeholder_id: &str,
    ) -> bool {
        if let Some(trigger) = self.state.trigger(webhook_id).await {
            if !trigger.active {
                tracing::debug!(webhook_id = webhook_id, "Skipping inactive trigger");
                return false;
            }
        }

        let body = WebhookBody {
            content: &event.content,
            channel_id: &event.channel_id,
            placeholder_id,
            user_id: &event.user_id,
        };

        match self.post(webhook_id, &body).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(webhook_id = webhook_id, error = %e, "Trigger delivery failed");
                self.handle_failure(webhook_id, &e).await;
                false
            }
        }
    }

    async fn post(&self, webhook_id: &str, body: &WebhookBody<'_>) -> Result<(), BridgeError> {
        let url = self.webhook_url(webhook_id);
        self.client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map(|_| ())
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }

    async fn handle_failure(&self, webhook_id: &str, error: &BridgeError) {
        if self.state.test_mode() {
            return;
        }
        let Some(trigger) = self.state.deactivate_trigger(webhook_id).await else {
            return;
        };

        self.state
            .add_log(format!(
                "Trigger {} deactivated after failed delivery: {}",
                webhook_id, error
            ))
            .await;
        self.notify_deactivated(&trigger);
    }

    /// Best effort, at most once. A retry could resurrect stale trigger settings.
    fn notify_deactivated(&self, trigger: &Trigger) {
        let payload = match serde_json::to_value(trigger) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(webhook_id = %trigger.webhook_id, error = %e, "Trigger record not serializable");
                return;
            }
        };
        if let Err(e) = self.channel.notify("trigger", payload) {
            tracing::warn!(webhook_id = %trigger.webhook_id, error = %e, "Trigger deactivation notice not sent");
        }
    }
}
