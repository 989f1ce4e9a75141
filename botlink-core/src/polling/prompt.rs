//! Countdown shown on a prompt message while waiting for an answer

use super::{drive, edit_quietly, ChatMessage, PollStep, Step};
use crate::state::ProcessState;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const PROMPT_INTERVAL: Duration = Duration::from_secs(1);

/// Posted to the channel when a prompt expires unanswered.
pub const TIMEOUT_NOTICE: &str = "Timeout reached";

#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutcome {
    Answered(Value),
    TimedOut,
    Cancelled,
}

/// Waits for `prompt_data[message_id].value`, rewriting the message with the
/// remaining seconds as `"{content} ({n}s)"`. With `seconds == 0` it waits
/// forever and leaves the text alone. The prompt slot is cleared when the
/// loop ends.
pub struct PromptCountdown {
    state: Arc<ProcessState>,
    message: Arc<dyn ChatMessage>,
    message_id: String,
    content: String,
    seconds: u32,
    elapsed: u32,
}

impl PromptCountdown {
    pub fn new(
        state: Arc<ProcessState>,
        message: Arc<dyn ChatMessage>,
        message_id: impl Into<String>,
        content: impl Into<String>,
        seconds: u32,
    ) -> Self {
        Self {
            state,
            message,
            message_id: message_id.into(),
            content: content.into(),
            seconds,
            elapsed: 0,
        }
    }

    pub async fn run(self, cancel: CancellationToken) -> PromptOutcome {
        drive(self, cancel).await
    }

    fn has_deadline(&self) -> bool {
        self.seconds > 0
    }

    async fn finish(&self, outcome: PromptOutcome) -> PromptOutcome {
        if self.has_deadline() {
            edit_quietly(self.message.as_ref(), &self.content).await;
        }
        self.state.clear_prompt(&self.message_id).await;
        outcome
    }
}

#[async_trait]
impl PollStep for PromptCountdown {
    type Output = PromptOutcome;

    fn interval(&self) -> Duration {
        PROMPT_INTERVAL
    }

    async fn tick(&mut self) -> Step<PromptOutcome> {
        if let Some(value) = self.state.prompt_value(&self.message_id).await {
            return Step::Done(self.finish(PromptOutcome::Answered(value)).await);
        }

        if self.has_deadline() && self.elapsed >= self.seconds {
            let outcome = self.finish(PromptOutcome::TimedOut).await;
            if let Err(e) = self.message.send_to_channel(TIMEOUT_NOTICE).await {
                tracing::debug!(message_id = %self.message_id, error = %e, "Timeout notice failed");
            }
            tracing::debug!(message_id = %self.message_id, seconds = self.seconds, "Prompt timed out");
            return Step::Done(outcome);
        }

        if self.has_deadline() {
            let remaining = self.seconds - self.elapsed;
            let text = format!("{} ({}s)", self.content, remaining);
            edit_quietly(self.message.as_ref(), &text).await;
        }
        self.elapsed += 1;
        Step::Continue
    }

    async fn cancelled(&mut self) -> PromptOutcome {
        self.finish(PromptOutcome::Cancelled).await
    }
}
