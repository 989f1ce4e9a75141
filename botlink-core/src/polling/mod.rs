//! Timer-driven polling loops that animate a chat message until an external
//! condition shows up in the process state.
//!
//! Each loop is a [`PollStep`] state machine run by [`drive`]: tick, then
//! sleep for the step's interval, then tick again. The sleep is armed only
//! after the tick (including its message edit) has finished, so ticks of one
//! loop never overlap. A `CancellationToken` stops the loop at any point.

mod placeholder;
mod prompt;

pub use placeholder::{spawn_placeholder_animation, PlaceholderAnimation, PLACEHOLDER_INTERVAL};
pub use prompt::{PromptCountdown, PromptOutcome, PROMPT_INTERVAL, TIMEOUT_NOTICE};

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A posted chat message the loops can rewrite.
#[async_trait]
pub trait ChatMessage: Send + Sync {
    /// Replace the message text.
    async fn edit(&self, content: &str) -> Result<()>;

    /// Post a new message in the same channel.
    async fn send_to_channel(&self, content: &str) -> Result<()>;
}

/// Result of one tick
#[derive(Debug, PartialEq)]
pub enum Step<T> {
    Continue,
    Done(T),
}

#[async_trait]
pub trait PollStep: Send {
    type Output: Send;

    /// Delay between the end of one tick and the start of the next.
    fn interval(&self) -> Duration;

    async fn tick(&mut self) -> Step<Self::Output>;

    /// Called once when the loop is cancelled; restores the visible state.
    async fn cancelled(&mut self) -> Self::Output;
}

/// Run `step` until it finishes or `cancel` fires.
pub async fn drive<S: PollStep>(mut step: S, cancel: CancellationToken) -> S::Output {
    loop {
        if cancel.is_cancelled() {
            return step.cancelled().await;
        }
        if let Step::Done(output) = step.tick().await {
            return output;
        }
        let interval = step.interval();
        tokio::select! {
            _ = cancel.cancelled() => return step.cancelled().await,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Edit a message, ignoring failures. Loop progress never depends on the edit.
pub(crate) async fn edit_quietly(message: &dyn ChatMessage, content: &str) {
    if let Err(e) = message.edit(content).await {
        tracing::debug!(error = %e, "Message edit failed");
    }
}
