//! Cosmetic "loading" dots on a placeholder message

use super::{drive, edit_quietly, ChatMessage, PollStep, Step};
use crate::state::ProcessState;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const PLACEHOLDER_INTERVAL: Duration = Duration::from_millis(800);

const MAX_DOTS: usize = 3;

/// Appends 1, 2, 3, 1, ... dots to `text` while the placeholder is still
/// matched in the process state, then restores the plain text once.
pub struct PlaceholderAnimation {
    state: Arc<ProcessState>,
    message: Arc<dyn ChatMessage>,
    placeholder_id: String,
    text: String,
    dots: usize,
}

impl PlaceholderAnimation {
    pub fn new(
        state: Arc<ProcessState>,
        message: Arc<dyn ChatMessage>,
        placeholder_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            state,
            message,
            placeholder_id: placeholder_id.into(),
            text: text.into(),
            dots: 0,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        drive(self, cancel).await
    }
}

#[async_trait]
impl PollStep for PlaceholderAnimation {
    type Output = ();

    fn interval(&self) -> Duration {
        PLACEHOLDER_INTERVAL
    }

    async fn tick(&mut self) -> Step<()> {
        if self
            .state
            .placeholder_message(&self.placeholder_id)
            .await
            .is_none()
        {
            edit_quietly(self.message.as_ref(), &self.text).await;
            return Step::Done(());
        }

        self.dots = self.dots % MAX_DOTS + 1;
        let frame = format!("{}{}", self.text, ".".repeat(self.dots));
        edit_quietly(self.message.as_ref(), &frame).await;
        Step::Continue
    }

    async fn cancelled(&mut self) {
        edit_quietly(self.message.as_ref(), &self.text).await;
    }
}

/// Run the animation in the background. Cancel through `cancel` or by
/// removing the placeholder from the process state.
pub fn spawn_placeholder_animation(
    state: Arc<ProcessState>,
    message: Arc<dyn ChatMessage>,
    placeholder_id: impl Into<String>,
    text: impl Into<String>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let animation = PlaceholderAnimation::new(state, message, placeholder_id, text);
    tokio::spawn(animation.run(cancel))
}
