//! [`AutoChat`] — periodic chat from a configured message list.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

// ---

use afkbot_domain::GameSessionPtr;

// ---

use super::config::AutoChatConfig;
use super::TaskSlot;

// ---------------------------------------------------------------------------
// AutoChat
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AutoChat {
    task: TaskSlot,
}

impl AutoChat {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Start sending for `session`, replacing any previous loop. Does
    /// nothing but warn when the message list is empty.
    pub fn start(&mut self, session: GameSessionPtr, cfg: &AutoChatConfig) {
        // ---
        self.task.cancel();
        if cfg.messages.is_empty() {
            tracing::warn!("auto-chat is enabled but has no messages");
            return;
        }

        let period = cfg.interval();
        let messages = cfg.messages.clone();
        tracing::info!(interval_ms = cfg.interval, messages = messages.len(), "auto-chat started");

        self.task.replace(tokio::spawn(async move {
            // ---
            let mut rng = StdRng::from_entropy();
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !session.is_online() {
                    continue;
                }
                let Some(text) = messages.choose(&mut rng) else {
                    continue;
                };
                match session.chat(text) {
                    Ok(()) => tracing::info!("auto-chat: {text}"),
                    Err(e) => tracing::error!("auto-chat failed: {e}"),
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if self.task.cancel() {
            tracing::debug!("auto-chat stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_active()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
