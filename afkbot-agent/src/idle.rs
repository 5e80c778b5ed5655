//! [`IdleScheduler`] — fires one random idle action per randomized interval
//! while the session is live.

use std::time::Duration;

// ---

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

// ---

use afkbot_domain::{ActionOutcome, GameSessionPtr, IdleAction};

// ---

use super::config::AntiAfkConfig;
use super::{actions, TaskSlot};

// ---------------------------------------------------------------------------
// IdleScheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct IdleScheduler {
    // ---
    task: TaskSlot,
}

// ---

impl IdleScheduler {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the loop for `session`, replacing any previous one.
    pub fn start(&mut self, session: GameSessionPtr, cfg: &AntiAfkConfig) {
        // ---
        let min = cfg.min_interval();
        let max = cfg.max_interval().max(min);
        let actions = cfg.enabled_actions();

        tracing::info!(
            min_ms = min.as_millis() as u64,
            max_ms = max.as_millis() as u64,
            actions = actions.len(),
            "anti-AFK started",
        );
        self.task.replace(tokio::spawn(run(session, min, max, actions)));
    }

    /// Abort the loop. An action in progress is dropped at its next await.
    pub fn stop(&mut self) {
        if self.task.cancel() {
            tracing::debug!("anti-AFK stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_active()
    }
}

// ---

async fn run(session: GameSessionPtr, min: Duration, max: Duration, actions: Vec<IdleAction>) {
    // ---
    let mut rng = StdRng::from_entropy();

    loop {
        let wait = rng.gen_range(min..=max);
        tokio::time::sleep(wait).await;

        if !session.is_online() {
            tracing::debug!("anti-AFK tick skipped, session not online");
            continue;
        }

        let Some(&action) = actions.choose(&mut rng) else {
            tracing::warn!("anti-AFK is enabled but no actions are switched on");
            continue;
        };

        match actions::perform(action, session.as_ref(), &mut rng).await {
            Ok(ActionOutcome::Performed) => tracing::debug!(%action, "idle action done"),
            Ok(ActionOutcome::Skipped(why)) => tracing::warn!(%action, "idle action skipped: {why}"),
            Err(e) => tracing::error!(%action, "idle action failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
