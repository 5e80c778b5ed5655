use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::mpsc;

use afkbot_domain::{ConnectOptions, Connection, DisconnectReason, GameClient, Result};

use super::config::SimConfig;
use super::session::SimSession;

// ---------------------------------------------------------------------------
// SimClient
// ---------------------------------------------------------------------------

/// In-process mock game client. Does not open sockets.
///
/// Every session handed out by [`GameClient::connect`] is retained so tests
/// can reach the one the agent is currently driving via
/// [`SimClient::last_session`].
pub struct SimClient {
    // ---
    config: SimConfig,
    sessions: Mutex<Vec<Arc<SimSession>>>,
}

// ---

impl SimClient {
    // ---
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(Vec::new()),
        }
    }

    // ---

    /// Number of `connect` calls so far.
    pub fn connect_count(&self) -> usize {
        self.sessions().len()
    }

    pub fn last_session(&self) -> Option<Arc<SimSession>> {
        self.sessions().last().cloned()
    }

    pub fn sessions(&self) -> Vec<Arc<SimSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // ---

    /// Run the scripted lifecycle for one session: fail, or spawn and
    /// optionally kick later.
    fn script(&self, session: Arc<SimSession>, attempt: usize) {
        // ---
        let cfg = self.config.clone();
        tokio::spawn(async move {
            tokio::time::sleep(cfg.spawn_delay).await;

            if (attempt as u32) < cfg.fail_attempts {
                tracing::debug!(attempt, "sim: failing connect attempt");
                session.fail(&cfg.failure_message);
                return;
            }

            session.spawn();

            if let Some(after) = cfg.kick_after {
                tokio::time::sleep(after).await;
                // Restart notices arrive as chat components, not plain text.
                session.kick(DisconnectReason::from_value(json!({"text": "Simulated server restart"})));
            }
        });
    }
}

// ---

impl GameClient for SimClient {
    // ---
    fn connect(&self, opts: ConnectOptions) -> Result<Connection> {
        // ---
        let (events_tx, events) = mpsc::unbounded_channel();
        let session = Arc::new(SimSession::new(
            opts.username.clone(),
            opts.version.clone().unwrap_or_else(|| self.config.version.clone()),
            self.config.tick,
            self.config.world.clone(),
            events_tx,
        ));

        let attempt = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.push(Arc::clone(&session));
            sessions.len() - 1
        };

        tracing::debug!(address = %opts.address(), username = %opts.username, "sim: connect");

        if self.config.auto_spawn {
            self.script(Arc::clone(&session), attempt);
        }

        Ok(Connection { session, events })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
