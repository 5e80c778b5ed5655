//! [`SessionHandle`] — the controller's grip on one game session.
//!
//! Owns the [`GameSessionPtr`] and an event pump task that tags every
//! lifecycle [`GameEvent`] with this session's id and forwards it to the
//! controller queue. Chat and server messages are logged here and not
//! forwarded.

use tokio::sync::mpsc;
use uuid::Uuid;

// ---

use afkbot_domain::{ChatPosition, Connection, GameEvent, GameSessionPtr, SessionEvent};

// ---

use super::{ControlMsg, TaskSlot};

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

pub struct SessionHandle {
    // ---
    id: Uuid,
    username: String,
    session: GameSessionPtr,
    pump: TaskSlot,
}

// ---

impl SessionHandle {
    // ---
    /// Wrap a fresh connection and start forwarding its events to `tx`.
    pub fn spawn(conn: Connection, username: String, tx: mpsc::Sender<ControlMsg>) -> Self {
        // ---
        let id = Uuid::new_v4();
        let mut pump = TaskSlot::new();
        pump.replace(tokio::spawn(pump_events(id, username.clone(), conn.events, tx)));

        tracing::debug!(session_id = %id, %username, "session handle created");

        Self {
            id,
            username,
            session: conn.session,
            pump,
        }
    }

    // ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn session(&self) -> &GameSessionPtr {
        &self.session
    }

    // ---

    /// Drop the connection abruptly.
    pub fn quit(&self, reason: &str) {
        self.session.quit(reason);
    }

    /// Close the connection gracefully. The resulting `Ended` still flows
    /// through the pump.
    pub fn force_end(&self, reason: &str) {
        self.session.force_end(reason);
    }

    /// Stop forwarding events and let go of the session. Nothing this
    /// session emits afterwards reaches the controller.
    pub fn discard(mut self) {
        // ---
        self.pump.cancel();
        tracing::debug!(session_id = %self.id, "session handle discarded");
    }
}

// ---------------------------------------------------------------------------
// Event pump
// ---------------------------------------------------------------------------

async fn pump_events(
    id: Uuid,
    own_name: String,
    mut events: mpsc::UnboundedReceiver<GameEvent>,
    tx: mpsc::Sender<ControlMsg>,
) {
    // ---
    while let Some(event) = events.recv().await {
        // ---
        match &event {
            GameEvent::Chat { sender, text } => {
                if *sender != own_name {
                    tracing::info!("<{sender}> {text}");
                }
                continue;
            }

            GameEvent::ServerMessage { text, position } => {
                if *position != ChatPosition::ActionBar {
                    tracing::info!("[server] {text}");
                }
                continue;
            }

            _ => {}
        }

        let last = matches!(event, GameEvent::Ended { .. });
        let msg = ControlMsg::Session(SessionEvent {
            session_id: id,
            event,
        });
        if tx.send(msg).await.is_err() || last {
            break;
        }
    }
    tracing::debug!(session_id = %id, "event pump finished");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
