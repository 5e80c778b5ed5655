use uuid::Uuid;

use super::error::ClientError;
use super::identity::DisconnectReason;

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// Lifecycle and chat notifications emitted by a [`crate::GameSession`],
/// in the order the client observes them.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    // ---
    /// Credentials accepted; the world is not loaded yet.
    Login,

    /// The bot is in the world. The session is live from here on.
    Spawned,

    /// Server-initiated disconnect. Usually followed by `Ended`.
    Kicked {
        reason: DisconnectReason,
        /// Whether the kick happened after a successful login.
        logged_in: bool,
    },

    /// The connection is gone, for any reason. Always the last event.
    Ended { reason: String },

    /// Transport or auth failure. Usually followed by `Ended`.
    Error(ClientError),

    /// Player chat.
    Chat { sender: String, text: String },

    /// Rendered server message.
    ServerMessage { text: String, position: ChatPosition },
}

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPosition {
    // ---
    Chat,
    System,
    ActionBar,
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// A [`GameEvent`] tagged with the id of the session that produced it, so a
/// consumer can discard events from sessions it has already let go of.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    // ---
    pub session_id: Uuid,
    pub event: GameEvent,
}
