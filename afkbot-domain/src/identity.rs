use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DisconnectReason
// ---------------------------------------------------------------------------

/// Why the server kicked the bot.
///
/// Servers send either a plain string or a structured chat component. The
/// structured form is preserved for programmatic consumers and only turned
/// into a string by [`fmt::Display`] at the logging / persistence boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectReason {
    // ---
    Text(String),
    Structured(serde_json::Value),
}

// ---

impl DisconnectReason {
    // ---
    /// Normalise an arbitrary JSON payload. A bare JSON string becomes
    /// [`DisconnectReason::Text`].
    pub fn from_value(value: serde_json::Value) -> Self {
        // ---
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for DisconnectReason {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// DisconnectRecord
// ---------------------------------------------------------------------------

/// The last kick the bot received. Immutable once created; the next kick
/// replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectRecord {
    // ---
    /// RFC 3339, UTC.
    pub timestamp: String,

    #[serde(rename = "server", alias = "serverAddress")]
    pub server_address: String,

    pub username: String,

    /// Always a string: structured reasons are serialised before storage.
    pub reason: String,
}

// ---

impl DisconnectRecord {
    // ---
    /// Stamp a new record with the current time.
    pub fn now(server_address: &str, username: &str, reason: &DisconnectReason) -> Self {
        // ---
        Self {
            timestamp: Utc::now().to_rfc3339(),
            server_address: server_address.to_string(),
            username: username.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// IdentityRecord
// ---------------------------------------------------------------------------

/// Persisted identity: the username to connect with and the last kick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    // ---
    pub username: String,

    #[serde(rename = "lastKick", alias = "lastDisconnect", default)]
    pub last_disconnect: Option<DisconnectRecord>,
}

// ---

impl IdentityRecord {
    // ---
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            last_disconnect: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
