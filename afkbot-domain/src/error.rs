use std::fmt;

use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum BotError {
    // ---
    #[error("session closed")]
    SessionClosed,

    #[error("bot is not online")]
    NotOnline,

    #[error("no eligible target: {0}")]
    NoTarget(String),

    #[error("capability error: {0}")]
    Capability(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---

pub type Result<T> = std::result::Result<T, BotError>;

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// An error reported by the game client through [`crate::GameEvent::Error`].
///
/// The client only hands over a message; [`ClientError::class`] derives a
/// coarse category from it for operator diagnostics. The category never
/// changes the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    // ---
    pub message: String,
}

// ---

impl ClientError {
    // ---
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    // ---

    pub fn class(&self) -> ErrorClass {
        // ---
        const AUTH: &[&str] = &["AuthError", "Login refused"];
        const NETWORK: &[&str] = &["Failed to connect", "ETIMEDOUT", "ECONNREFUSED", "ENOTFOUND"];

        if AUTH.iter().any(|m| self.message.contains(m)) {
            ErrorClass::Auth
        } else if NETWORK.iter().any(|m| self.message.contains(m)) {
            ErrorClass::Network
        } else {
            ErrorClass::Unknown
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// ErrorClass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    // ---
    /// Credentials or auth mode rejected by the server.
    Auth,

    /// Server unreachable: refused, timed out, or name resolution failed.
    Network,

    Unknown,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn classifies_client_errors() {
        // ---
        assert_eq!(ClientError::new("AuthError: bad token").class(), ErrorClass::Auth);
        assert_eq!(ClientError::new("Login refused").class(), ErrorClass::Auth);
        assert_eq!(
            ClientError::new("connect ECONNREFUSED 127.0.0.1:25565").class(),
            ErrorClass::Network
        );
        assert_eq!(
            ClientError::new("getaddrinfo ENOTFOUND mc.example").class(),
            ErrorClass::Network
        );
        assert_eq!(ClientError::new("something odd").class(), ErrorClass::Unknown);
    }
}
