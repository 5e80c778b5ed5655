//! Core traits and types for the afkbot game-session agent.
//!
//! This crate defines the vocabulary of the system. The agent and the
//! simulator both depend on `afkbot-domain` and speak its types. No I/O
//! lives here.
//!
//! # Structure
//!
//! - [`error`]     — [`BotError`], [`Result<T>`], [`ClientError`] classification
//! - [`identity`]  — [`IdentityRecord`], [`DisconnectRecord`], [`DisconnectReason`]
//! - [`transport`] — [`GameClient`], [`GameSession`] capability traits
//! - [`session`]   — [`GameEvent`] lifecycle vocabulary
//! - [`world`]     — positions, blocks, items, entities
//! - [`action`]    — [`IdleAction`] catalog

mod action;
mod error;
mod identity;
mod session;
mod transport;
mod world;

// --- error
pub use error::{BotError, ClientError, ErrorClass, Result};

// --- identity
pub use identity::{DisconnectReason, DisconnectRecord, IdentityRecord};

// --- transport
pub use transport::{
    // ---
    AuthMode,
    ConnectOptions,
    Connection,
    GameClient,
    GameSession,
    GameSessionPtr,
};

// --- session
pub use session::{ChatPosition, GameEvent, SessionEvent};

// --- world
pub use world::{Block, BlockPos, ControlKey, Entity, EntityKind, Item, Vec3};

// --- action
pub use action::{ActionOutcome, IdleAction};
