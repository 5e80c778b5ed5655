use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::Result;
use super::session::GameEvent;
use super::world::{Block, BlockPos, ControlKey, Entity, Item, Vec3};

// ---------------------------------------------------------------------------
// AuthMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    // ---
    /// No account verification ("cracked" servers).
    #[default]
    Offline,
    Microsoft,
    Mojang,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "offline",
            Self::Microsoft => "microsoft",
            Self::Mojang => "mojang",
        })
    }
}

// ---------------------------------------------------------------------------
// ConnectOptions
// ---------------------------------------------------------------------------

/// Everything the client needs for one connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    // ---
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub auth: AuthMode,

    /// Protocol version to speak. `None` lets the client auto-detect.
    pub version: Option<String>,
}

// ---

impl ConnectOptions {
    // ---
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Heap-allocated, shareable [`GameSession`].
pub type GameSessionPtr = Arc<dyn GameSession>;

/// Result of [`GameClient::connect`]: the session object plus its event
/// stream. The session exists immediately but is not live until the stream
/// yields [`GameEvent::Spawned`]. Connection failures arrive on the stream as
/// [`GameEvent::Error`] followed by [`GameEvent::Ended`].
pub struct Connection {
    // ---
    pub session: GameSessionPtr,
    pub events: mpsc::UnboundedReceiver<GameEvent>,
}

// ---------------------------------------------------------------------------
// GameClient
// ---------------------------------------------------------------------------

/// Factory for game sessions.
///
/// Implementations: `afkbot_sim::SimClient`.
pub trait GameClient: Send + Sync {
    // ---
    /// Begin connecting. Returns without waiting for the handshake.
    ///
    /// An `Err` here means the attempt could not even be started (bad
    /// options, resource exhaustion); the caller treats it like an error
    /// event.
    fn connect(&self, opts: ConnectOptions) -> Result<Connection>;
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// One connection to the game server and the world-query surface idle
/// actions drive.
///
/// Methods returning `Result` fail with [`crate::BotError::SessionClosed`]
/// once the session has ended.
#[async_trait]
pub trait GameSession: Send + Sync {
    // ---
    // --- status ------------------------------------------------------------
    fn username(&self) -> String;

    /// Negotiated protocol version, once known.
    fn version(&self) -> Option<String>;

    /// `true` between `Spawned` and `Ended`.
    fn is_online(&self) -> bool;

    fn health(&self) -> f32;

    fn food(&self) -> u32;

    fn position(&self) -> Option<Vec3>;

    /// Players currently listed on the server, including the bot.
    fn player_count(&self) -> usize;

    // --- control -----------------------------------------------------------
    fn chat(&self, text: &str) -> Result<()>;

    /// Close the connection gracefully. Emits `Ended(reason)`.
    fn force_end(&self, reason: &str);

    /// Disconnect immediately. Emits `Ended(reason)`.
    fn quit(&self, reason: &str);

    // --- movement ----------------------------------------------------------
    fn set_control(&self, key: ControlKey, on: bool);

    fn control_state(&self, key: ControlKey) -> bool;

    fn swing_arm(&self);

    /// Turn the head to absolute yaw / pitch, in radians.
    async fn look(&self, yaw: f64, pitch: f64) -> Result<()>;

    async fn look_at(&self, target: Vec3) -> Result<()>;

    /// Sleep for `ticks` game ticks (20 per second).
    async fn wait_ticks(&self, ticks: u32) -> Result<()>;

    // --- world -------------------------------------------------------------
    /// Nearest block within `max_distance` satisfying `matching`.
    fn find_block(&self, max_distance: f64, matching: &dyn Fn(&Block) -> bool) -> Option<Block>;

    fn block_at(&self, pos: BlockPos) -> Option<Block>;

    fn can_dig(&self, block: &Block) -> bool;

    async fn dig(&self, block: &Block) -> Result<()>;

    /// Place the held item against `reference` on the face pointed to by
    /// `face` (a unit offset, e.g. `(0, 1, 0)` for the top face).
    async fn place_block(&self, reference: &Block, face: BlockPos) -> Result<()>;

    fn nearest_entity(&self) -> Option<Entity>;

    async fn open_container(&self, block: &Block) -> Result<()>;

    async fn close_container(&self) -> Result<()>;

    // --- inventory ---------------------------------------------------------
    fn inventory(&self) -> Vec<Item>;

    /// Move `item` into the main hand.
    async fn equip(&self, item: &Item) -> Result<()>;

    /// Eat or drink the held item.
    async fn consume(&self) -> Result<()>;

    async fn drop_item(&self, item: &Item, count: u32) -> Result<()>;

    /// Selected hotbar slot, `0..9`.
    fn selected_slot(&self) -> u8;

    fn set_selected_slot(&self, slot: u8);
}
