use std::time::Duration;

// ---

use super::SimWorld;

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Configuration for the simulated game server.
///
/// Defaults to a well-behaved server: every connect spawns after a short
/// delay and nothing kicks the bot.
#[derive(Debug, Clone)]
pub struct SimConfig {
    // ---
    /// Spawn automatically after `spawn_delay`. When `false`, tests drive
    /// the lifecycle through [`crate::SimSession::spawn`] and friends.
    pub auto_spawn: bool,

    /// Delay between `connect` and `Login`/`Spawned`.
    pub spawn_delay: Duration,

    /// The first `fail_attempts` connects fail with `failure_message`
    /// instead of spawning.
    pub fail_attempts: u32,

    pub failure_message: String,

    /// If `Some`, a live session is kicked after this long.
    pub kick_after: Option<Duration>,

    /// Length of one game tick.
    pub tick: Duration,

    /// Reported protocol version.
    pub version: String,

    /// World every new session starts from.
    pub world: SimWorld,
}

// ---

impl Default for SimConfig {
    fn default() -> Self {
        // ---
        Self {
            auto_spawn: true,
            spawn_delay: Duration::from_millis(200),
            fail_attempts: 0,
            failure_message: "connect ECONNREFUSED 127.0.0.1:25565".into(),
            kick_after: None,
            tick: Duration::from_millis(50),
            version: "1.20.4".into(),
            world: SimWorld::flat(),
        }
    }
}

// ---

impl SimConfig {
    // ---
    /// Nothing happens unless the test says so.
    pub fn manual() -> Self {
        // ---
        Self {
            auto_spawn: false,
            ..Default::default()
        }
    }

    // ---

    /// Server that refuses the first connect and kicks every 90 seconds.
    /// Useful for watching the reconnection path from the dashboard.
    pub fn flaky() -> Self {
        // ---
        Self {
            fail_attempts: 1,
            kick_after: Some(Duration::from_secs(90)),
            ..Default::default()
        }
    }
}
