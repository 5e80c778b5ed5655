//! Configuration for `afkbot-agent`.
//!
//! Two layers:
//!
//! - [`Cli`] — process-level flags (file locations, dashboard port override,
//!   log level), parsed with `clap`.
//! - [`BotConfig`] — the JSON document describing the server, the account,
//!   and every feature toggle.
//!
//! Run:
//!   afkbot-agent --config config.json --state bot_status.json [--auto-start]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

// ---

use afkbot_domain::{AuthMode, ConnectOptions, IdleAction};

// ---

/// Value shipped in the sample config; connecting to it is never intended.
const PLACEHOLDER_HOST: &str = "your_server_ip_or_hostname";

/// Capacity of the in-memory log ring served on `GET /logs`.
pub const LOG_RING_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// Cli
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "afkbot-agent", about = "Keeps a bot connected to a game server")]
pub struct Cli {
    // ---
    /// JSON configuration file.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Identity file (current username and last kick).
    /// Created automatically if it does not exist.
    #[arg(long, default_value = "bot_status.json")]
    pub state: PathBuf,

    /// Directory of static dashboard assets served after the API routes.
    #[arg(long, default_value = "public")]
    pub public_dir: PathBuf,

    /// Dashboard port. Overrides `features.webDashboard.port`.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Start the bot immediately instead of waiting for a `start` command.
    #[arg(long)]
    pub auto_start: bool,

    /// Game client backend.
    #[arg(long, value_enum, default_value_t = Backend::Sim)]
    pub backend: Backend,
}

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    // ---
    /// Built-in simulated server that behaves.
    Sim,

    /// Built-in simulated server that refuses the first connect and kicks
    /// periodically.
    SimFlaky,
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    // ---
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// BotConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    // ---
    pub server: ServerConfig,

    #[serde(default)]
    pub bot: AccountConfig,

    #[serde(default)]
    pub features: Features,
}

// ---

impl BotConfig {
    // ---
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // ---
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    // ---

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        // ---
        let cfg: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    // ---

    pub fn validate(&self) -> Result<(), ConfigError> {
        // ---
        let host = self.server.host.trim();
        if host.is_empty() {
            return Err(ConfigError::Invalid("server.host is empty".into()));
        }
        if host == PLACEHOLDER_HOST {
            return Err(ConfigError::Invalid(format!(
                "server.host is still \"{PLACEHOLDER_HOST}\"; set it to the real server address"
            )));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.bot.base_username.trim().is_empty() {
            return Err(ConfigError::Invalid("bot.baseUsername is empty".into()));
        }

        let afk = &self.features.anti_afk;
        if afk.min_interval > afk.max_interval {
            return Err(ConfigError::Invalid(format!(
                "antiAfk.minInterval ({}) exceeds maxInterval ({})",
                afk.min_interval, afk.max_interval
            )));
        }
        if afk.max_interval == 0 {
            return Err(ConfigError::Invalid("antiAfk.maxInterval must be non-zero".into()));
        }
        if self.features.auto_chat.interval == 0 {
            return Err(ConfigError::Invalid("autoChat.interval must be non-zero".into()));
        }
        Ok(())
    }

    // ---

    /// Connect options for a session using `username`.
    pub fn connect_options(&self, username: &str) -> ConnectOptions {
        // ---
        ConnectOptions {
            host: self.server.host.clone(),
            port: self.server.port,
            username: username.to_string(),
            password: self.bot.password.clone(),
            auth: self.bot.auth,
            version: self.server.version.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    // ---
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    /// `false` (or absent) auto-detects; a string pins the version.
    #[serde(default, deserialize_with = "version_or_auto")]
    pub version: Option<String>,
}

// ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountConfig {
    // ---
    pub base_username: String,
    pub auth: AuthMode,
    pub password: Option<String>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            base_username: "AFKBot".into(),
            auth: AuthMode::Offline,
            password: None,
        }
    }
}

// ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Features {
    // ---
    pub anti_afk: AntiAfkConfig,
    pub auto_chat: AutoChatConfig,
    pub random_username_on_kick: RotationConfig,
    pub auto_reconnect: ReconnectConfig,
    pub web_dashboard: DashboardConfig,

    /// Start the bot at launch.
    pub auto_start: bool,
}

// ---

/// Idle action scheduler settings. Intervals are milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AntiAfkConfig {
    // ---
    pub enabled: bool,
    pub min_interval: u64,
    pub max_interval: u64,
    pub actions: BTreeMap<IdleAction, bool>,
}

impl Default for AntiAfkConfig {
    fn default() -> Self {
        // ---
        let on = [
            IdleAction::Jump,
            IdleAction::Sneak,
            IdleAction::LookAround,
            IdleAction::SwingArm,
        ];
        Self {
            enabled: true,
            min_interval: 30_000,
            max_interval: 60_000,
            actions: IdleAction::ALL.iter().map(|a| (*a, on.contains(a))).collect(),
        }
    }
}

impl AntiAfkConfig {
    // ---
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval)
    }

    /// Actions switched on, in catalog order.
    pub fn enabled_actions(&self) -> Vec<IdleAction> {
        self.actions
            .iter()
            .filter_map(|(action, on)| on.then_some(*action))
            .collect()
    }
}

// ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoChatConfig {
    // ---
    pub enabled: bool,

    /// Milliseconds between messages.
    pub interval: u64,
    pub messages: Vec<String>,
}

impl Default for AutoChatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 300_000,
            messages: Vec::new(),
        }
    }
}

impl AutoChatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

// ---

/// Identity rotation on kick.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RotationConfig {
    // ---
    pub enabled: bool,

    /// Length of the random suffix.
    pub length: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            length: 4,
        }
    }
}

// ---

/// Fixed reconnect delays, milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectConfig {
    // ---
    /// After a disconnect or error.
    pub delay: u64,

    /// After a kick.
    pub kick_delay: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: 10_000,
            kick_delay: 5_000,
        }
    }
}

impl ReconnectConfig {
    // ---
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn kick_delay(&self) -> Duration {
        Duration::from_millis(self.kick_delay)
    }
}

// ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    // ---
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 3000,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn default_server_port() -> u16 {
    25565
}

// ---

fn version_or_auto<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Version(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Version(v)) if !v.trim().is_empty() => Some(v),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
