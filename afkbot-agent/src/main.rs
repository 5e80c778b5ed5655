//! afkbot agent daemon.
//!
//! Keeps one bot connected to a game server: reconnects after kicks and
//! drops, rotates its username when asked to, performs idle actions so the
//! server does not time it out, and exposes an HTTP dashboard for status,
//! logs, chat, and start/stop/reconnect.
//!
//! Usage:
//!   afkbot-agent --config config.json --state bot_status.json
//!   afkbot-agent --auto-start --port 8080 --backend sim-flaky

use std::sync::Arc;

// ---

use clap::Parser;
use tracing::{error, info};

// ---

use afkbot_domain::GameClient;
use afkbot_sim::{SimClient, SimConfig};

// ---

mod actions;
mod auto_chat;
mod config;
mod controller;
mod http;
mod identity;
mod idle;
mod logs;
mod session;
mod task;

// ---

use config::{Backend, BotConfig, Cli, LOG_RING_CAPACITY};
use http::AppState;
use identity::IdentityStore;
use logs::LogRing;

// Gateway re-exports — siblings import via super::Symbol
pub use auto_chat::AutoChat;
pub use controller::{
    // ---
    Command,
    CommandReply,
    ControlMsg,
    Controller,
    ControllerHandle,
    SessionState,
    StatusReport,
};
pub use idle::IdleScheduler;
pub use session::SessionHandle;
pub use task::TaskSlot;

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ---
    let cli = Cli::parse();

    let ring = LogRing::new(LOG_RING_CAPACITY);
    logs::init(&cli.log_level, ring.clone());

    std::panic::set_hook(Box::new(|panic| {
        error!("panic: {panic}");
    }));

    info!(version = env!("CARGO_PKG_VERSION"), "afkbot-agent starting");

    let cfg = match BotConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    info!(
        server = %format!("{}:{}", cfg.server.host, cfg.server.port),
        auth = %cfg.bot.auth,
        "configuration loaded",
    );

    let identity = IdentityStore::load(&cli.state, &cfg.bot.base_username);

    let sim_cfg = match cli.backend {
        Backend::Sim => SimConfig::default(),
        Backend::SimFlaky => SimConfig::flaky(),
    };
    let client: Arc<dyn GameClient> = Arc::new(SimClient::new(sim_cfg));

    // Nothing else could ever start the bot without a dashboard.
    let dashboard = cfg.features.web_dashboard.clone();
    let auto_start = cli.auto_start || cfg.features.auto_start || !dashboard.enabled;

    let controller = Controller::new(client, cfg, identity);
    let handle = controller.handle();
    tokio::spawn(controller.run());

    if dashboard.enabled {
        let port = cli.port.unwrap_or(dashboard.port);
        let state = AppState {
            controller: handle.clone(),
            logs: ring,
        };
        let router = http::create_router(state, &cli.public_dir);
        tokio::spawn(async move {
            if let Err(e) = http::serve(router, port).await {
                error!("dashboard server error: {e}");
            }
        });
    }

    if auto_start {
        let reply = handle.command(Command::Start).await;
        info!("{}", reply.message);
    } else {
        info!("waiting for a start command from the dashboard");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.command(Command::Stop).await;

    Ok(())
}
