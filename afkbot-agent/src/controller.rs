//! [`Controller`] — owns the game session and drives the reconnection state
//! machine.
//!
//! # Message queue
//!
//! Every input reaches the controller as a [`ControlMsg`] on one channel:
//! operator commands (with a oneshot reply), status queries, session events
//! forwarded by the [`SessionHandle`] pump, and reconnect timer expiries.
//! Messages are handled one at a time to completion, so no state is ever
//! shared or locked.
//!
//! # States
//!
//! ```text
//!   Idle ──start──▶ Connecting ──spawned──▶ Live
//!    ▲                  │                    │
//!    │           kicked/ended/error    kicked/ended/error
//!    │                  ▼                    ▼
//!    └──timer fires── Idle (reconnect pending) ◀──ended── Terminating
//!                                                 (reconnect command)
//! ```
//!
//! `stop` leads to `Idle` from anywhere and sets the manual-stop flag, which
//! suppresses reconnects until the next `start`.
//!
//! # Staleness
//!
//! Scheduling a reconnect discards the old session synchronously. Events
//! carry their session id and timer expiries carry their timer id; anything
//! that does not match the current session or pending timer is dropped.

use std::sync::Arc;
use std::time::Duration;

// ---

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

// ---

use afkbot_domain::{
    // ---
    ClientError,
    DisconnectReason,
    DisconnectRecord,
    ErrorClass,
    GameClient,
    GameEvent,
    SessionEvent,
    Vec3,
};

// ---

use super::config::BotConfig;
use super::identity::IdentityStore;
use super::{AutoChat, IdleScheduler, SessionHandle, TaskSlot};

// ---

const CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // ---
    Start,
    Stop,
    Reconnect,
}

impl Command {
    // ---
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "reconnect" => Some(Self::Reconnect),
            _ => None,
        }
    }
}

// ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReply {
    // ---
    pub success: bool,
    pub message: String,
}

impl CommandReply {
    // ---
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ---

pub enum ControlMsg {
    // ---
    Command {
        command: Command,
        reply: oneshot::Sender<CommandReply>,
    },

    Chat {
        text: String,
        reply: oneshot::Sender<CommandReply>,
    },

    Status {
        reply: oneshot::Sender<StatusReport>,
    },

    /// Forwarded by a session's event pump.
    Session(SessionEvent),

    /// The reconnect timer `timer_id` elapsed.
    ReconnectDue { timer_id: u64 },
}

// ---------------------------------------------------------------------------
// SessionState / StatusReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    // ---
    /// No session. A reconnect may be pending.
    Idle,

    /// Session created, not yet spawned.
    Connecting,

    /// Spawned in the world.
    Live,

    /// Reconnect command issued; waiting for the session to end.
    Terminating,
}

// ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    // ---
    pub online: bool,
    pub username: String,
    pub health: f32,
    pub food: u32,
    pub position: Vec3,
    pub players: usize,

    #[serde(rename = "uptime_ms")]
    pub uptime_ms: u64,

    pub last_kick: Option<DisconnectRecord>,
    pub status_message: String,
    pub state: SessionState,
    pub reconnect_attempts: u32,
    pub version: Option<String>,
}

impl StatusReport {
    // ---
    /// Report for when the controller itself is gone.
    pub fn unavailable() -> Self {
        Self {
            online: false,
            username: String::new(),
            health: 0.0,
            food: 0,
            position: Vec3::new(0.0, 0.0, 0.0),
            players: 0,
            uptime_ms: 0,
            last_kick: None,
            status_message: "Not started".into(),
            state: SessionState::Idle,
            reconnect_attempts: 0,
            version: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PendingReconnect
// ---------------------------------------------------------------------------

struct PendingReconnect {
    // ---
    timer_id: u64,
    delay: Duration,
    task: TaskSlot,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller {
    // ---
    client: Arc<dyn GameClient>,
    cfg: BotConfig,
    identity: IdentityStore,

    tx: mpsc::Sender<ControlMsg>,
    rx: mpsc::Receiver<ControlMsg>,

    session: Option<SessionHandle>,
    state: SessionState,
    live_since: Option<Instant>,

    manual_stop: bool,
    attempts: u32,
    reconnect: Option<PendingReconnect>,
    next_timer_id: u64,

    idle: IdleScheduler,
    auto_chat: AutoChat,
}

// ---

impl Controller {
    // ---
    pub fn new(client: Arc<dyn GameClient>, cfg: BotConfig, identity: IdentityStore) -> Self {
        // ---
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            client,
            cfg,
            identity,
            tx,
            rx,
            session: None,
            state: SessionState::Idle,
            live_since: None,
            manual_stop: false,
            attempts: 0,
            reconnect: None,
            next_timer_id: 0,
            idle: IdleScheduler::new(),
            auto_chat: AutoChat::new(),
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            tx: self.tx.clone(),
        }
    }

    // ---

    /// Process messages until every handle is gone. The controller holds a
    /// sender of its own for timers and pumps, so in practice this runs
    /// until the runtime shuts down.
    pub async fn run(mut self) {
        // ---
        while let Some(msg) = self.rx.recv().await {
            self.dispatch(msg);
        }
        tracing::info!("controller loop exiting");
    }

    // ---

    fn dispatch(&mut self, msg: ControlMsg) {
        // ---
        match msg {
            ControlMsg::Command { command, reply } => {
                let result = match command {
                    Command::Start => self.start(),
                    Command::Stop => self.stop(),
                    Command::Reconnect => self.reconnect(),
                };
                let _ = reply.send(result);
            }

            ControlMsg::Chat { text, reply } => {
                let _ = reply.send(self.chat(&text));
            }

            ControlMsg::Status { reply } => {
                let _ = reply.send(self.status());
            }

            ControlMsg::Session(ev) => self.on_session_event(ev),

            ControlMsg::ReconnectDue { timer_id } => self.on_reconnect_due(timer_id),
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn start(&mut self) -> CommandReply {
        // ---
        if self.session.is_some() {
            return match self.state {
                SessionState::Live => CommandReply::fail("Bot is already online."),
                _ => CommandReply::fail("Bot is already connecting."),
            };
        }

        tracing::info!("start requested");
        self.manual_stop = false;
        self.cancel_reconnect();
        self.attempts = 0;
        self.create_session();
        CommandReply::ok("Starting bot...")
    }

    // ---

    fn stop(&mut self) -> CommandReply {
        // ---
        self.manual_stop = true;
        let had_timer = self.cancel_reconnect();
        self.stop_schedulers();
        self.attempts = 0;

        let had_session = match self.session.take() {
            Some(handle) => {
                handle.quit("Stopped by command");
                handle.discard();
                true
            }
            None => false,
        };
        self.enter_idle();

        if had_session || had_timer {
            tracing::info!("bot stopped by command");
            CommandReply::ok("Bot stopped.")
        } else {
            CommandReply::fail("Bot is already stopped or was never started.")
        }
    }

    // ---

    fn reconnect(&mut self) -> CommandReply {
        // ---
        let Some(handle) = &self.session else {
            return CommandReply::fail("Bot is not running or has been stopped.");
        };
        if self.state == SessionState::Terminating {
            return CommandReply::fail("Bot is already reconnecting.");
        }

        tracing::info!(session_id = %handle.id(), "reconnect requested");
        self.manual_stop = false;
        self.state = SessionState::Terminating;
        handle.force_end("Reconnecting by command");
        self.stop_schedulers();
        CommandReply::ok("Reconnecting bot...")
    }

    // ---

    fn chat(&mut self, text: &str) -> CommandReply {
        // ---
        let text = text.trim();
        if text.is_empty() {
            tracing::warn!("dashboard chat request was empty");
            return CommandReply::fail("Message must not be empty.");
        }

        let live = self
            .session
            .as_ref()
            .filter(|h| self.state == SessionState::Live && h.session().is_online());
        let Some(handle) = live else {
            tracing::warn!("cannot send \"{text}\": bot is not online");
            return CommandReply::fail("Bot is not online.");
        };

        match handle.session().chat(text) {
            Ok(()) => {
                tracing::info!("dashboard chat: \"{text}\"");
                CommandReply::ok("Message sent.")
            }
            Err(e) => {
                tracing::warn!("dashboard chat failed: {e}");
                CommandReply::fail(format!("Failed to send message: {e}"))
            }
        }
    }

    // ---

    fn status(&self) -> StatusReport {
        // ---
        let live = self
            .session
            .as_ref()
            .map(SessionHandle::session)
            .filter(|s| self.state == SessionState::Live && s.is_online());

        let username = match &self.session {
            Some(h) => h.username().to_string(),
            None => self.identity.username().to_string(),
        };

        let status_message = if live.is_some() {
            "Online"
        } else if self.session.is_some() || self.reconnect.is_some() {
            "Connecting..."
        } else {
            "Not started"
        };

        let mut report = StatusReport {
            online: live.is_some(),
            username,
            status_message: status_message.into(),
            last_kick: self.identity.last_disconnect().cloned(),
            state: self.state,
            reconnect_attempts: self.attempts,
            version: self.cfg.server.version.clone(),
            ..StatusReport::unavailable()
        };

        if let Some(s) = live {
            report.health = s.health();
            report.food = s.food();
            report.position = s.position().map(Vec3::rounded).unwrap_or(report.position);
            report.players = s.player_count();
            report.uptime_ms = self.live_since.map_or(0, |t| t.elapsed().as_millis() as u64);
            report.version = s.version().or(report.version);
        }
        report
    }

    // -----------------------------------------------------------------------
    // Session events
    // -----------------------------------------------------------------------

    fn on_session_event(&mut self, ev: SessionEvent) {
        // ---
        let current = self.session.as_ref().map(SessionHandle::id);
        if current != Some(ev.session_id) {
            tracing::debug!(session_id = %ev.session_id, "dropping event from discarded session");
            return;
        }

        match ev.event {
            GameEvent::Login => tracing::info!("logged in, waiting for spawn"),
            GameEvent::Spawned => self.on_spawned(),
            GameEvent::Kicked { reason, logged_in } => self.on_kicked(reason, logged_in),
            GameEvent::Ended { reason } => self.on_ended(&reason),
            GameEvent::Error(err) => self.on_error(&err),
            GameEvent::Chat { .. } | GameEvent::ServerMessage { .. } => {}
        }
    }

    // ---

    fn on_spawned(&mut self) {
        // ---
        if self.state != SessionState::Connecting {
            tracing::debug!(state = ?self.state, "ignoring spawn outside of connecting");
            return;
        }
        let Some(handle) = &self.session else {
            return;
        };
        let session = Arc::clone(handle.session());
        let username = handle.username().to_string();

        self.state = SessionState::Live;
        self.live_since = Some(Instant::now());
        self.attempts = 0;
        self.manual_stop = false;
        self.identity.confirm(&username);

        tracing::info!(%username, server = %self.server_address(), "bot spawned in the world");

        let features = &self.cfg.features;
        if features.anti_afk.enabled {
            self.idle.start(Arc::clone(&session), &features.anti_afk);
        }
        if features.auto_chat.enabled {
            self.auto_chat.start(session, &features.auto_chat);
        }
    }

    // ---

    fn on_kicked(&mut self, reason: DisconnectReason, logged_in: bool) {
        // ---
        let username = self
            .session
            .as_ref()
            .map(|h| h.username().to_string())
            .unwrap_or_else(|| self.identity.username().to_string());

        tracing::warn!(%username, logged_in, "kicked from server: {reason}");

        self.identity
            .record_kick(DisconnectRecord::now(&self.cfg.server.host, &username, &reason));
        self.stop_schedulers();

        let rotation = &self.cfg.features.random_username_on_kick;
        if rotation.enabled {
            let base = self.cfg.bot.base_username.clone();
            self.identity.rotate(&base, rotation.length);
        }

        self.schedule_reconnect(self.cfg.features.auto_reconnect.kick_delay());
    }

    // ---

    fn on_ended(&mut self, reason: &str) {
        // ---
        self.stop_schedulers();

        if self.manual_stop {
            tracing::info!("session ended ({reason}), manual stop in effect");
            if let Some(handle) = self.session.take() {
                handle.discard();
            }
            self.enter_idle();
            return;
        }
        if self.reconnect.is_some() {
            tracing::debug!("session ended ({reason}), reconnect already pending");
            return;
        }

        tracing::warn!("session ended: {reason}");
        self.schedule_reconnect(self.cfg.features.auto_reconnect.delay());
    }

    // ---

    fn on_error(&mut self, err: &ClientError) {
        // ---
        match err.class() {
            ErrorClass::Auth => tracing::error!("authentication failed, check account settings: {err}"),
            ErrorClass::Network => tracing::error!(server = %self.server_address(), "cannot reach server: {err}"),
            ErrorClass::Unknown => tracing::error!("client error: {err}"),
        }

        if self.manual_stop || self.reconnect.is_some() {
            return;
        }
        self.schedule_reconnect(self.cfg.features.auto_reconnect.delay());
    }

    // -----------------------------------------------------------------------
    // Reconnect timer
    // -----------------------------------------------------------------------

    /// Drop the current session and arm the single reconnect timer.
    fn schedule_reconnect(&mut self, delay: Duration) {
        // ---
        self.stop_schedulers();
        if let Some(handle) = self.session.take() {
            handle.discard();
        }
        self.enter_idle();

        if self.manual_stop {
            tracing::info!("manual stop in effect, not reconnecting");
            return;
        }

        self.cancel_reconnect();
        self.attempts += 1;

        self.next_timer_id += 1;
        let timer_id = self.next_timer_id;
        let tx = self.tx.clone();

        let mut task = TaskSlot::new();
        task.replace(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControlMsg::ReconnectDue { timer_id }).await;
        }));
        self.reconnect = Some(PendingReconnect {
            timer_id,
            delay,
            task,
        });

        tracing::info!(
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "reconnecting in {:.1}s",
            delay.as_secs_f64(),
        );
    }

    // ---

    /// Returns `true` if a timer was pending.
    fn cancel_reconnect(&mut self) -> bool {
        // ---
        match self.reconnect.take() {
            Some(mut pending) => {
                pending.task.cancel();
                tracing::debug!(timer_id = pending.timer_id, "pending reconnect cancelled");
                true
            }
            None => false,
        }
    }

    // ---

    fn on_reconnect_due(&mut self, timer_id: u64) {
        // ---
        match &self.reconnect {
            Some(pending) if pending.timer_id == timer_id => {
                tracing::debug!(timer_id, delay_ms = pending.delay.as_millis() as u64, "reconnect timer fired");
            }
            _ => {
                tracing::debug!(timer_id, "dropping stale reconnect timer");
                return;
            }
        }
        self.reconnect = None;

        if self.manual_stop {
            return;
        }
        tracing::info!(attempt = self.attempts, "reconnecting");
        self.create_session();
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    fn create_session(&mut self) {
        // ---
        if let Some(handle) = &self.session {
            tracing::warn!(session_id = %handle.id(), state = ?self.state, "session already active, not creating another");
            return;
        }

        let username = self.identity.username().to_string();
        let opts = self.cfg.connect_options(&username);
        tracing::info!(
            address = %opts.address(),
            %username,
            auth = %opts.auth,
            version = opts.version.as_deref().unwrap_or("auto"),
            "connecting",
        );

        match self.client.connect(opts) {
            Ok(conn) => {
                let handle = SessionHandle::spawn(conn, username, self.tx.clone());
                self.session = Some(handle);
                self.state = SessionState::Connecting;
            }
            Err(e) => {
                tracing::error!("could not start connection: {e}");
                self.schedule_reconnect(self.cfg.features.auto_reconnect.delay());
            }
        }
    }

    // ---

    fn stop_schedulers(&mut self) {
        self.idle.stop();
        self.auto_chat.stop();
    }

    fn enter_idle(&mut self) {
        self.state = SessionState::Idle;
        self.live_since = None;
    }

    fn server_address(&self) -> String {
        format!("{}:{}", self.cfg.server.host, self.cfg.server.port)
    }
}

// ---------------------------------------------------------------------------
// ControllerHandle
// ---------------------------------------------------------------------------

/// Cheap, cloneable front door to the [`Controller`] used by the HTTP
/// surface and `main`.
#[derive(Clone)]
pub struct ControllerHandle {
    // ---
    tx: mpsc::Sender<ControlMsg>,
}

// ---

impl ControllerHandle {
    // ---
    pub async fn command(&self, command: Command) -> CommandReply {
        // ---
        let (reply, rx) = oneshot::channel();
        if self.tx.send(ControlMsg::Command { command, reply }).await.is_err() {
            return CommandReply::fail("Controller is not running.");
        }
        rx.await
            .unwrap_or_else(|_| CommandReply::fail("Controller is not running."))
    }

    pub async fn chat(&self, text: impl Into<String>) -> CommandReply {
        // ---
        let (reply, rx) = oneshot::channel();
        let msg = ControlMsg::Chat {
            text: text.into(),
            reply,
        };
        if self.tx.send(msg).await.is_err() {
            return CommandReply::fail("Controller is not running.");
        }
        rx.await
            .unwrap_or_else(|_| CommandReply::fail("Controller is not running."))
    }

    /// Never fails: a vanished controller reports as not started.
    pub async fn status(&self) -> StatusReport {
        // ---
        let (reply, rx) = oneshot::channel();
        if self.tx.send(ControlMsg::Status { reply }).await.is_err() {
            return StatusReport::unavailable();
        }
        rx.await.unwrap_or_else(|_| StatusReport::unavailable())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use afkbot_domain::GameSession;
    use afkbot_sim::{SimCall, SimClient, SimConfig, SimSession};

    use super::*;

    struct Harness {
        ctl: Controller,
        client: Arc<SimClient>,
        _dir: tempfile::TempDir,
    }

    fn harness(json: &str) -> Harness {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let cfg = BotConfig::from_json(json).unwrap();
        let identity = IdentityStore::load(dir.path().join("bot_status.json"), &cfg.bot.base_username);
        let client = Arc::new(SimClient::new(SimConfig::manual()));
        let ctl = Controller::new(client.clone(), cfg, identity);
        Harness { ctl, client, _dir: dir }
    }

    fn default_harness() -> Harness {
        harness(r#"{"server": {"host": "mc.example.net"}, "features": {"antiAfk": {"enabled": false}}}"#)
    }

    impl Harness {
        // ---
        fn command(&mut self, command: Command) -> CommandReply {
            match command {
                Command::Start => self.ctl.start(),
                Command::Stop => self.ctl.stop(),
                Command::Reconnect => self.ctl.reconnect(),
            }
        }

        fn sim(&self) -> Arc<SimSession> {
            self.client.last_session().unwrap()
        }

        /// Let spawned tasks run, then handle everything they queued.
        async fn settle(&mut self) {
            // ---
            tokio::time::sleep(Duration::from_millis(1)).await;
            while let Ok(msg) = self.ctl.rx.try_recv() {
                self.ctl.dispatch(msg);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }

        async fn go_live(&mut self) {
            // ---
            self.sim().spawn();
            self.settle().await;
            assert_eq!(self.ctl.state, SessionState::Live);
        }

        fn pending_timers(&self) -> usize {
            usize::from(self.ctl.reconnect.is_some())
        }
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn start_connects_and_spawn_goes_live() {
        // ---
        let mut h = default_harness();

        let reply = h.command(Command::Start);
        assert_eq!(reply, CommandReply::ok("Starting bot..."));
        assert_eq!(h.ctl.state, SessionState::Connecting);
        assert_eq!(h.command(Command::Start), CommandReply::fail("Bot is already connecting."));

        h.go_live().await;
        assert_eq!(h.command(Command::Start), CommandReply::fail("Bot is already online."));
        assert_eq!(h.client.connect_count(), 1);

        let status = h.ctl.status();
        assert!(status.online);
        assert_eq!(status.status_message, "Online");
        assert_eq!(status.username, "AFKBot");
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn kick_records_reason_and_reconnects_after_kick_delay() {
        // ---
        let mut h = default_harness();
        h.command(Command::Start);
        h.go_live().await;

        h.sim().kick("banned");
        h.settle().await;

        let kick = h.ctl.identity.last_disconnect().cloned().unwrap();
        assert_eq!(kick.reason, "banned");
        assert_eq!(kick.server_address, "mc.example.net");
        assert_eq!(h.ctl.state, SessionState::Idle);
        assert_eq!(h.pending_timers(), 1, "the trailing ended must not add a timer");
        assert_eq!(h.ctl.reconnect.as_ref().unwrap().delay, Duration::from_millis(5_000));

        tokio::time::sleep(Duration::from_millis(4_990)).await;
        h.settle().await;
        assert_eq!(h.client.connect_count(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        h.settle().await;
        assert_eq!(h.client.connect_count(), 2);
        assert_eq!(h.ctl.state, SessionState::Connecting);
        assert_eq!(h.pending_timers(), 0);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn one_pending_timer_through_error_kick_end_sequence() {
        // ---
        let mut h = default_harness();
        h.command(Command::Start);

        // Connect refused: error then ended.
        h.sim().fail("connect ECONNREFUSED 127.0.0.1:25565");
        h.settle().await;
        assert_eq!(h.pending_timers(), 1);
        assert_eq!(h.ctl.attempts, 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        h.settle().await;
        assert_eq!(h.client.connect_count(), 2);

        // Kicked before spawn, then ended.
        h.sim().kick("server full");
        h.settle().await;
        assert_eq!(h.pending_timers(), 1);
        assert_eq!(h.ctl.attempts, 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        h.settle().await;
        h.go_live().await;
        assert_eq!(h.ctl.attempts, 0, "spawn resets the counter");

        h.sim().end("socketClosed");
        h.settle().await;
        assert_eq!(h.pending_timers(), 1);
        assert_eq!(h.ctl.reconnect.as_ref().unwrap().delay, Duration::from_secs(10));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn stop_from_any_state_leaves_nothing_running() {
        // ---
        let mut h = harness(
            r#"{"server": {"host": "mc.example.net"},
                "features": {"antiAfk": {"enabled": true},
                             "autoChat": {"enabled": true, "messages": ["brb"]}}}"#,
        );

        assert_eq!(
            h.command(Command::Stop),
            CommandReply::fail("Bot is already stopped or was never started.")
        );
        assert!(h.ctl.manual_stop);

        // Connecting.
        h.command(Command::Start);
        assert_eq!(h.command(Command::Stop), CommandReply::ok("Bot stopped."));
        assert!(h.sim().calls().contains(&SimCall::Quit("Stopped by command".into())));
        h.settle().await;
        assert_eq!(h.ctl.state, SessionState::Idle);
        assert_eq!(h.pending_timers(), 0);

        // Live, with both schedulers running.
        h.command(Command::Start);
        h.go_live().await;
        assert!(h.ctl.idle.is_active());
        assert!(h.ctl.auto_chat.is_active());
        assert_eq!(h.command(Command::Stop), CommandReply::ok("Bot stopped."));
        assert!(!h.ctl.idle.is_active());
        assert!(!h.ctl.auto_chat.is_active());
        assert_eq!(h.pending_timers(), 0);
        h.settle().await;
        assert_eq!(h.ctl.state, SessionState::Idle);

        // Reconnect pending.
        h.command(Command::Start);
        h.go_live().await;
        h.sim().kick("banned");
        h.settle().await;
        assert_eq!(h.pending_timers(), 1);
        assert_eq!(h.command(Command::Stop), CommandReply::ok("Bot stopped."));
        assert_eq!(h.pending_timers(), 0);
        assert_eq!(h.ctl.attempts, 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        h.settle().await;
        assert_eq!(h.client.connect_count(), 3, "no reconnect after stop");
        assert!(!h.ctl.idle.is_active());
        assert!(!h.ctl.auto_chat.is_active());
        assert!(h.ctl.manual_stop);
        assert_eq!(h.ctl.status().status_message, "Not started");
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn start_after_stop_clears_manual_stop() {
        // ---
        let mut h = default_harness();
        h.command(Command::Start);
        h.go_live().await;
        h.command(Command::Stop);
        assert!(h.ctl.manual_stop);

        assert_eq!(h.command(Command::Start), CommandReply::ok("Starting bot..."));
        assert!(!h.ctl.manual_stop);
        assert_eq!(h.ctl.state, SessionState::Connecting);
        assert_eq!(h.client.connect_count(), 2);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn reconnect_command_force_ends_then_reconnects() {
        // ---
        let mut h = default_harness();
        assert_eq!(
            h.command(Command::Reconnect),
            CommandReply::fail("Bot is not running or has been stopped.")
        );

        h.command(Command::Start);
        h.go_live().await;
        let first = h.sim();

        assert_eq!(h.command(Command::Reconnect), CommandReply::ok("Reconnecting bot..."));
        assert_eq!(h.ctl.state, SessionState::Terminating);
        assert_eq!(h.command(Command::Reconnect), CommandReply::fail("Bot is already reconnecting."));
        assert!(first.calls().contains(&SimCall::ForceEnd("Reconnecting by command".into())));

        h.settle().await;
        assert_eq!(h.pending_timers(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        h.settle().await;
        assert_eq!(h.client.connect_count(), 2);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn start_while_reconnect_pending_replaces_the_timer() {
        // ---
        let mut h = default_harness();
        h.command(Command::Start);
        h.go_live().await;
        h.sim().kick("restart");
        h.settle().await;
        assert_eq!(h.pending_timers(), 1);
        assert_eq!(h.client.connect_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.command(Command::Start), CommandReply::ok("Starting bot..."));
        assert_eq!(h.pending_timers(), 0);
        assert_eq!(h.client.connect_count(), 2);
        assert_eq!(h.ctl.attempts, 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        h.settle().await;
        assert_eq!(h.client.connect_count(), 2, "cancelled timer must not connect again");
        assert_eq!(h.ctl.state, SessionState::Connecting);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn queued_spawn_does_not_revive_a_terminating_session() {
        // ---
        let mut h = harness(r#"{"server": {"host": "mc.example.net"}}"#);
        h.command(Command::Start);
        let sim = h.sim();

        // Login and Spawned are queued but not yet handled.
        sim.spawn();
        assert_eq!(h.command(Command::Reconnect), CommandReply::ok("Reconnecting bot..."));
        assert_eq!(h.ctl.state, SessionState::Terminating);

        tokio::time::sleep(Duration::from_millis(1)).await;
        while let Ok(msg) = h.ctl.rx.try_recv() {
            let spawned = matches!(&msg, ControlMsg::Session(SessionEvent { event: GameEvent::Spawned, .. }));
            h.ctl.dispatch(msg);
            if spawned {
                break;
            }
        }

        assert_eq!(h.ctl.state, SessionState::Terminating);
        assert!(!h.ctl.idle.is_active());
        assert_eq!(h.command(Command::Reconnect), CommandReply::fail("Bot is already reconnecting."));

        h.settle().await;
        assert_eq!(h.ctl.state, SessionState::Idle);
        assert_eq!(h.pending_timers(), 1);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn kick_rotates_identity_when_enabled() {
        // ---
        let mut h = harness(
            r#"{"server": {"host": "h"}, "bot": {"baseUsername": "Keeper"},
                "features": {"antiAfk": {"enabled": false},
                             "randomUsernameOnKick": {"enabled": true, "length": 6}}}"#,
        );
        h.command(Command::Start);
        h.go_live().await;
        h.sim().kick("duplicate login");
        h.settle().await;

        let rotated = h.ctl.identity.username().to_string();
        assert_ne!(rotated, "Keeper");
        let suffix = rotated.strip_prefix("Keeper-").unwrap();
        assert_eq!(suffix.len(), 6);
        assert_eq!(h.ctl.identity.last_disconnect().unwrap().username, "Keeper");

        tokio::time::sleep(Duration::from_secs(5)).await;
        h.settle().await;
        assert_eq!(h.sim().username(), rotated);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn stale_events_and_timers_are_dropped() {
        // ---
        let mut h = default_harness();
        h.command(Command::Start);
        h.go_live().await;
        let live_id = h.ctl.session.as_ref().unwrap().id();

        h.ctl.dispatch(ControlMsg::Session(SessionEvent {
            session_id: uuid::Uuid::new_v4(),
            event: GameEvent::Ended {
                reason: "other".into(),
            },
        }));
        assert_eq!(h.ctl.state, SessionState::Live);

        h.ctl.dispatch(ControlMsg::ReconnectDue { timer_id: 999 });
        assert_eq!(h.client.connect_count(), 1);
        assert_eq!(h.ctl.session.as_ref().unwrap().id(), live_id);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn chat_validates_and_requires_live_session() {
        // ---
        let mut h = default_harness();
        assert_eq!(h.ctl.chat("   "), CommandReply::fail("Message must not be empty."));
        assert_eq!(h.ctl.chat("hello"), CommandReply::fail("Bot is not online."));

        h.command(Command::Start);
        h.go_live().await;
        assert_eq!(h.ctl.chat(""), CommandReply::fail("Message must not be empty."));
        assert_eq!(h.ctl.chat(" hello "), CommandReply::ok("Message sent."));

        let chats: Vec<_> = h.sim().calls().into_iter().filter(|c| matches!(c, SimCall::Chat(_))).collect();
        assert_eq!(chats, vec![SimCall::Chat("hello".into())]);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn idle_actions_stop_when_session_leaves_live() {
        // ---
        let mut h = harness(
            r#"{"server": {"host": "h"},
                "features": {"antiAfk": {"minInterval": 1000, "maxInterval": 1000,
                                         "actions": {"swingArm": true, "jump": false,
                                                     "sneak": false, "lookAround": false}}}}"#,
        );
        h.command(Command::Start);
        h.go_live().await;
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        let sim = h.sim();
        assert!(h.ctl.idle.is_active());

        sim.kick("afk");
        h.settle().await;
        assert!(!h.ctl.idle.is_active());
        let count = sim.calls().iter().filter(|c| c.is_world_action()).count();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sim.calls().iter().filter(|c| c.is_world_action()).count(), count);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn status_without_session_reports_not_started() {
        // ---
        let h = default_harness();
        let status = h.ctl.status();

        assert!(!status.online);
        assert_eq!(status.status_message, "Not started");
        assert_eq!(status.state, SessionState::Idle);
        assert_eq!(status.username, "AFKBot");
        assert!(status.last_kick.is_none());
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn handle_round_trips_through_the_run_loop() {
        // ---
        let h = default_harness();
        let handle = h.ctl.handle();
        let client = h.client.clone();
        tokio::spawn(h.ctl.run());

        assert_eq!(handle.command(Command::Start).await, CommandReply::ok("Starting bot..."));
        client.last_session().unwrap().spawn();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let status = handle.status().await;
        assert!(status.online);
        assert_eq!(handle.chat("gg").await, CommandReply::ok("Message sent."));
    }
}
