//! HTTP control surface for the browser dashboard.
//!
//! | Route           | Purpose                                   |
//! |-----------------|-------------------------------------------|
//! | `GET  /status`  | live snapshot of the bot                  |
//! | `GET  /logs`    | the most recent log entries, oldest first |
//! | `POST /chat`    | `{message}`; send chat as the bot         |
//! | `POST /command` | `{action}`; `start`, `stop`, `reconnect`  |
//!
//! Anything else falls through to the static dashboard assets.

use std::net::SocketAddr;
use std::path::Path;

// ---

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

// ---

use super::logs::{LogEntry, LogRing};
use super::{Command, CommandReply, ControllerHandle, StatusReport};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    // ---
    pub controller: ControllerHandle,
    pub logs: LogRing,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/status", get(api_status))
        .route("/logs", get(api_logs))
        .route("/chat", post(api_chat))
        .route("/command", post(api_command))
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---

pub async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
    // ---
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("dashboard listening on http://{addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn api_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.controller.status().await)
}

async fn api_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.logs.snapshot())
}

// ---

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

async fn api_chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> (StatusCode, Json<CommandReply>) {
    // ---
    let reply = state.controller.chat(req.message).await;
    let code = if reply.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (code, Json(reply))
}

// ---

#[derive(Debug, Deserialize)]
struct CommandRequest {
    #[serde(default)]
    action: String,
}

async fn api_command(State(state): State<AppState>, Json(req): Json<CommandRequest>) -> Json<CommandReply> {
    // ---
    let reply = match Command::parse(&req.action) {
        Some(command) => {
            tracing::info!(action = %req.action, "dashboard command");
            state.controller.command(command).await
        }
        None => {
            tracing::warn!(action = %req.action, "unknown dashboard command");
            CommandReply::fail(format!("Unknown command \"{}\".", req.action))
        }
    };
    Json(reply)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use afkbot_sim::{SimCall, SimClient, SimConfig};

    use crate::config::BotConfig;
    use crate::identity::IdentityStore;
    use crate::Controller;

    use super::*;

    struct Fixture {
        router: Router,
        client: Arc<SimClient>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        // ---
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>afkbot</h1>").unwrap();

        let cfg = BotConfig::from_json(r#"{"server": {"host": "mc.example.net"}}"#).unwrap();
        let identity = IdentityStore::load(dir.path().join("bot_status.json"), &cfg.bot.base_username);
        let client = Arc::new(SimClient::new(SimConfig::manual()));
        let controller = Controller::new(client.clone(), cfg, identity);

        let logs = LogRing::new(10);
        let state = AppState {
            controller: controller.handle(),
            logs,
        };
        tokio::spawn(controller.run());

        Fixture {
            router: create_router(state, dir.path()),
            client,
            _dir: dir,
        }
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        // ---
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn status_without_session_is_not_started() {
        // ---
        let fx = fixture();
        let (code, body) = call(&fx.router, "GET", "/status", None).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["online"], false);
        assert_eq!(body["statusMessage"], "Not started");
        assert_eq!(body["username"], "AFKBot");
        assert_eq!(body["lastKick"], Value::Null);
        assert!(body.get("uptime_ms").is_some());
    }

    // ---

    #[tokio::test]
    async fn empty_chat_is_rejected_without_sending() {
        // ---
        let fx = fixture();
        call(&fx.router, "POST", "/command", Some(r#"{"action": "start"}"#)).await;
        fx.client.last_session().unwrap().spawn();

        let (code, body) = call(&fx.router, "POST", "/chat", Some(r#"{"message": ""}"#)).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let sent = fx.client.last_session().unwrap().calls();
        assert!(!sent.iter().any(|c| matches!(c, SimCall::Chat(_))));
    }

    // ---

    #[tokio::test]
    async fn chat_while_offline_is_bad_request() {
        // ---
        let fx = fixture();
        let (code, body) = call(&fx.router, "POST", "/chat", Some(r#"{"message": "hi"}"#)).await;

        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Bot is not online.");
    }

    // ---

    #[tokio::test]
    async fn commands_report_success_and_unknown_actions() {
        // ---
        let fx = fixture();

        let (code, body) = call(&fx.router, "POST", "/command", Some(r#"{"action": "start"}"#)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(fx.client.connect_count(), 1);

        let (_, body) = call(&fx.router, "POST", "/command", Some(r#"{"action": "stop"}"#)).await;
        assert_eq!(body["message"], "Bot stopped.");

        let (code, body) = call(&fx.router, "POST", "/command", Some(r#"{"action": "dance"}"#)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Unknown command \"dance\".");
    }

    // ---

    #[tokio::test]
    async fn logs_and_static_assets_are_served() {
        // ---
        let fx = fixture();

        let (code, body) = call(&fx.router, "GET", "/logs", None).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.is_array());

        let req = Request::builder().uri("/index.html").body(Body::empty()).unwrap();
        let resp = fx.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
