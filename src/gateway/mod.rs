pub mod cookie;

/// HTTP front end for the session manager.
///
/// Serves the visit counter demo and a health probe, and owns the periodic
/// sweep that reclaims expired sessions.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::errors::SessionResult;
use crate::session::{Session, SessionManager, Value};
use cookie::SessionCookie;

const COUNT_KEY: &str = "count";

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct GatewayState {
    manager: Arc<SessionManager>,
    cookie: SessionCookie,
}

impl GatewayState {
    pub fn new(manager: Arc<SessionManager>, cookie: SessionCookie) -> Self {
        Self { manager, cookie }
    }
}

/// Response body for GET /count.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: i64,
    pub session_id: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the HTTP router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/count", get(count_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}

/// GET /count: bump the per-session visit counter.
async fn count_handler(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let (mut session, is_new) = match load_or_create(&state, &headers).await {
        Ok(found) => found,
        Err(e) => return internal_error(&e),
    };

    let count = current_count(session.get(COUNT_KEY)) + 1;
    if let Err(e) = session.set(COUNT_KEY, count) {
        return internal_error(&e);
    }
    if let Err(e) = state.manager.set_session(&session).await {
        return internal_error(&e);
    }

    let mut response = Json(CountResponse {
        count,
        session_id: session.id().to_string(),
    })
    .into_response();
    if is_new
        && let Err(e) = state
            .cookie
            .set_session_id(response.headers_mut(), session.id())
    {
        return internal_error(&e);
    }
    response
}

/// The caller's session from its cookie, or a fresh one when there is no
/// usable session. The flag is true for a fresh session.
async fn load_or_create(
    state: &GatewayState,
    headers: &HeaderMap,
) -> SessionResult<(Session, bool)> {
    if let Some(id) = state.cookie.session_id(headers) {
        match state.manager.get_session(&id).await {
            Ok(session) => return Ok((session, false)),
            Err(e) if e.needs_new_session() => debug!("starting over: {}", e),
            Err(e) => return Err(e),
        }
    }
    let session = state.manager.create_session().await?;
    Ok((session, true))
}

/// Counter value in either representation. The file backend hands numbers
/// back as text.
fn current_count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Int(n)) => *n,
        Some(Value::Str(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn internal_error(e: &dyn std::fmt::Display) -> Response {
    error!("session request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// GET /api/health: health check endpoint.
async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "backend": state.manager.backend().as_str(),
    }))
}

/// Run `delete_expired_sessions` every `every`, starting one period from now.
/// Failures are logged and retried on the next tick.
pub fn spawn_sweeper(manager: Arc<SessionManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match manager.delete_expired_sessions().await {
                Ok(0) => debug!("session sweep: nothing expired"),
                Ok(n) => info!("session sweep removed {} expired sessions", n),
                Err(e) => warn!("session sweep failed: {}", e),
            }
        }
    })
}

/// Server and sweeper tasks of a started gateway.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub server: JoinHandle<()>,
    pub sweeper: JoinHandle<()>,
}

impl RunningGateway {
    pub fn shutdown(self) {
        self.sweeper.abort();
        self.server.abort();
    }
}

/// Bind the listener and spawn the server and the sweeper.
pub async fn start(config: &GatewayConfig, manager: Arc<SessionManager>) -> Result<RunningGateway> {
    let sweep_interval = config.sweep_interval()?;
    let state = GatewayState::new(manager.clone(), SessionCookie::new(&config.cookie_name));
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let addr = listener.local_addr()?;
    info!(
        "HTTP listening on {} ({} backend, sweep every {})",
        addr,
        manager.backend(),
        humantime::format_duration(sweep_interval)
    );

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });
    let sweeper = spawn_sweeper(manager, sweep_interval);

    Ok(RunningGateway {
        addr,
        server,
        sweeper,
    })
}
