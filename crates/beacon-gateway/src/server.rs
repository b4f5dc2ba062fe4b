//! Per-agent HTTP server
//!
//! Every agent answers `GET /` and `GET /health`. The Notifier also accepts
//! relayed records on `POST /send-notification`, which are handed to its
//! agent loop through a [`RelayLink`].

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use beacon_core::relay::RELAY_PATH;
use beacon_core::{AgentStatus, NotificationRecord, RelayLink, RelayResponse, RelayStatus};
use chrono::{SecondsFormat, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::Result;

/// State shared across handlers
#[derive(Clone)]
pub struct ServerState {
    pub status: Arc<AgentStatus>,
    pub relay: Option<RelayLink>,
    pub started_at: Instant,
}

impl ServerState {
    fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Status server of one agent
pub struct StatusServer {
    state: ServerState,
}

impl StatusServer {
    pub fn new(status: Arc<AgentStatus>) -> Self {
        Self {
            state: ServerState {
                status,
                relay: None,
                started_at: Instant::now(),
            },
        }
    }

    /// Accept relayed records for this agent
    pub fn with_relay(mut self, relay: RelayLink) -> Self {
        self.state.relay = Some(relay);
        self
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/", get(Self::handle_status))
            .route("/health", get(Self::handle_health));

        if self.state.relay.is_some() {
            router = router.route(RELAY_PATH, post(Self::handle_relay));
        }

        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the listener, then serve on a background task.
    ///
    /// Binding errors are returned here so a taken port stops startup.
    pub async fn bind(self, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let label = self.state.status.label().to_string();
        let router = self.build_router();

        tracing::info!("[{}] 🌐 Web server running on {}", label, local_addr);

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("[{}] ❌ Web server stopped: {}", label, e);
            }
        });

        Ok((local_addr, task))
    }

    // HTTP handlers

    async fn handle_status(State(state): State<ServerState>) -> impl IntoResponse {
        let status = &state.status;
        Json(serde_json::json!({
            "status": format!("{} bot is running", status.label()),
            "uptime": state.uptime_secs(),
            "timestamp": now_iso(),
            "role": status.role().to_string(),
            "account": status.account(),
            "ready": status.is_ready(),
            "pendingNotifications": status.pending(),
            "monitoredServers": status.scope_size(),
        }))
    }

    async fn handle_health(State(state): State<ServerState>) -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "healthy",
            "timestamp": now_iso(),
            "uptime": state.uptime_secs(),
        }))
    }

    async fn handle_relay(
        State(state): State<ServerState>,
        Json(record): Json<NotificationRecord>,
    ) -> (StatusCode, Json<RelayResponse>) {
        let Some(relay) = state.relay else {
            return (
                StatusCode::NOT_FOUND,
                Json(RelayResponse {
                    status: RelayStatus::Error,
                    message: "relay not enabled on this agent".to_string(),
                }),
            );
        };

        let response = RelayResponse::from(relay.forward(record).await);
        let code = match response.status {
            RelayStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
            RelayStatus::Success | RelayStatus::Queued => StatusCode::OK,
        };
        (code, Json(response))
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
