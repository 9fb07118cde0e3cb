//! Web server implementation

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use tally_core::{Command, CommandOutcome, Counter, CounterSnapshot};

use crate::page;

/// Web server configuration
#[derive(Clone, Debug, Default)]
pub struct WebServerConfig {
    /// Expose `POST /api/counter/reset` so the e2e harness can restore the
    /// session-start state between scenarios. Off outside test runs; the
    /// route answers 404 when disabled.
    pub test_mode: bool,
}

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
}

struct WebServerState {
    /// The one counter this process presents. The write lock applies
    /// commands one at a time, whatever order the page delivers them in.
    counter: RwLock<Counter>,

    cfg: WebServerConfig,
}

impl WebServer {
    /// Create a new web server owning a fresh counter.
    pub fn new(cfg: WebServerConfig) -> Self {
        Self {
            state: Arc::new(WebServerState {
                counter: RwLock::new(Counter::default()),
                cfg,
            }),
        }
    }

    /// Create router
    pub fn router(&self) -> Router {
        Router::new()
            // Counter page at the root
            .route("/", get(page_handler))
            // Public health check
            .route("/api/health", get(health_handler))
            // Counter API (the page's transport)
            .route("/api/counter", get(snapshot_handler))
            .route("/api/counter/increment", post(increment_handler))
            .route("/api/counter/decrement", post(decrement_handler))
            // Harness-only; guarded inside the handler
            .route("/api/counter/reset", post(reset_handler))
            // Fallback
            .fallback(not_found_handler)
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Bind `addr` and start the web server.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("Counter app starting on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new(WebServerConfig::default())
    }
}

/// Convenience entry point used by `main`.
pub async fn serve(addr: SocketAddr, cfg: WebServerConfig) -> anyhow::Result<()> {
    let server = WebServer::new(cfg);
    server.serve(addr).await
}

// ============================================================================
// Handlers
// ============================================================================

async fn page_handler() -> Html<&'static str> {
    Html(page::COUNTER_PAGE)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tally-web"
    }))
}

async fn snapshot_handler(State(state): State<Arc<WebServerState>>) -> Json<CounterSnapshot> {
    let counter = state.counter.read().await;
    Json(CounterSnapshot {
        value: counter.value(),
    })
}

async fn increment_handler(State(state): State<Arc<WebServerState>>) -> Json<CommandOutcome> {
    apply_command(&state, Command::Increment).await
}

async fn decrement_handler(State(state): State<Arc<WebServerState>>) -> Json<CommandOutcome> {
    apply_command(&state, Command::Decrement).await
}

async fn apply_command(state: &WebServerState, command: Command) -> Json<CommandOutcome> {
    let mut counter = state.counter.write().await;
    let value = counter.apply(command);
    debug!(command = command.as_str(), value, "applied counter command");
    Json(CommandOutcome { command, value })
}

async fn reset_handler(State(state): State<Arc<WebServerState>>) -> Response {
    if !state.cfg.test_mode {
        return not_found_handler().await.into_response();
    }

    let mut counter = state.counter.write().await;
    *counter = Counter::default();
    info!("counter reset to session-start state");

    Json(CounterSnapshot {
        value: counter.value(),
    })
    .into_response()
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not found"})),
    )
}
