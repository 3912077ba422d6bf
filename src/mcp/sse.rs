//! SSE transport
//!
//! HTTP server for the MCP server-sent-events transport:
//!
//! - `GET /sse` opens an event stream. The first event (`endpoint`) tells the
//!   client where to POST its messages; responses follow as `message` events.
//! - `POST /messages/?session_id=<id>` accepts one JSON-RPC message and
//!   answers `202 Accepted`.
//! - `GET /` and `GET /health` report liveness for container health checks.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{McpError, PucaError, Result};
use crate::mcp::server::{McpServer, SERVER_NAME, SERVER_VERSION};
use crate::mcp::types::JsonRpcResponse;

/// Path clients POST messages to
pub const MESSAGES_PATH: &str = "/messages/";

/// Outbound messages buffered per session
const SESSION_BUFFER: usize = 32;

/// Open SSE sessions, keyed by session id
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, mpsc::Sender<JsonRpcResponse>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its id and receiving end
    pub async fn open(&self) -> (String, mpsc::Receiver<JsonRpcResponse>) {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.sessions.write().await.insert(id.clone(), tx);
        (id, rx)
    }

    pub async fn sender(&self, id: &str) -> Option<mpsc::Sender<JsonRpcResponse>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn close(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            tracing::info!(session_id = id, "SSE session closed");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Shared state of the HTTP server
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self {
            server,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

/// Removes its session from the store when the event stream is dropped
struct SessionGuard {
    id: String,
    sessions: Arc<SessionStore>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let id = std::mem::take(&mut self.id);
        let sessions = Arc::clone(&self.sessions);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { sessions.close(&id).await });
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/sse", get(sse_handler))
        .route(MESSAGES_PATH, post(message_handler))
        .route("/messages", post(message_handler))
        .with_state(state)
}

/// Serve the SSE transport until Ctrl-C or SIGTERM
pub async fn serve(server: Arc<McpServer>, bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "MCP SSE server listening");

    axum::serve(listener, router(AppState::new(server)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            PucaError::Mcp(McpError::TransportError {
                message: e.to_string(),
            })
        })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

// ==================== Handlers ====================

/// Health status for liveness probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub active_sessions: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        service: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        active_sessions: state.sessions.len().await,
    })
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (session_id, rx) = state.sessions.open().await;
    tracing::info!(session_id = %session_id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?session_id={}", MESSAGES_PATH, session_id));

    let guard = SessionGuard {
        id: session_id,
        sessions: Arc::clone(&state.sessions),
    };

    let messages = ReceiverStream::new(rx).map(move |response| {
        let _guard = &guard;
        let data = serde_json::to_string(&response).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize response");
            String::from("{}")
        });
        Event::default().event("message").data(data)
    });

    let events = stream::once(async move { endpoint })
        .chain(messages)
        .map(Ok::<_, Infallible>);

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };

    let Some(sender) = state.sessions.sender(&session_id).await else {
        tracing::warn!(session_id = %session_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    let message: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Unparseable message");
            return (StatusCode::BAD_REQUEST, "Could not parse message").into_response();
        }
    };

    let server = Arc::clone(&state.server);
    tokio::spawn(async move {
        if let Some(response) = server.handle_value(message).await {
            if sender.send(response).await.is_err() {
                tracing::debug!(session_id = %session_id, "Session closed before response was sent");
            }
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
