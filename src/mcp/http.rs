//! HTTP transport.
//!
//! One JSON-RPC message per POST, one JSON reply per response. There is no
//! server push: `/sse` announces the connection and nothing else, and
//! progress events are dropped.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::error::DecodeError;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::guard::ResponseGuard;
use crate::mcp::progress::ProgressReporter;
use crate::mcp::protocol::{parse_message, JsonRpcError, OutgoingMessage};

/// Shared state for HTTP handlers.
#[derive(Debug, Clone)]
pub struct HttpState {
    dispatcher: Arc<Dispatcher>,
    guard: ResponseGuard,
}

impl HttpState {
    /// Creates handler state.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>, guard: ResponseGuard) -> Self {
        Self { dispatcher, guard }
    }
}

/// Builds the HTTP router.
pub fn router(state: HttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/sse", get(sse))
        .route("/mcp", post(message).fallback(not_found))
        .route("/message", post(message).fallback(not_found))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

/// Serves the router until Ctrl+C.
///
/// # Errors
///
/// Returns an error if binding or serving fails.
pub async fn serve(addr: SocketAddr, state: HttpState) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP transport listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
}

async fn health(State(state): State<HttpState>) -> Json<Value> {
    let info = state.dispatcher.server_info();
    Json(json!({
        "status": "ok",
        "name": info.name,
        "version": info.version,
        "transport": "http",
        "endpoints": {
            "mcp": "/mcp",
            "message": "/message",
            "sse": "/sse",
            "health": "/health",
        },
    }))
}

async fn sse() -> Response {
    let connection_id = uuid::Uuid::new_v4();
    tracing::debug!(%connection_id, "SSE connection opened");

    let payload = json!({
        "connectionId": connection_id.to_string(),
        "endpoint": "/message",
    });
    let body = format!("event: connected\ndata: {payload}\n\n");

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

async fn message(State(state): State<HttpState>, body: Bytes) -> Response {
    let Ok(text) = std::str::from_utf8(&body) else {
        tracing::warn!("Request body is not valid UTF-8");
        let err = DecodeError::Structural {
            id: None,
            reason: "request body must be UTF-8",
        };
        return decode_failure(&state, &err);
    };

    if text.trim().is_empty() {
        return Json(json!({"status": "ok"})).into_response();
    }

    let msg = match parse_message(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode HTTP message");
            return decode_failure(&state, &e);
        }
    };

    match state.dispatcher.dispatch(msg, ProgressReporter::disabled()).await {
        Some(reply) => json_response(StatusCode::OK, state.guard.finalize(&reply)),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn decode_failure(state: &HttpState, err: &DecodeError) -> Response {
    let reply = OutgoingMessage::Error(JsonRpcError::from(err));
    json_response(StatusCode::BAD_REQUEST, state.guard.finalize(&reply))
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    tracing::debug!(path = %uri.path(), "No route");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": 404,
                "message": "Not found",
                "path": uri.path(),
            }
        })),
    )
}
