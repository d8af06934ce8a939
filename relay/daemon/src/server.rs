//! HTTP Server
//!
//! Routes, handlers, and the error envelope of the inference daemon.
//!
//! # Routes
//!
//! - `GET /` - Welcome message
//! - `POST /api/message` - Complete reply as `{"response": ...}`
//! - `POST /api/message_stream` - Raw stream of reply deltas
//! - `GET /health` - Liveness probe

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use futures::stream;
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use relay_core::{LlmBackend, LlmRequest, MessageRequest, MessageResponse, StreamingToken};

/// Body of `GET /`
pub const WELCOME: &str = "Welcome to the Chat App API";

/// Detail returned with every 500
const ERROR_DETAIL: &str = "Error processing message";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider
    pub backend: Arc<dyn LlmBackend>,
    /// Model identifier passed to the backend
    pub model: String,
    /// System prompt sent with every request
    pub system_prompt: Option<String>,
    /// Sampling temperature (None = model default)
    pub temperature: Option<f32>,
    /// Reply length limit in tokens (0 = model default)
    pub max_tokens: u32,
}

impl AppState {
    fn request(&self, text: String) -> LlmRequest {
        let mut request =
            LlmRequest::new(text, self.model.clone()).with_max_tokens(self.max_tokens);
        if let Some(system) = &self.system_prompt {
            request = request.with_system(system.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

/// Handler failure, reported as 500 `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    /// The LLM backend could not produce a reply
    #[error("backend failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "Error processing message");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": ERROR_DETAIL })),
        )
            .into_response()
    }
}

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/api/message", post(message))
        .route("/api/message_stream", post(message_stream))
        .route("/health", any(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": WELCOME }))
}

async fn health() -> &'static str {
    "OK"
}

async fn message(
    State(state): State<AppState>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let reply = state.backend.send(&state.request(body.text)).await?;
    debug!(
        model = %reply.model,
        tokens = ?reply.tokens_used,
        duration_ms = ?reply.duration_ms,
        "Reply complete"
    );
    Ok(Json(MessageResponse {
        response: reply.content,
    }))
}

async fn message_stream(
    State(state): State<AppState>,
    Json(body): Json<MessageRequest>,
) -> Result<Response, ApiError> {
    let rx = state.backend.send_streaming(&state.request(body.text)).await?;

    // Token deltas only; a backend error aborts the body so the client
    // sees a transport failure instead of a short reply.
    let deltas = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await? {
            StreamingToken::Token(text) => Some((Ok(Bytes::from(text)), rx)),
            StreamingToken::Complete { .. } => None,
            StreamingToken::Error(e) => {
                warn!(error = %e, "Backend stream failed");
                Some((Err(std::io::Error::other(e)), rx))
            }
        }
    });

    Ok((
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(deltas),
    )
        .into_response())
}
