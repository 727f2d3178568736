//! Credential-hiding relay for the completion API
//!
//! One route, `POST /api/chat`: the body's `messages` are forwarded upstream
//! with the server-held key, model and sampling parameters attached. A
//! successful upstream body is returned byte-for-byte; every failure becomes
//! a generic `500 {"error": ...}` so upstream detail never reaches the client.

pub mod health;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::completion::{ChatMessage, CompletionRequest};
use crate::config::RelayConfig;

/// Error body returned for every relay failure
pub const RELAY_ERROR_MESSAGE: &str = "Failed to get response";

/// Shared state for relay handlers
pub struct RelayState {
    client: reqwest::Client,
    upstream_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    referer: Option<String>,
    title: String,
    api_key: Option<SecretString>,
}

impl RelayState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream_url: config.upstream_url,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            referer: config.referer,
            title: config.title,
            api_key: config.api_key,
        }
    }
}

/// Body accepted by `POST /api/chat`
#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
}

/// Build the relay router: `/api/chat`, `/health`, CORS and request tracing
pub fn router(state: Arc<RelayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat))
        .with_state(state)
        .merge(health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Forward a conversation upstream
async fn chat(
    State(state): State<Arc<RelayState>>,
    payload: std::result::Result<Json<RelayRequest>, JsonRejection>,
) -> std::result::Result<Response, RelayError> {
    let Json(request) = payload.map_err(RelayError::InvalidRequest)?;
    let api_key = state.api_key.as_ref().ok_or(RelayError::MissingCredential)?;

    let body = CompletionRequest {
        model: Some(state.model.clone()),
        messages: request.messages,
        temperature: Some(state.temperature),
        max_tokens: Some(state.max_tokens),
    };

    tracing::debug!(
        messages = body.messages.len(),
        model = %state.model,
        "forwarding chat request"
    );

    let mut builder = state
        .client
        .post(&state.upstream_url)
        .bearer_auth(api_key.expose_secret())
        .header("X-Title", &state.title)
        .json(&body);
    if let Some(referer) = &state.referer {
        builder = builder.header("HTTP-Referer", referer);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| RelayError::Transport(e.to_string()))?;
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RelayError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(RelayError::UpstreamStatus {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).chars().take(512).collect(),
        });
    }

    if let Err(e) = serde_json::from_slice::<serde::de::IgnoredAny>(&bytes) {
        return Err(RelayError::InvalidBody(e.to_string()));
    }

    Ok(pass_through(bytes))
}

/// Return the upstream JSON unmodified
fn pass_through(bytes: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        bytes,
    )
        .into_response()
}

/// Relay failures; all map to the same `{"error": ...}` body
///
/// Rejected request bodies keep their 4xx status, everything else is a 500.
#[derive(Debug)]
pub enum RelayError {
    /// Body missing, not JSON, or without `messages`
    InvalidRequest(JsonRejection),
    MissingCredential,
    Transport(String),
    UpstreamStatus { status: u16, body: String },
    InvalidBody(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let status = match &self {
            Self::InvalidRequest(rejection) => {
                tracing::warn!(error = %rejection.body_text(), "rejected chat request");
                rejection.status()
            }
            Self::MissingCredential => {
                tracing::error!("no upstream credential configured");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Transport(e) => {
                tracing::error!(error = %e, "upstream request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::UpstreamStatus { status, body } => {
                tracing::error!(status, body = %body, "upstream returned error status");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::InvalidBody(e) => {
                tracing::error!(error = %e, "upstream body is not JSON");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: RELAY_ERROR_MESSAGE,
            }),
        )
            .into_response()
    }
}

/// Relay HTTP server
pub struct RelayServer {
    state: Arc<RelayState>,
    port: u16,
}

impl RelayServer {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let port = config.port;
        Self {
            state: Arc::new(RelayState::new(config)),
            port,
        }
    }

    /// Router serving this relay's state
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the relay server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind relay: {e}")))?;

        self.serve(listener).await
    }

    /// Serve on an already-bound listener
    ///
    /// # Errors
    ///
    /// Returns error if the server stops with an IO error
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let port = listener.local_addr().map_or(self.port, |a| a.port());
        tracing::info!(
            port,
            upstream = %self.state.upstream_url,
            credential = self.state.api_key.is_some(),
            "relay listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("relay server error: {e}")))?;

        Ok(())
    }

    /// Run the relay server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
