//! Completion API clients
//!
//! A [`CompletionClient`] turns a conversation payload into reply text. The
//! HTTP implementation talks either to the Wesley relay (which holds the
//! credential) or straight to an OpenAI-compatible upstream with a key taken
//! from the user's settings.

mod types;

use async_trait::async_trait;
use serde::Serialize;

pub use types::{
    ChatMessage, Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Role,
    extract_error_message,
};

use crate::{Error, Result};

/// Default upstream completion endpoint
pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default relay endpoint for the browser/terminal client
pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000/api/chat";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default reply length cap
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Sends a conversation to a completion endpoint
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether a user-supplied API key must be present before calling
    fn requires_api_key(&self) -> bool {
        false
    }

    /// Request a reply for the given conversation
    ///
    /// # Errors
    ///
    /// Returns `Http` on transport failure, `Upstream` on a non-2xx status and
    /// `MalformedResponse` when the reply text is missing
    async fn complete(&self, request: &CompletionRequest, api_key: Option<&str>)
    -> Result<String>;
}

/// Where the HTTP client sends requests
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// Wesley relay; only `{messages}` is sent, the relay adds model and key
    Relay { url: String },
    /// OpenAI-compatible upstream called with the user's own key
    Direct {
        url: String,
        default_model: String,
        temperature: f32,
        max_tokens: u32,
    },
}

impl Endpoint {
    /// Relay endpoint at `url`
    #[must_use]
    pub fn relay(url: impl Into<String>) -> Self {
        Self::Relay { url: url.into() }
    }

    /// Direct upstream endpoint at `url` with default sampling parameters
    #[must_use]
    pub fn direct(url: impl Into<String>) -> Self {
        Self::Direct {
            url: url.into(),
            default_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    fn url(&self) -> &str {
        match self {
            Self::Relay { url } | Self::Direct { url, .. } => url,
        }
    }
}

/// HTTP completion client
///
/// No timeout is configured: a request runs until the transport resolves or fails.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl HttpCompletionClient {
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn post<T: Serialize + Sync>(&self, body: &T, api_key: Option<&str>) -> Result<String> {
        let mut builder = self.client.post(self.endpoint.url()).json(body);
        if let Some(key) = api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = extract_error_message(&body);
            tracing::warn!(
                status = status.as_u16(),
                upstream_error = message.as_deref().unwrap_or("(none)"),
                "completion request failed"
            );
            return Err(Error::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CompletionResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        parsed.into_reply()
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    fn name(&self) -> &'static str {
        match self.endpoint {
            Endpoint::Relay { .. } => "relay",
            Endpoint::Direct { .. } => "direct",
        }
    }

    fn requires_api_key(&self) -> bool {
        matches!(self.endpoint, Endpoint::Direct { .. })
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        api_key: Option<&str>,
    ) -> Result<String> {
        match &self.endpoint {
            Endpoint::Relay { url } => {
                #[derive(Serialize)]
                struct RelayBody<'a> {
                    messages: &'a [ChatMessage],
                }

                tracing::debug!(%url, messages = request.messages.len(), "sending to relay");
                self.post(
                    &RelayBody {
                        messages: &request.messages,
                    },
                    None,
                )
                .await
            }
            Endpoint::Direct {
                url,
                default_model,
                temperature,
                max_tokens,
            } => {
                let key = api_key
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .ok_or(Error::MissingCredential)?;

                let body = CompletionRequest {
                    model: request
                        .model
                        .clone()
                        .or_else(|| Some(default_model.clone())),
                    messages: request.messages.clone(),
                    temperature: request.temperature.or(Some(*temperature)),
                    max_tokens: request.max_tokens.or(Some(*max_tokens)),
                };

                tracing::debug!(%url, model = ?body.model, messages = body.messages.len(), "sending to upstream");
                self.post(&body, Some(key)).await
            }
        }
    }
}
