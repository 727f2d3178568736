//! Configuration for the relay server and the chat client
//!
//! Precedence is env > TOML file > default, as loaded by [`RelayConfig::load`]
//! and [`ClientConfig::load`].

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::completion::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_RELAY_URL, DEFAULT_TEMPERATURE,
    DEFAULT_UPSTREAM_URL, Endpoint,
};
use crate::persona::Persona;

use self::file::{ClientFileConfig, RelayFileConfig};

/// Default relay port
pub const DEFAULT_PORT: u16 = 3000;

/// Default `X-Title` header
pub const DEFAULT_TITLE: &str = "Wesley AI Chatbot";

/// Relay server configuration
#[derive(Debug)]
pub struct RelayConfig {
    /// Port to listen on
    pub port: u16,

    /// Upstream completion endpoint
    pub upstream_url: String,

    /// Model injected into forwarded requests
    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// `HTTP-Referer` header sent upstream
    pub referer: Option<String>,

    /// `X-Title` header sent upstream
    pub title: String,

    /// Server-held upstream credential (from `OPENROUTER_API_KEY`)
    pub api_key: Option<SecretString>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            referer: None,
            title: DEFAULT_TITLE.to_string(),
            api_key: None,
        }
    }
}

impl RelayConfig {
    /// Load from the process environment and the config file
    ///
    /// Reads from:
    /// - `OPENROUTER_API_KEY`: upstream credential (env only)
    /// - `WESLEY_UPSTREAM_URL`: upstream completion endpoint
    /// - `WESLEY_MODEL`: model identifier
    /// - `WESLEY_TEMPERATURE`: sampling temperature
    /// - `WESLEY_MAX_TOKENS`: reply length cap
    /// - `WESLEY_REFERER`: `HTTP-Referer` header
    /// - `WESLEY_TITLE`: `X-Title` header
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::from_sources(fc.relay, |key| std::env::var(key).ok())
    }

    /// Build from a file overlay and an environment lookup
    #[must_use]
    pub fn from_sources(fc: RelayFileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_key = env("OPENROUTER_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        if api_key.is_none() {
            tracing::warn!("OPENROUTER_API_KEY not set, relay requests will fail");
        }

        Self {
            port: fc.port.unwrap_or(defaults.port),
            upstream_url: env("WESLEY_UPSTREAM_URL")
                .or(fc.upstream_url)
                .unwrap_or(defaults.upstream_url),
            model: env("WESLEY_MODEL")
                .or(fc.model)
                .unwrap_or(defaults.model),
            temperature: env("WESLEY_TEMPERATURE")
                .and_then(|s| s.parse().ok())
                .or(fc.temperature)
                .unwrap_or(defaults.temperature),
            max_tokens: env("WESLEY_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .or(fc.max_tokens)
                .unwrap_or(defaults.max_tokens),
            referer: env("WESLEY_REFERER").or(fc.referer),
            title: env("WESLEY_TITLE")
                .or(fc.title)
                .unwrap_or(defaults.title),
            api_key,
        }
    }
}

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where completion requests go
    pub endpoint: Endpoint,

    /// Assistant persona
    pub persona: Persona,

    /// Directory holding the settings database
    pub data_dir: PathBuf,
}

impl ClientConfig {
    /// Load from CLI overrides, the process environment and the config file
    ///
    /// Reads `WESLEY_RELAY_URL` and `WESLEY_UPSTREAM_URL`.
    #[must_use]
    pub fn load(relay_url: Option<String>, direct: bool) -> Self {
        let fc = file::load_config_file();
        let persona = fc.persona.unwrap_or_default();
        let mut config =
            Self::from_sources(fc.client, relay_url, direct, |key| std::env::var(key).ok());
        config.persona = persona;
        config
    }

    /// Build from a file overlay, CLI overrides and an environment lookup
    #[must_use]
    pub fn from_sources(
        fc: ClientFileConfig,
        relay_url: Option<String>,
        direct: bool,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let endpoint = if direct || fc.direct.unwrap_or(false) {
            Endpoint::direct(
                env("WESLEY_UPSTREAM_URL")
                    .or(fc.upstream_url)
                    .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            )
        } else {
            Endpoint::relay(
                relay_url
                    .or_else(|| env("WESLEY_RELAY_URL"))
                    .or(fc.relay_url)
                    .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
            )
        };

        Self {
            endpoint,
            persona: Persona::default(),
            data_dir: data_dir(),
        }
    }

    /// Path of the settings database
    #[must_use]
    pub fn settings_db_path(&self) -> PathBuf {
        self.data_dir.join("wesley.db")
    }
}

/// Data directory (`~/.local/share/wesley` on Linux)
fn data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("wesley"))
}
