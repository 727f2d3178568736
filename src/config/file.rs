//! TOML configuration file loading
//!
//! Supports `~/.config/wesley/config.toml` as a persistent config source.
//! All fields are optional: the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::persona::Persona;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct WesleyConfigFile {
    /// Persona overrides; unset fields keep the built-in persona
    #[serde(default)]
    pub persona: Option<Persona>,

    /// Relay server configuration
    #[serde(default)]
    pub relay: RelayFileConfig,

    /// Chat client configuration
    #[serde(default)]
    pub client: ClientFileConfig,
}

/// Relay server configuration
#[derive(Debug, Default, Deserialize)]
pub struct RelayFileConfig {
    /// Port to listen on
    pub port: Option<u16>,

    /// Upstream completion endpoint
    pub upstream_url: Option<String>,

    /// Model identifier injected into forwarded requests
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Reply length cap
    pub max_tokens: Option<u32>,

    /// `HTTP-Referer` header sent upstream
    pub referer: Option<String>,

    /// `X-Title` header sent upstream
    pub title: Option<String>,
}

/// Chat client configuration
#[derive(Debug, Default, Deserialize)]
pub struct ClientFileConfig {
    /// Relay endpoint (`http://host:port/api/chat`)
    pub relay_url: Option<String>,

    /// Upstream endpoint for direct mode
    pub upstream_url: Option<String>,

    /// Call the upstream directly with the key from settings
    pub direct: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `WesleyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> WesleyConfigFile {
    config_file_path().map_or_else(WesleyConfigFile::default, |path| load_from(&path))
}

/// Load a config file from `path`, falling back to defaults
pub fn load_from(path: &Path) -> WesleyConfigFile {
    if !path.exists() {
        return WesleyConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                WesleyConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            WesleyConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/wesley/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("wesley").join("config.toml"))
}
