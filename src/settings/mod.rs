//! User settings and their persistence
//!
//! Settings live as one JSON blob under a fixed key in a [`KvStore`].

mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use store::{DbPool, KvStore, MemoryKvStore, SqliteKvStore};

use crate::Result;

/// Key the settings blob is stored under
pub const SETTINGS_KEY: &str = "wesleySettings";

/// Slowest speech rate accepted
pub const MIN_VOICE_SPEED: f32 = 0.5;

/// Fastest speech rate accepted
pub const MAX_VOICE_SPEED: f32 = 2.0;

/// User-editable settings
///
/// No credential is ever shipped as a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Read replies aloud
    pub voice_enabled: bool,

    /// Speech rate multiplier
    pub voice_speed: f32,

    /// API key for direct upstream calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier for direct upstream calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice_enabled: true,
            voice_speed: 1.0,
            api_key: None,
            model: None,
        }
    }
}

impl Settings {
    /// Configured API key, if non-blank
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Configured model, if non-blank
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Speech rate clamped to the supported range
    #[must_use]
    pub fn voice_rate(&self) -> f32 {
        if self.voice_speed.is_finite() {
            self.voice_speed.clamp(MIN_VOICE_SPEED, MAX_VOICE_SPEED)
        } else {
            1.0
        }
    }
}

/// Loads and saves [`Settings`] in a key-value slot
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KvStore>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Store backed by process memory only
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    /// Load settings, substituting defaults when absent or unreadable
    #[must_use]
    pub fn load(&self) -> Settings {
        let blob = match self.kv.get(SETTINGS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Settings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read settings, using defaults");
                return Settings::default();
            }
        };

        match serde_json::from_str(&blob) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "stored settings are corrupt, using defaults");
                Settings::default()
            }
        }
    }

    /// Persist settings
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let blob = serde_json::to_string(settings)?;
        self.kv.set(SETTINGS_KEY, &blob)?;
        tracing::debug!(
            voice_enabled = settings.voice_enabled,
            voice_speed = settings.voice_speed,
            has_api_key = settings.api_key().is_some(),
            "settings saved"
        );
        Ok(())
    }
}
