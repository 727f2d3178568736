//! Error types for the Wesley chat client and relay

use thiserror::Error;

use crate::persona::Persona;

/// Result type alias for Wesley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the chat client or relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No API key configured for a direct upstream call
    #[error("no API key configured")]
    MissingCredential,

    /// A send was attempted while another is awaiting its reply
    #[error("a message is already awaiting a response")]
    Busy,

    /// Completion endpoint answered with a non-2xx status
    #[error("upstream returned {status}")]
    Upstream {
        status: u16,
        /// Error text extracted from the response body, if it had a known shape
        message: Option<String>,
    },

    /// 2xx response without `choices[0].message.content`
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// Speech capability error
    #[error("voice error: {0}")]
    Voice(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Chat-bubble text shown to the user when a send fails with this error
    #[must_use]
    pub fn user_message(&self, persona: &Persona) -> String {
        match self {
            Self::MissingCredential => persona.missing_key_notice.clone(),
            Self::Upstream {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => format!("{} ({message})", persona.apology),
            _ => persona.apology.clone(),
        }
    }

    /// Whether this error was detected before any network call was issued
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::Config(_))
    }
}
