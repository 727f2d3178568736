//! Assistant persona: name, system preamble and the canned chat bubbles
//!
//! Every field may be overridden from the `[persona]` table of the config file.

use serde::{Deserialize, Serialize};

/// Identity and fixed texts of the assistant
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Persona {
    /// Display name
    pub name: String,

    /// System preamble prepended to every request; `None` sends no preamble
    pub system_prompt: Option<String>,

    /// Message seeded into a fresh or cleared conversation
    pub greeting: String,

    /// Bubble shown when a send fails
    pub apology: String,

    /// Bubble shown when a direct call has no API key configured
    pub missing_key_notice: String,
}

impl Persona {
    /// The default persona
    #[must_use]
    pub fn wesley() -> Self {
        Self {
            name: "Wesley".to_string(),
            system_prompt: Some(
                "You are Wesley, a cute and friendly AI companion. Be warm, engaging, and \
                 helpful. Keep responses concise and friendly. Use emojis occasionally to be \
                 cute and expressive."
                    .to_string(),
            ),
            greeting: "Hey there! 👋 I'm Wesley, your AI friend! I'm here to chat, answer \
                       questions, help with ideas, or just have a fun conversation. What's on \
                       your mind?"
                .to_string(),
            apology: "Sorry, I encountered an error. Please try again! 😅".to_string(),
            missing_key_notice: "Please add your API key in Settings to start chatting! 🔑"
                .to_string(),
        }
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::wesley()
    }
}
