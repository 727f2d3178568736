//! Terminal front-end for the chat orchestrator
//!
//! Renders bubbles to stdout and reads input lines from stdin. Slash commands
//! stand in for the buttons and settings dialog of a graphical client.

use std::io::Write;
use std::sync::Arc;

use dialoguer::{Confirm, Input};

use crate::Error;
use crate::conversation::{Message, Sender};
use crate::orchestrator::{ChatOrchestrator, ChatView};
use crate::settings::Settings;

const HELP: &str = "\
Commands:
  /clear      clear the conversation
  /settings   edit voice, API key and model settings
  /mic        toggle voice input
  /help       show this help
  /quit       exit";

/// A [`ChatView`] on stdout
pub struct TerminalView {
    assistant_name: String,
}

impl TerminalView {
    #[must_use]
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
        }
    }

    fn print(line: &str) {
        let mut stdout = std::io::stdout().lock();
        // Broken pipes are not worth failing the session for
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

impl ChatView for TerminalView {
    fn render_message(&self, message: &Message) {
        let who = match message.sender {
            Sender::User => "You",
            Sender::Assistant => self.assistant_name.as_str(),
        };
        Self::print(&format!("[{}] {who}: {}", message.display_time(), message.text));
    }

    fn clear_messages(&self) {
        Self::print("──────── conversation cleared ────────");
    }

    fn set_typing(&self, visible: bool) {
        if visible {
            Self::print(&format!("{} is typing...", self.assistant_name));
        }
    }

    fn set_input(&self, text: &str) {
        if !text.is_empty() {
            Self::print(&format!("> {text}"));
        }
    }

    fn set_voice_status(&self, status: &str) {
        if !status.is_empty() {
            Self::print(status);
        }
    }

    fn notify(&self, notice: &str) {
        Self::print(&format!("[!] {notice}"));
    }
}

/// Run the interactive chat loop until `/quit` or end of input
///
/// # Errors
///
/// Returns error if stdin cannot be read
pub async fn run(orchestrator: Arc<ChatOrchestrator>) -> anyhow::Result<()> {
    println!("{HELP}\n");

    loop {
        let Some(line) = read_line().await? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/clear" => {
                if confirm("Are you sure you want to clear the chat? 🗑️").await? {
                    orchestrator.clear_conversation();
                }
            }
            "/mic" => orchestrator.toggle_voice_input(),
            "/settings" => {
                let current = orchestrator.settings();
                let updated = tokio::task::spawn_blocking(move || edit_settings(current)).await??;
                if let Err(e) = orchestrator.save_settings(updated) {
                    tracing::error!(error = %e, "failed to save settings");
                    println!("[!] Could not save settings: {e}");
                }
            }
            text => match orchestrator.send_message(text).await {
                Ok(_) | Err(Error::Busy) => {}
                // Already shown as a chat bubble
                Err(e) => tracing::debug!(error = %e, "send finished with error"),
            },
        }
    }

    Ok(())
}

/// Read one line from stdin; `None` at end of input
async fn read_line() -> anyhow::Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|n| (n > 0).then_some(line))
    })
    .await??;
    Ok(line)
}

async fn confirm(prompt: &'static str) -> anyhow::Result<bool> {
    let answer = tokio::task::spawn_blocking(move || {
        Confirm::new().with_prompt(prompt).default(false).interact()
    })
    .await??;
    Ok(answer)
}

/// Interactive settings dialog
fn edit_settings(current: Settings) -> anyhow::Result<Settings> {
    let voice_enabled = Confirm::new()
        .with_prompt("Read replies aloud?")
        .default(current.voice_enabled)
        .interact()?;

    let voice_speed: f32 = Input::new()
        .with_prompt("Voice speed (0.5 - 2.0)")
        .default(current.voice_speed)
        .validate_with(|speed: &f32| -> Result<(), &str> {
            if (0.5..=2.0).contains(speed) {
                Ok(())
            } else {
                Err("speed must be between 0.5 and 2.0")
            }
        })
        .interact_text()?;

    let api_key: String = Input::new()
        .with_prompt("API key (direct mode only, empty to clear)")
        .allow_empty(true)
        .default(current.api_key.clone().unwrap_or_default())
        .show_default(false)
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Model (empty for default)")
        .allow_empty(true)
        .default(current.model.clone().unwrap_or_default())
        .interact_text()?;

    Ok(Settings {
        voice_enabled,
        voice_speed,
        api_key: Some(api_key).filter(|k| !k.trim().is_empty()),
        model: Some(model).filter(|m| !m.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::completion::{Endpoint, HttpCompletionClient};

    use super::*;

    #[test]
    fn terminal_view_drives_orchestrator() {
        let view = Arc::new(TerminalView::new("Wesley"));
        let client = Arc::new(HttpCompletionClient::new(Endpoint::relay(
            "http://127.0.0.1:9/api/chat",
        )));
        let orchestrator = ChatOrchestrator::builder(client, view).build();

        orchestrator.clear_conversation();
        orchestrator.toggle_voice_input();

        assert_eq!(orchestrator.history().len(), 1);
    }
}
