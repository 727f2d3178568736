//! Chat orchestration
//!
//! [`ChatOrchestrator`] owns the conversation and settings for one session and
//! coordinates the completion call, the view and the voice adapters.
//!
//! ```text
//!   input ──► Idle ──send──► AwaitingResponse ──reply/error──► Idle
//!                                  │
//!                           one completion call
//! ```
//!
//! Voice input runs its own `Idle ↔ Listening` machine alongside.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::completion::{CompletionClient, CompletionRequest};
use crate::conversation::{ConversationHistory, Message, Sender, build_payload};
use crate::persona::Persona;
use crate::settings::{Settings, SettingsStore};
use crate::voice::{
    ListenState, RecognitionEvent, SpeakOutcome, SpeechRecognizer, SpeechSynthesizer,
    VoiceEffect, VoiceInput, VoiceOutput,
};
use crate::{Error, Result};

/// Notice shown after settings are saved
pub const SETTINGS_SAVED_NOTICE: &str = "Settings saved! ✓";

/// Chat request state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingResponse,
}

/// The UI surface the orchestrator drives
///
/// Implementations render; they never call back into the orchestrator from
/// these methods.
pub trait ChatView: Send + Sync {
    /// Show a message bubble
    fn render_message(&self, message: &Message);

    /// Remove every rendered message
    fn clear_messages(&self);

    /// Show or hide the typing indicator
    fn set_typing(&self, visible: bool);

    /// Replace the input field contents
    fn set_input(&self, text: &str);

    /// Replace the voice status line
    fn set_voice_status(&self, status: &str);

    /// Show or hide the listening indicator
    fn set_listening(&self, _listening: bool) {}

    /// Show a blocking notice
    fn notify(&self, notice: &str);
}

struct Session {
    state: ChatState,
    history: ConversationHistory,
    settings: Settings,
    voice_input: VoiceInput,
}

/// Central coordinator for one chat session
pub struct ChatOrchestrator {
    client: Arc<dyn CompletionClient>,
    view: Arc<dyn ChatView>,
    settings_store: SettingsStore,
    persona: Persona,
    voice_output: VoiceOutput,
    session: Mutex<Session>,
}

impl ChatOrchestrator {
    /// Start building an orchestrator
    #[must_use]
    pub fn builder(
        client: Arc<dyn CompletionClient>,
        view: Arc<dyn ChatView>,
    ) -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder {
            client,
            view,
            settings_store: None,
            persona: Persona::default(),
            recognizer: None,
            synthesizer: None,
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a user message and wait for the reply
    ///
    /// Blank input is ignored (`Ok(None)`). Otherwise the user message and
    /// exactly one reply or apology are appended to the history.
    ///
    /// # Errors
    ///
    /// Returns `Busy` without touching state if a send is already awaiting its
    /// reply. Returns `MissingCredential` before any network call when a direct
    /// client has no API key, and the completion error when the call fails; in
    /// both cases an apology has already been appended and rendered. Dropping
    /// the future before it settles also appends the apology and returns to `Idle`.
    pub async fn send_message(&self, input: &str) -> Result<Option<Message>> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let (request, api_key, user_message) = {
            let mut session = self.session();
            if session.state == ChatState::AwaitingResponse {
                tracing::debug!("send rejected, reply still pending");
                return Err(Error::Busy);
            }

            let messages =
                build_payload(self.persona.system_prompt.as_deref(), &session.history, text);
            let request = CompletionRequest::new(messages)
                .model(session.settings.model().map(ToString::to_string));
            let api_key = session.settings.api_key().map(ToString::to_string);

            session.state = ChatState::AwaitingResponse;
            let user_message = session.history.append(Sender::User, text);
            (request, api_key, user_message)
        };

        let pending = PendingSend::new(self);
        self.view.render_message(&user_message);
        self.view.set_input("");

        if self.client.requires_api_key() && api_key.is_none() {
            tracing::warn!(client = self.client.name(), "no API key configured");
            pending.settle();
            return Err(self.fail(Error::MissingCredential));
        }

        self.view.set_typing(true);
        tracing::info!(
            client = self.client.name(),
            messages = request.messages.len(),
            "requesting completion"
        );
        let outcome = self.client.complete(&request, api_key.as_deref()).await;
        pending.settle();
        self.view.set_typing(false);

        match outcome {
            Ok(reply) => Ok(Some(self.succeed(reply))),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn succeed(&self, reply: String) -> Message {
        let (message, speech_rate) = {
            let mut session = self.session();
            session.state = ChatState::Idle;
            let message = session.history.append(Sender::Assistant, reply);
            let rate = session
                .settings
                .voice_enabled
                .then(|| session.settings.voice_rate());
            (message, rate)
        };

        tracing::info!(chars = message.text.len(), "reply received");
        self.view.render_message(&message);

        if let Some(rate) = speech_rate {
            self.voice_output.speak(&message.text, rate);
        }
        message
    }

    fn fail(&self, error: Error) -> Error {
        tracing::error!(error = %error, "send failed");

        let apology = error.user_message(&self.persona);
        let message = {
            let mut session = self.session();
            session.state = ChatState::Idle;
            session.history.append(Sender::Assistant, apology)
        };
        self.view.render_message(&message);
        error
    }

    /// Reset the conversation to a single greeting
    pub fn clear_conversation(&self) {
        let greeting = {
            let mut session = self.session();
            session.history.clear();
            session
                .history
                .append(Sender::Assistant, self.persona.greeting.clone())
        };

        tracing::info!("conversation cleared");
        self.view.clear_messages();
        self.view.render_message(&greeting);
    }

    /// Current settings
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.session().settings.clone()
    }

    /// Persist and apply new settings
    ///
    /// # Errors
    ///
    /// Returns error if the settings store cannot be written; the in-memory
    /// settings are left unchanged in that case
    pub fn save_settings(&self, settings: Settings) -> Result<()> {
        self.settings_store.save(&settings)?;
        self.session().settings = settings;
        self.view.notify(SETTINGS_SAVED_NOTICE);
        Ok(())
    }

    /// Start or stop voice input
    pub fn toggle_voice_input(&self) {
        let effects = self.session().voice_input.toggle();
        self.apply_voice_effects(effects);
    }

    /// Feed a recognizer event into the voice input state machine
    pub fn on_recognition_event(&self, event: RecognitionEvent) {
        let effects = self.session().voice_input.handle(event);
        self.apply_voice_effects(effects);
    }

    /// The synthesizer's voice list changed
    pub fn on_voices_changed(&self) -> SpeakOutcome {
        self.voice_output.on_voices_changed()
    }

    fn apply_voice_effects(&self, effects: Vec<VoiceEffect>) {
        for effect in effects {
            match effect {
                VoiceEffect::SetStatus(status) => self.view.set_voice_status(&status),
                VoiceEffect::SetInput(text) => self.view.set_input(&text),
                VoiceEffect::SetListening(listening) => self.view.set_listening(listening),
                VoiceEffect::Notice(notice) => self.view.notify(&notice),
                VoiceEffect::ClearStatusAfter(delay) => {
                    let view = self.view.clone();
                    match tokio::runtime::Handle::try_current() {
                        Ok(handle) => {
                            handle.spawn(async move {
                                tokio::time::sleep(delay).await;
                                view.set_voice_status("");
                            });
                        }
                        Err(_) => view.set_voice_status(""),
                    }
                }
            }
        }
    }

    /// Snapshot of the conversation
    #[must_use]
    pub fn history(&self) -> Vec<Message> {
        self.session().history.messages().to_vec()
    }

    #[must_use]
    pub fn state(&self) -> ChatState {
        self.session().state
    }

    #[must_use]
    pub fn listen_state(&self) -> ListenState {
        self.session().voice_input.state()
    }

    #[must_use]
    pub const fn persona(&self) -> &Persona {
        &self.persona
    }

    #[must_use]
    pub const fn voice_output(&self) -> &VoiceOutput {
        &self.voice_output
    }
}

/// Returns the session to `Idle` with an apology if a send future is dropped
/// (timeout, `select!`, aborted task) before its reply settles
struct PendingSend<'a> {
    orchestrator: &'a ChatOrchestrator,
    settled: bool,
}

impl<'a> PendingSend<'a> {
    const fn new(orchestrator: &'a ChatOrchestrator) -> Self {
        Self {
            orchestrator,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let orchestrator = self.orchestrator;
        tracing::warn!("send dropped before a reply arrived");
        orchestrator.view.set_typing(false);

        let message = {
            let mut session = orchestrator.session();
            session.state = ChatState::Idle;
            session
                .history
                .append(Sender::Assistant, orchestrator.persona.apology.clone())
        };
        orchestrator.view.render_message(&message);
    }
}

/// Builder for [`ChatOrchestrator`]
pub struct ChatOrchestratorBuilder {
    client: Arc<dyn CompletionClient>,
    view: Arc<dyn ChatView>,
    settings_store: Option<SettingsStore>,
    persona: Persona,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl ChatOrchestratorBuilder {
    /// Where settings are loaded from and saved to (default: in-memory)
    #[must_use]
    pub fn settings_store(mut self, store: SettingsStore) -> Self {
        self.settings_store = Some(store);
        self
    }

    #[must_use]
    pub fn persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// Speech recognition capability; omit when the runtime has none
    #[must_use]
    pub fn recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Speech synthesis capability; omit when the runtime has none
    #[must_use]
    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Load settings, seed the greeting and render it
    #[must_use]
    pub fn build(self) -> ChatOrchestrator {
        let settings_store = self.settings_store.unwrap_or_else(SettingsStore::in_memory);
        let settings = settings_store.load();

        let mut history = ConversationHistory::new();
        let greeting = history.append(Sender::Assistant, self.persona.greeting.clone());

        tracing::debug!(
            persona = %self.persona.name,
            client = self.client.name(),
            voice_enabled = settings.voice_enabled,
            recognizer = self.recognizer.is_some(),
            synthesizer = self.synthesizer.is_some(),
            "chat session ready"
        );

        let orchestrator = ChatOrchestrator {
            client: self.client,
            view: self.view,
            settings_store,
            persona: self.persona,
            voice_output: VoiceOutput::new(self.synthesizer),
            session: Mutex::new(Session {
                state: ChatState::Idle,
                history,
                settings,
                voice_input: VoiceInput::new(self.recognizer),
            }),
        };
        orchestrator.view.render_message(&greeting);
        orchestrator
    }
}
