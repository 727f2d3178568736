//! Speech-to-text input state machine
//!
//! The recognizer itself is a capability supplied by the front-end. This
//! module turns its start/result/error/end callbacks into explicit state
//! transitions and a list of [`VoiceEffect`]s for the view to apply.

use std::sync::Arc;
use std::time::Duration;

use crate::Result;

/// Locale recognition is bound to
pub const RECOGNITION_LOCALE: &str = "en-US";

/// How long the status line lingers after recognition ends
pub const STATUS_CLEAR_DELAY: Duration = Duration::from_millis(1500);

/// Notice shown when the runtime has no speech recognition
pub const UNSUPPORTED_NOTICE: &str =
    "Speech Recognition is not supported in your browser. Please use Chrome, Edge, or Safari.";

/// Recognition session options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// Keep listening after the first final result
    pub continuous: bool,
    /// Deliver partial transcripts while the user speaks
    pub interim_results: bool,
    pub locale: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            continuous: false,
            interim_results: true,
            locale: RECOGNITION_LOCALE.to_string(),
        }
    }
}

/// A speech recognition capability
pub trait SpeechRecognizer: Send + Sync {
    /// Begin a recognition session; events arrive via [`VoiceInput::handle`]
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be started
    fn start(&self, options: &RecognitionOptions) -> Result<()>;

    /// End the current session; an `End` event follows
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be stopped
    fn stop(&self) -> Result<()>;
}

/// Listening state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    Idle,
    Listening,
}

/// One transcript alternative from a recognition result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptSegment {
    #[must_use]
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    #[must_use]
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Event reported by the recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Start,
    Result(Vec<TranscriptSegment>),
    Error(String),
    End,
}

/// Change the view should make in response to a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEffect {
    /// Replace the voice status line
    SetStatus(String),
    /// Replace the input field contents
    SetInput(String),
    /// Toggle the listening indicator
    SetListening(bool),
    /// Clear the status line once the delay has passed
    ClearStatusAfter(Duration),
    /// Show a blocking notice
    Notice(String),
}

/// Voice input adapter
pub struct VoiceInput {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    options: RecognitionOptions,
    state: ListenState,
}

impl VoiceInput {
    /// Create an adapter; `None` means the runtime has no recognizer
    #[must_use]
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            options: RecognitionOptions::default(),
            state: ListenState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ListenState {
        self.state
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    #[must_use]
    pub const fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    /// Start listening when idle, stop when listening
    pub fn toggle(&mut self) -> Vec<VoiceEffect> {
        let Some(recognizer) = &self.recognizer else {
            tracing::warn!("speech recognition unavailable");
            return vec![VoiceEffect::Notice(UNSUPPORTED_NOTICE.to_string())];
        };

        match self.state {
            ListenState::Listening => {
                tracing::debug!("stopping speech recognition");
                match recognizer.stop() {
                    Ok(()) => Vec::new(),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to stop speech recognition");
                        vec![VoiceEffect::SetStatus(format!("❌ Error: {e}"))]
                    }
                }
            }
            ListenState::Idle => {
                tracing::debug!(locale = %self.options.locale, "starting speech recognition");
                let mut effects = vec![
                    VoiceEffect::SetInput(String::new()),
                    VoiceEffect::SetStatus(String::new()),
                ];
                if let Err(e) = recognizer.start(&self.options) {
                    tracing::warn!(error = %e, "failed to start speech recognition");
                    effects.push(VoiceEffect::SetStatus(format!("❌ Error: {e}")));
                }
                effects
            }
        }
    }

    /// Apply a recognizer event
    pub fn handle(&mut self, event: RecognitionEvent) -> Vec<VoiceEffect> {
        match event {
            RecognitionEvent::Start => {
                self.state = ListenState::Listening;
                vec![
                    VoiceEffect::SetListening(true),
                    VoiceEffect::SetStatus("🎤 Listening...".to_string()),
                ]
            }
            RecognitionEvent::Result(segments) => Self::on_result(&segments),
            RecognitionEvent::Error(code) => {
                tracing::warn!(%code, "speech recognition error");
                vec![VoiceEffect::SetStatus(format!("❌ Error: {code}"))]
            }
            RecognitionEvent::End => {
                self.state = ListenState::Idle;
                vec![
                    VoiceEffect::SetListening(false),
                    VoiceEffect::ClearStatusAfter(STATUS_CLEAR_DELAY),
                ]
            }
        }
    }

    fn on_result(segments: &[TranscriptSegment]) -> Vec<VoiceEffect> {
        let mut final_text = String::new();
        let mut interim_text = String::new();
        let mut has_final = false;

        for segment in segments {
            if segment.is_final {
                has_final = true;
                final_text.push_str(&segment.text);
                final_text.push(' ');
            } else {
                interim_text.push_str(&segment.text);
            }
        }

        // Any final segment settles the input, even a blank one
        let final_text = final_text.trim();
        if has_final {
            tracing::debug!(transcript = final_text, "final transcript");
            vec![
                VoiceEffect::SetInput(final_text.to_string()),
                VoiceEffect::SetStatus("✓ Got it!".to_string()),
            ]
        } else if !interim_text.is_empty() {
            vec![VoiceEffect::SetStatus(format!("🎤 {interim_text}"))]
        } else {
            Vec::new()
        }
    }
}
