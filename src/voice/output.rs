//! Text-to-speech output with voice selection

use std::sync::{Arc, Mutex, PoisonError};

use crate::Result;

/// Locale replies are spoken in
pub const SPEECH_LOCALE: &str = "en-GB";

/// Name fragments preferred when picking a voice
pub const VOICE_NAME_HINTS: &[&str] = &["male", "boy", "daniel", "george"];

/// Pitch applied to every utterance
pub const SPEECH_PITCH: f32 = 0.8;

/// Volume applied to every utterance
pub const SPEECH_VOLUME: f32 = 1.0;

/// A voice offered by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP-47-ish tag as reported by the platform (`en-GB`, `en_GB`, ...)
    pub locale: String,
}

impl Voice {
    #[must_use]
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }
}

/// A single unit of synthesized speech
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub lang: String,
    /// `None` leaves the platform default voice in place
    pub voice: Option<Voice>,
}

/// A speech synthesis capability
pub trait SpeechSynthesizer: Send + Sync {
    /// Voices currently known; may be empty until the platform loads them
    fn voices(&self) -> Vec<Voice>;

    /// Start speaking
    ///
    /// # Errors
    ///
    /// Returns error if the utterance cannot be queued
    fn speak(&self, utterance: Utterance) -> Result<()>;

    /// Stop the current utterance, if any
    fn cancel(&self);
}

/// Result of a speak request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Handed to the synthesizer
    Spoken,
    /// Waiting for the voice list to load
    Deferred,
    /// No synthesizer, or it rejected the utterance
    Skipped,
}

/// Voice output adapter
///
/// At most one utterance is active: every new one cancels the previous.
pub struct VoiceOutput {
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    locale: String,
    pending: Mutex<Option<Utterance>>,
}

impl VoiceOutput {
    /// Create an adapter; `None` means the runtime cannot synthesize speech
    #[must_use]
    pub fn new(synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self {
            synthesizer,
            locale: SPEECH_LOCALE.to_string(),
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Whether an utterance is waiting on the voice list
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Speak `text` at `rate`, preempting anything already speaking
    pub fn speak(&self, text: &str, rate: f32) -> SpeakOutcome {
        let Some(synthesizer) = &self.synthesizer else {
            tracing::debug!("speech synthesis unavailable, skipping");
            return SpeakOutcome::Skipped;
        };

        synthesizer.cancel();

        let utterance = Utterance {
            text: text.to_string(),
            rate,
            pitch: SPEECH_PITCH,
            volume: SPEECH_VOLUME,
            lang: self.locale.clone(),
            voice: None,
        };

        let voices = synthesizer.voices();
        if voices.is_empty() {
            tracing::debug!("voice list not loaded yet, deferring utterance");
            *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(utterance);
            return SpeakOutcome::Deferred;
        }

        // A direct speak supersedes anything still waiting on the voice list
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.dispatch(synthesizer.as_ref(), utterance, &voices)
    }

    /// The platform voice list changed; speak the deferred utterance, once
    pub fn on_voices_changed(&self) -> SpeakOutcome {
        let Some(synthesizer) = &self.synthesizer else {
            return SpeakOutcome::Skipped;
        };
        let Some(utterance) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return SpeakOutcome::Skipped;
        };

        let voices = synthesizer.voices();
        self.dispatch(synthesizer.as_ref(), utterance, &voices)
    }

    fn dispatch(
        &self,
        synthesizer: &dyn SpeechSynthesizer,
        mut utterance: Utterance,
        voices: &[Voice],
    ) -> SpeakOutcome {
        utterance.voice = select_voice(voices, &self.locale, VOICE_NAME_HINTS).cloned();
        tracing::debug!(
            voice = utterance.voice.as_ref().map_or("(default)", |v| v.name.as_str()),
            rate = utterance.rate,
            chars = utterance.text.len(),
            "speaking"
        );

        match synthesizer.speak(utterance) {
            Ok(()) => SpeakOutcome::Spoken,
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed");
                SpeakOutcome::Skipped
            }
        }
    }
}

/// Pick a voice for `locale`
///
/// Priority: locale match with a hinted name, then any locale match, then the
/// first voice of any locale, then none.
#[must_use]
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str, hints: &[&str]) -> Option<&'a Voice> {
    let in_locale = || voices.iter().filter(|v| locale_matches(&v.locale, locale));

    in_locale()
        .find(|v| name_matches(&v.name, hints))
        .or_else(|| in_locale().next())
        .or_else(|| voices.first())
}

/// `en_GB`, `en-gb` and `en-GB` all match `en-GB`
fn locale_matches(voice_locale: &str, target: &str) -> bool {
    let normalize = |s: &str| s.replace('_', "-").to_ascii_lowercase();
    normalize(voice_locale).contains(&normalize(target))
}

/// Whole-word, case-insensitive match so "Female" does not count as "male"
fn name_matches(name: &str, hints: &[&str]) -> bool {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| hints.iter().any(|hint| word.eq_ignore_ascii_case(hint)))
}
