//! Voice input and output adapters
//!
//! Speech recognition and synthesis are platform capabilities behind traits;
//! the adapters here own the state and selection policy around them.

mod input;
mod output;

pub use input::{
    ListenState, RECOGNITION_LOCALE, RecognitionEvent, RecognitionOptions, STATUS_CLEAR_DELAY,
    SpeechRecognizer, TranscriptSegment, UNSUPPORTED_NOTICE, VoiceEffect, VoiceInput,
};
pub use output::{
    SPEECH_LOCALE, SpeakOutcome, SpeechSynthesizer, Utterance, VOICE_NAME_HINTS, Voice,
    VoiceOutput, select_voice,
};
