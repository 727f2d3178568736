//! Voice adapter integration tests
//!
//! Speech capabilities are faked; nothing here needs audio hardware

use std::sync::Arc;

use wesley_chat::voice::{
    ListenState, RECOGNITION_LOCALE, RecognitionEvent, SPEECH_LOCALE, SpeakOutcome,
    SpeechSynthesizer, TranscriptSegment, UNSUPPORTED_NOTICE, Voice, VoiceOutput,
};
use wesley_chat::{ChatOrchestrator, Settings};

mod common;
use common::{FakeClient, FakeRecognizer, FakeSynthesizer, RecordingView, ViewEvent};

fn british_voices() -> Vec<Voice> {
    vec![
        Voice::new("Samantha", "en-US"),
        Voice::new("Serena", "en-GB"),
        Voice::new("Daniel", "en_GB"),
    ]
}

fn output_for(synth: &Arc<FakeSynthesizer>) -> VoiceOutput {
    let synth: Arc<dyn SpeechSynthesizer> = synth.clone();
    VoiceOutput::new(Some(synth))
}

#[test]
fn test_speak_twice_leaves_one_active() {
    let synth = FakeSynthesizer::with_voices(british_voices());
    let output = output_for(&synth);

    assert_eq!(output.speak("first", 1.0), SpeakOutcome::Spoken);
    assert_eq!(output.speak("second", 1.0), SpeakOutcome::Spoken);

    assert_eq!(synth.active(), 1);
    assert_eq!(synth.cancels(), 2);
    assert_eq!(synth.spoken().last().unwrap().text, "second");
}

#[test]
fn test_utterance_parameters() {
    let synth = FakeSynthesizer::with_voices(british_voices());
    let output = output_for(&synth);

    output.speak("Cheerio", 1.5);

    let utterance = synth.spoken().pop().unwrap();
    assert_eq!(utterance.lang, SPEECH_LOCALE);
    assert!((utterance.rate - 1.5).abs() < f32::EPSILON);
    assert!((utterance.pitch - 0.8).abs() < f32::EPSILON);
    assert!((utterance.volume - 1.0).abs() < f32::EPSILON);
    assert_eq!(utterance.voice.unwrap().name, "Daniel");
}

#[test]
fn test_deferred_speech_spoken_once() {
    let synth = FakeSynthesizer::loading();
    let output = output_for(&synth);

    assert_eq!(output.speak("waiting", 1.0), SpeakOutcome::Deferred);
    assert!(output.has_pending());
    assert!(synth.spoken().is_empty());

    synth.load_voices(british_voices());
    assert_eq!(output.on_voices_changed(), SpeakOutcome::Spoken);
    assert_eq!(output.on_voices_changed(), SpeakOutcome::Skipped);

    let spoken = synth.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "waiting");
    assert!(!output.has_pending());
}

#[test]
fn test_later_deferred_speech_replaces_earlier() {
    let synth = FakeSynthesizer::loading();
    let output = output_for(&synth);

    output.speak("old", 1.0);
    output.speak("new", 1.0);
    synth.load_voices(british_voices());
    output.on_voices_changed();

    let texts: Vec<_> = synth.spoken().into_iter().map(|u| u.text).collect();
    assert_eq!(texts, vec!["new".to_string()]);
}

#[test]
fn test_direct_speech_drops_pending() {
    let synth = FakeSynthesizer::loading();
    let output = output_for(&synth);

    output.speak("stale", 1.0);
    synth.load_voices(british_voices());
    assert_eq!(output.speak("fresh", 1.0), SpeakOutcome::Spoken);
    assert_eq!(output.on_voices_changed(), SpeakOutcome::Skipped);

    let texts: Vec<_> = synth.spoken().into_iter().map(|u| u.text).collect();
    assert_eq!(texts, vec!["fresh".to_string()]);
}

#[tokio::test]
async fn test_deferred_reply_through_orchestrator() {
    let synth = FakeSynthesizer::loading();
    let client = Arc::new(FakeClient::new().reply("late voice"));
    let chat = ChatOrchestrator::builder(client, RecordingView::new())
        .synthesizer(synth.clone())
        .build();

    chat.save_settings(Settings {
        voice_speed: 0.75,
        ..Settings::default()
    })
    .unwrap();
    chat.send_message("hello").await.unwrap();
    assert!(chat.voice_output().has_pending());

    synth.load_voices(british_voices());
    assert_eq!(chat.on_voices_changed(), SpeakOutcome::Spoken);

    let spoken = synth.spoken();
    assert_eq!(spoken.len(), 1);
    assert!((spoken[0].rate - 0.75).abs() < f32::EPSILON);
}

#[test]
fn test_voice_input_transitions() {
    let recognizer = FakeRecognizer::new();
    let view = RecordingView::new();
    let chat = ChatOrchestrator::builder(Arc::new(FakeClient::new()), view.clone())
        .recognizer(recognizer.clone())
        .build();

    chat.toggle_voice_input();
    let starts = recognizer.starts();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].locale, RECOGNITION_LOCALE);
    assert!(!starts[0].continuous);
    assert!(starts[0].interim_results);
    assert_eq!(view.last_input().as_deref(), Some(""));

    chat.on_recognition_event(RecognitionEvent::Start);
    assert_eq!(chat.listen_state(), ListenState::Listening);
    assert_eq!(view.statuses().last().unwrap(), "🎤 Listening...");

    chat.on_recognition_event(RecognitionEvent::Result(vec![TranscriptSegment::interim(
        "what's the",
    )]));
    assert_eq!(view.statuses().last().unwrap(), "🎤 what's the");
    assert_eq!(view.last_input().as_deref(), Some(""));

    chat.on_recognition_event(RecognitionEvent::Result(vec![TranscriptSegment::final_text(
        " what's the weather ",
    )]));
    assert_eq!(view.last_input().as_deref(), Some("what's the weather"));
    assert_eq!(view.statuses().last().unwrap(), "✓ Got it!");

    chat.toggle_voice_input();
    assert_eq!(recognizer.stops(), 1);

    // No runtime: the status clears immediately instead of after the delay
    chat.on_recognition_event(RecognitionEvent::End);
    assert_eq!(chat.listen_state(), ListenState::Idle);
    assert_eq!(view.statuses().last().unwrap(), "");
    assert!(view.events().contains(&ViewEvent::Listening(true)));
    assert_eq!(
        view.events()
            .iter()
            .rev()
            .find(|e| matches!(e, ViewEvent::Listening(_))),
        Some(&ViewEvent::Listening(false))
    );
}

#[test]
fn test_recognition_error_shown() {
    let view = RecordingView::new();
    let chat = ChatOrchestrator::builder(Arc::new(FakeClient::new()), view.clone())
        .recognizer(FakeRecognizer::new())
        .build();

    chat.toggle_voice_input();
    chat.on_recognition_event(RecognitionEvent::Start);
    chat.on_recognition_event(RecognitionEvent::Error("no-speech".into()));

    assert_eq!(view.statuses().last().unwrap(), "❌ Error: no-speech");
    assert_eq!(chat.listen_state(), ListenState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_status_clears_after_delay() {
    let view = RecordingView::new();
    let chat = ChatOrchestrator::builder(Arc::new(FakeClient::new()), view.clone())
        .recognizer(FakeRecognizer::new())
        .build();

    chat.toggle_voice_input();
    chat.on_recognition_event(RecognitionEvent::Start);
    chat.on_recognition_event(RecognitionEvent::End);
    assert_eq!(view.statuses().last().unwrap(), "🎤 Listening...");

    tokio::time::sleep(std::time::Duration::from_millis(1600)).await;
    assert_eq!(view.statuses().last().unwrap(), "");
}

#[test]
fn test_missing_recognizer_gives_notice() {
    let view = RecordingView::new();
    let chat = ChatOrchestrator::builder(Arc::new(FakeClient::new()), view.clone()).build();

    chat.toggle_voice_input();

    assert_eq!(view.notices(), vec![UNSUPPORTED_NOTICE.to_string()]);
    assert_eq!(chat.listen_state(), ListenState::Idle);
}

#[test]
fn test_missing_synthesizer_skips() {
    let output = VoiceOutput::new(None);
    assert!(!output.is_available());
    assert_eq!(output.speak("anything", 1.0), SpeakOutcome::Skipped);
    assert_eq!(output.on_voices_changed(), SpeakOutcome::Skipped);
}
