//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use wesley_chat::completion::{CompletionClient, CompletionRequest};
use wesley_chat::conversation::{Message, Sender};
use wesley_chat::orchestrator::ChatView;
use wesley_chat::voice::{RecognitionOptions, SpeechRecognizer, SpeechSynthesizer, Utterance, Voice};
use wesley_chat::{Error, Result};

/// A successful completion body with `reply` as the first choice
pub fn completion_body(reply: &str) -> String {
    serde_json::json!({
        "id": "gen-test",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": reply } }]
    })
    .to_string()
}

/// One request seen by a [`FakeUpstream`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub body: serde_json::Value,
    pub authorization: Option<String>,
    pub title: Option<String>,
    pub referer: Option<String>,
}

struct UpstreamState {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A completion endpoint on a random local port answering with a fixed reply
pub struct FakeUpstream {
    pub url: String,
    state: Arc<UpstreamState>,
}

impl FakeUpstream {
    /// Answer every request with `status` and `body`
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    /// Answer `200` with a completion containing `reply`
    pub async fn replying(reply: &str) -> Self {
        Self::start(200, completion_body(reply)).await
    }

    pub async fn start_with_delay(status: u16, body: impl Into<String>, delay: Duration) -> Self {
        let state = Arc::new(UpstreamState {
            status: StatusCode::from_u16(status).expect("valid status"),
            body: body.into(),
            delay,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(respond))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake upstream");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake upstream");
        });

        Self {
            url: format!("http://{addr}/v1/chat/completions"),
            state,
        }
    }

    pub fn hits(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The single request received; panics unless exactly one arrived
    pub fn only_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one upstream request");
        requests.into_iter().next().unwrap()
    }
}

async fn respond(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    state.requests.lock().unwrap().push(RecordedRequest {
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
        authorization: header_str("authorization"),
        title: header_str("x-title"),
        referer: header_str("http-referer"),
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
        .into_response()
}

/// Something the orchestrator asked the view to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Rendered(Sender, String),
    Cleared,
    Typing(bool),
    Input(String),
    Status(String),
    Listening(bool),
    Notice(String),
}

/// A [`ChatView`] that records every call
#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn rendered(&self) -> Vec<(Sender, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Rendered(sender, text) => Some((sender, text)),
                _ => None,
            })
            .collect()
    }

    pub fn typing(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Typing(visible) => Some(visible),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn last_input(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::Input(text) => Some(text),
            _ => None,
        })
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ChatView for RecordingView {
    fn render_message(&self, message: &Message) {
        self.push(ViewEvent::Rendered(message.sender, message.text.clone()));
    }

    fn clear_messages(&self) {
        self.push(ViewEvent::Cleared);
    }

    fn set_typing(&self, visible: bool) {
        self.push(ViewEvent::Typing(visible));
    }

    fn set_input(&self, text: &str) {
        self.push(ViewEvent::Input(text.to_string()));
    }

    fn set_voice_status(&self, status: &str) {
        self.push(ViewEvent::Status(status.to_string()));
    }

    fn set_listening(&self, listening: bool) {
        self.push(ViewEvent::Listening(listening));
    }

    fn notify(&self, notice: &str) {
        self.push(ViewEvent::Notice(notice.to_string()));
    }
}

/// A scripted [`CompletionClient`]
///
/// Replies are taken from the queue in order; an empty queue replies `"ok"`.
#[derive(Default)]
pub struct FakeClient {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<(CompletionRequest, Option<String>)>>,
    calls: AtomicUsize,
    requires_key: bool,
    gate: Option<Arc<Notify>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like a direct client that needs an API key
    pub fn requiring_key() -> Self {
        Self {
            requires_key: true,
            ..Self::default()
        }
    }

    /// Hold every call until `gate` is notified
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: Error) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(CompletionRequest, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for FakeClient {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn requires_api_key(&self) -> bool {
        self.requires_key
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        api_key: Option<&str>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), api_key.map(ToString::to_string)));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok("ok".to_string()))
    }
}

/// A [`SpeechSynthesizer`] that records utterances and tracks what is speaking
#[derive(Default)]
pub struct FakeSynthesizer {
    voices: Mutex<Vec<Voice>>,
    spoken: Mutex<Vec<Utterance>>,
    cancels: AtomicUsize,
    active: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn with_voices(voices: Vec<Voice>) -> Arc<Self> {
        Arc::new(Self {
            voices: Mutex::new(voices),
            ..Self::default()
        })
    }

    /// A synthesizer whose voice list has not loaded yet
    pub fn loading() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn load_voices(&self, voices: Vec<Voice>) {
        *self.voices.lock().unwrap() = voices;
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Utterances currently speaking
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        self.voices.lock().unwrap().clone()
    }

    fn speak(&self, utterance: Utterance) -> Result<()> {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.spoken.lock().unwrap().push(utterance);
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.active.store(0, Ordering::SeqCst);
    }
}

/// A [`SpeechRecognizer`] that counts start/stop calls
#[derive(Default)]
pub struct FakeRecognizer {
    starts: Mutex<Vec<RecognitionOptions>>,
    stops: AtomicUsize,
}

impl FakeRecognizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn starts(&self) -> Vec<RecognitionOptions> {
        self.starts.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&self, options: &RecognitionOptions) -> Result<()> {
        self.starts.lock().unwrap().push(options.clone());
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
