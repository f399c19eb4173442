//! Mock model backend for integration tests
//!
//! Speaks just enough of the `OpenAI` chat, text-completion and Gemini
//! protocols to return predictable answers, and records every request it
//! receives so tests can assert on what the gateway sent upstream.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// One request as the mock saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<Recorded>>,
    /// Status returned instead of an answer, if set
    fail_with: Option<u16>,
    /// Pause before answering
    delay: Duration,
    /// Interleave malformed events into chat streams
    noisy: bool,
}

impl MockState {
    fn record(&self, path: String, headers: &HeaderMap, query: HashMap<String, String>, body: &Value) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        self.requests.lock().unwrap().push(Recorded {
            path,
            authorization,
            query,
            body: body.clone(),
        });
    }

    async fn gate(&self) -> Option<Response> {
        tokio::time::sleep(self.delay).await;

        self.fail_with.map(|status| {
            let status = StatusCode::from_u16(status).unwrap();
            (status, Json(json!({"error": {"message": "mock failure"}}))).into_response()
        })
    }
}

/// A running mock backend
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockUpstream {
    /// Start a mock that answers every request
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(MockState::default()).await
    }

    /// Start a mock that fails every request with `status`
    pub async fn start_failing(status: u16) -> anyhow::Result<Self> {
        Self::start_with(MockState {
            fail_with: Some(status),
            ..MockState::default()
        })
        .await
    }

    /// Start a mock that waits `delay` before answering
    pub async fn start_slow(delay: Duration) -> anyhow::Result<Self> {
        Self::start_with(MockState {
            delay,
            ..MockState::default()
        })
        .await
    }

    /// Start a mock whose chat streams also carry malformed events
    pub async fn start_noisy() -> anyhow::Result<Self> {
        Self::start_with(MockState {
            noisy: true,
            ..MockState::default()
        })
        .await
    }

    async fn start_with(state: MockState) -> anyhow::Result<Self> {
        let state = Arc::new(state);

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .route("/v1/completions", routing::post(handle_text_completions))
            .route("/v1beta/models/{action}", routing::post(handle_gemini))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL without any version segment
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("mock received no request")
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn sse_response(events: &[Value]) -> Response {
    sse_frames(events.iter().map(Value::to_string))
}

fn sse_frames(frames: impl IntoIterator<Item = String>) -> Response {
    let mut body = String::new();
    for frame in frames {
        body.push_str(&format!("data: {frame}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// Text of the last message, echoed back as the answer
fn last_message_text(body: &Value) -> String {
    let last = &body["messages"][body["messages"].as_array().map_or(0, |m| m.len().saturating_sub(1))];
    match &last["content"] {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts.iter().filter_map(|p| p["text"].as_str()).collect(),
        _ => String::new(),
    }
}

async fn handle_chat_completions(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/v1/chat/completions".to_owned(), &headers, HashMap::new(), &body);
    if let Some(failure) = state.gate().await {
        return failure;
    }

    let model = body["model"].as_str().unwrap_or_default().to_owned();
    let answer = format!("echo: {}", last_message_text(&body));

    if body["stream"].as_bool().unwrap_or(false) {
        let mut events = vec![json!({
            "id": "mock-1",
            "object": "chat.completion.chunk",
            "model": model,
            "choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]
        })];
        for word in answer.split_inclusive(' ') {
            events.push(json!({
                "id": "mock-1",
                "object": "chat.completion.chunk",
                "model": model,
                "choices": [{"index": 0, "delta": {"content": word}}]
            }));
        }
        events.push(json!({
            "id": "mock-1",
            "object": "chat.completion.chunk",
            "model": model,
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
        }));

        let mut frames: Vec<String> = events.iter().map(Value::to_string).collect();
        if state.noisy {
            frames.insert(1, "{not json".to_owned());
            frames.insert(2, json!({"choices": [{"delta": {"content": "lost"}}]}).to_string());
        }
        return sse_frames(frames);
    }

    Json(json!({
        "id": "mock-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": answer},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
    }))
    .into_response()
}

async fn handle_text_completions(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/v1/completions".to_owned(), &headers, HashMap::new(), &body);
    if let Some(failure) = state.gate().await {
        return failure;
    }

    let model = body["model"].as_str().unwrap_or_default().to_owned();

    if body["stream"].as_bool().unwrap_or(false) {
        let events: Vec<Value> = ["Once", " upon", " a time"]
            .iter()
            .map(|piece| json!({"id": "tc-1", "model": model, "choices": [{"index": 0, "text": piece}]}))
            .collect();
        return sse_response(&events);
    }

    Json(json!({
        "id": "tc-1",
        "object": "text_completion",
        "model": model,
        "choices": [{"index": 0, "text": "Once upon a time", "finish_reason": "length"}]
    }))
    .into_response()
}

async fn handle_gemini(
    State(state): State<Arc<MockState>>,
    Path(action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(format!("/v1beta/models/{action}"), &headers, query, &body);
    if let Some(failure) = state.gate().await {
        return failure;
    }

    let candidate = |text: &str| {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-mock"
        })
    };

    if action.ends_with(":streamGenerateContent") {
        return sse_response(&[candidate("Hello"), candidate(" from"), candidate(" Gemini")]);
    }

    Json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    {"text": "Hello"},
                    {"text": "from Gemini"}
                ]
            },
            "finishReason": "STOP"
        }],
        "modelVersion": "gemini-mock"
    }))
    .into_response()
}
