// tests/common/mod.rs
#![allow(dead_code)]

use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chat_view::{
    message::{ChatMessage, ChatQuery, ResetContextRequest},
    state::StreamOutcome,
    view::{ChatView, ViewEvent, ViewEvents},
};
use futures::{StreamExt, stream};
use serde_json::json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StreamEnd {
    /// Close the connection after the last fragment.
    #[default]
    Close,
    /// Send `[DONE]`, then close.
    Done,
    /// Send an event named `done` carrying data, then close.
    DoneEvent,
    /// Keep the connection open forever.
    Hang,
}

#[derive(Clone, Debug, Default)]
pub struct Script {
    pub fragments: Vec<String>,
    pub end: StreamEnd,
}

/// In-process stand-in for the chat/context server.
#[derive(Clone, Default)]
pub struct MockBackend {
    contexts: Arc<Mutex<HashMap<String, Vec<ChatMessage>>>>,
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    queries: Arc<Mutex<Vec<ChatQuery>>>,
    failing: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn script(&self, message: &str, fragments: &[&str], end: StreamEnd) {
        let script = Script {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            end,
        };
        self.scripts.lock().unwrap().insert(message.to_string(), script);
    }

    pub fn seed(&self, user_id: &str, messages: Vec<ChatMessage>) {
        self.contexts.lock().unwrap().insert(user_id.to_string(), messages);
    }

    pub fn stored(&self, user_id: &str) -> Option<Vec<ChatMessage>> {
        self.contexts.lock().unwrap().get(user_id).cloned()
    }

    pub fn queries(&self) -> Vec<ChatQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Make the context endpoints answer 500.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }
}

/// Serve `mock` on an ephemeral port and return its base url.
pub async fn spawn(mock: MockBackend) -> String {
    let app = Router::new()
        .route("/context/{user_id}", get(get_context))
        .route("/context", post(update_context))
        .route("/chat", get(chat))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base url nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn get_context(State(mock): State<MockBackend>, Path(user_id): Path<String>) -> Response {
    if mock.is_failing() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match mock.stored(&user_id) {
        Some(messages) => {
            Json(json!({ "context": { "user_id": user_id, "messages": messages } })).into_response()
        }
        None => Json(json!({ "context": "{}" })).into_response(),
    }
}

async fn update_context(
    State(mock): State<MockBackend>,
    Json(body): Json<ResetContextRequest>,
) -> Response {
    if mock.is_failing() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    mock.seed(&body.user_id, body.messages);
    Json(json!({ "message": "Context updated" })).into_response()
}

async fn chat(State(mock): State<MockBackend>, Query(query): Query<ChatQuery>) -> Response {
    mock.queries.lock().unwrap().push(query.clone());
    let script = mock
        .scripts
        .lock()
        .unwrap()
        .get(&query.message)
        .cloned()
        .unwrap_or_else(|| Script {
            fragments: vec!["ok".to_string()],
            end: StreamEnd::Close,
        });

    {
        let reply = script.fragments.concat();
        let mut contexts = mock.contexts.lock().unwrap();
        let history = contexts.entry(query.user_id.clone()).or_default();
        history.push(ChatMessage::user(query.message.clone()));
        history.push(ChatMessage::assistant(reply.trim()));
    }

    let mut frames: Vec<String> = script
        .fragments
        .iter()
        .map(|f| format!("data: {f}\n\n"))
        .collect();
    match script.end {
        StreamEnd::Done => frames.push("data: [DONE]\n\n".to_string()),
        StreamEnd::DoneEvent => frames.push("event: done\ndata: bye\n\n".to_string()),
        StreamEnd::Close | StreamEnd::Hang => {}
    }
    let frames = stream::iter(frames.into_iter().map(Ok::<_, Infallible>));
    let body = match script.end {
        StreamEnd::Hang => Body::from_stream(frames.chain(stream::pending())),
        StreamEnd::Close | StreamEnd::Done | StreamEnd::DoneEvent => Body::from_stream(frames),
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// Apply stream events to `view` until its current turn finishes.
pub async fn finish_turn(view: &mut ChatView, events: &mut ViewEvents) -> StreamOutcome {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("stream did not finish in time")
            .expect("event channel closed");
        let finished = match &event {
            ViewEvent::Finished { outcome, .. } => Some(outcome.clone()),
            ViewEvent::Fragment { .. } => None,
        };
        if view.apply(event) {
            if let Some(outcome) = finished {
                return outcome;
            }
        }
    }
}
