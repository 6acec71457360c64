pub mod markdown;
pub mod render;
pub mod terminal;

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::{
    config::ResetMode,
    message::ChatMessage,
    services::{
        backend::{ChatBackend, StreamFrame},
        session_store::SessionContext,
    },
    state::{StreamOutcome, StreamState, TurnId},
    transcript::Transcript,
};

/// Network callbacks delivered back to the view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    Fragment { turn: TurnId, text: String },
    Finished { turn: TurnId, outcome: StreamOutcome },
}

pub type ViewEvents = mpsc::UnboundedReceiver<ViewEvent>;

/// State behind the chat screen: transcript, input buffer and the reply stream.
///
/// All mutation happens on the task that owns the view. Stream readers run as
/// separate tasks and only talk back through [`ViewEvent`]s, which the owner
/// feeds to [`ChatView::apply`].
pub struct ChatView {
    session: SessionContext,
    backend: Arc<dyn ChatBackend>,
    reset_mode: ResetMode,
    transcript: Transcript,
    input: String,
    stream: StreamState,
    last_turn: TurnId,
    revision: u64,
    events: mpsc::UnboundedSender<ViewEvent>,
}

impl ChatView {
    pub fn new(
        session: SessionContext,
        backend: Arc<dyn ChatBackend>,
        reset_mode: ResetMode,
    ) -> (Self, ViewEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let view = Self {
            session,
            backend,
            reset_mode,
            transcript: Transcript::new(),
            input: String::new(),
            stream: StreamState::Idle,
            last_turn: TurnId::new(0),
            revision: 0,
            events,
        };
        (view, rx)
    }

    /// Build the view and load any stored context for the session.
    pub async fn mount(
        session: SessionContext,
        backend: Arc<dyn ChatBackend>,
        reset_mode: ResetMode,
    ) -> (Self, ViewEvents) {
        let (mut view, rx) = Self::new(session, backend, reset_mode);
        view.refresh().await;
        (view, rx)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.messages()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn stream_state(&self) -> &StreamState {
        &self.stream
    }

    /// Whether an assistant reply is in progress.
    pub fn is_composing(&self) -> bool {
        self.stream.is_streaming()
    }

    /// Bumped whenever the transcript or the composing flag changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Replace the transcript with the backend's stored context.
    /// Failures are logged and leave the transcript as it was.
    pub async fn refresh(&mut self) {
        let user_id = self.session.user_id();
        match self.backend.fetch_context(user_id).await {
            Ok(messages) => {
                tracing::debug!(user_id, count = messages.len(), "context loaded");
                self.transcript.replace_all(messages);
                self.touch();
            }
            Err(e) => tracing::error!(user_id, error = %e, "failed to fetch context"),
        }
    }

    /// Clear stored history on the backend, then locally according to the reset mode.
    pub async fn reset(&mut self) {
        let user_id = self.session.user_id();
        if let Err(e) = self.backend.reset_context(user_id).await {
            tracing::error!(user_id, error = %e, "failed to reset context");
            return;
        }

        self.stop();
        match self.reset_mode {
            ResetMode::Refetch => self.refresh().await,
            ResetMode::ClearLocal => {
                self.transcript.clear();
                self.touch();
            }
        }
    }

    /// Send the input buffer. Whitespace-only input is left in place and nothing is sent.
    pub fn submit(&mut self) -> Option<TurnId> {
        if self.input.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.input);
        self.send_message(&text)
    }

    /// Append `text` as a user message and start streaming the reply.
    ///
    /// Returns `None` without touching anything when `text` is blank. A stream
    /// still running from an earlier send is cancelled first.
    pub fn send_message(&mut self, text: &str) -> Option<TurnId> {
        if text.trim().is_empty() {
            return None;
        }
        if self.stream.is_streaming() {
            tracing::debug!("new message supersedes the running stream");
            self.stop();
        }

        self.transcript.push_user(text);

        let turn = self.last_turn.next();
        self.last_turn = turn;
        let task = tokio::spawn(read_stream(
            Arc::clone(&self.backend),
            self.session.user_id().to_string(),
            text.to_string(),
            turn,
            self.events.clone(),
        ));
        self.stream = StreamState::Streaming {
            turn,
            buffer: String::new(),
            task,
        };
        self.touch();
        Some(turn)
    }

    /// Close the running stream. The partial reply stays as it is.
    /// Returns `false` when nothing was streaming.
    pub fn stop(&mut self) -> bool {
        match std::mem::take(&mut self.stream) {
            StreamState::Streaming { turn, task, .. } => {
                task.abort();
                tracing::debug!(%turn, "stream cancelled");
                self.stream = StreamState::Cancelled { turn };
                self.touch();
                true
            }
            other => {
                self.stream = other;
                false
            }
        }
    }

    /// Fold a network event into the view. Events for any turn other than the one
    /// currently streaming are dropped. Returns whether the view changed.
    pub fn apply(&mut self, event: ViewEvent) -> bool {
        match event {
            ViewEvent::Fragment { turn, text } => {
                let StreamState::Streaming {
                    turn: active,
                    buffer,
                    ..
                } = &mut self.stream
                else {
                    tracing::debug!(%turn, "dropping fragment, no stream open");
                    return false;
                };
                if *active != turn {
                    tracing::debug!(%turn, "dropping fragment from stale turn");
                    return false;
                }

                buffer.push_str(&text);
                let content = buffer.trim().to_string();
                self.transcript.update_turn(turn, content);
                self.touch();
                true
            }
            ViewEvent::Finished { turn, outcome } => {
                if self.stream.active_turn() != Some(turn) {
                    return false;
                }
                match &outcome {
                    StreamOutcome::Completed => tracing::debug!(%turn, "reply complete"),
                    StreamOutcome::Closed => tracing::debug!(%turn, "stream closed by backend"),
                    StreamOutcome::Failed(reason) => {
                        tracing::warn!(%turn, %reason, "chat stream failed")
                    }
                }
                self.stream = StreamState::Idle;
                self.touch();
                true
            }
        }
    }
}

impl Drop for ChatView {
    fn drop(&mut self) {
        if let StreamState::Streaming { task, .. } = &self.stream {
            task.abort();
        }
    }
}

async fn read_stream(
    backend: Arc<dyn ChatBackend>,
    user_id: String,
    message: String,
    turn: TurnId,
    events: mpsc::UnboundedSender<ViewEvent>,
) {
    let outcome = match backend.open_stream(&user_id, &message).await {
        Ok(mut frames) => loop {
            match frames.next().await {
                Some(Ok(StreamFrame::Fragment(text))) => {
                    if events.send(ViewEvent::Fragment { turn, text }).is_err() {
                        return;
                    }
                }
                Some(Ok(StreamFrame::Done)) => break StreamOutcome::Completed,
                Some(Err(e)) => break StreamOutcome::Failed(e.to_string()),
                None => break StreamOutcome::Closed,
            }
        },
        Err(e) => StreamOutcome::Failed(e.to_string()),
    };
    let _ = events.send(ViewEvent::Finished { turn, outcome });
}
