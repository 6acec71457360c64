// src/state.rs
use std::fmt;

use tokio::task::JoinHandle;

/// Correlation id of one send/stream cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(u64);

impl TurnId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// How a stream ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The backend sent an explicit end-of-turn marker.
    Completed,
    /// The connection ended without a marker.
    Closed,
    Failed(String),
}

/// Lifecycle of the view's single event-stream connection.
#[derive(Debug, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming {
        turn: TurnId,
        /// Every fragment received so far, untrimmed.
        buffer: String,
        task: JoinHandle<()>,
    },
    Cancelled {
        turn: TurnId,
    },
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, StreamState::Streaming { .. })
    }

    /// Turn whose events are still accepted.
    pub fn active_turn(&self) -> Option<TurnId> {
        match self {
            StreamState::Streaming { turn, .. } => Some(*turn),
            StreamState::Idle | StreamState::Cancelled { .. } => None,
        }
    }
}
