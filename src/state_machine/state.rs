//! Game state types

use crate::llm::SessionConfig;
use std::time::Duration;

/// What a pending response was requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// The fixed opening prompt sent on game start
    OpeningScene,
    /// A line the player submitted
    PlayerTurn,
}

/// How far a pending response has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStage {
    /// Session being created (opening scene only)
    Connecting,
    /// Prompt sent, stream not yet open
    Sending,
    /// Stream open, narration turn present in the transcript
    Streaming,
}

/// Controller state. `AwaitingResponse` is the busy flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GameState {
    #[default]
    NotStarted,

    /// A request is in flight; new submissions are rejected
    AwaitingResponse {
        origin: RequestOrigin,
        stage: ResponseStage,
        /// Narration received so far for this response
        received: String,
    },

    /// Ready for player input
    Idle,
}

impl GameState {
    pub(crate) fn awaiting(origin: RequestOrigin, stage: ResponseStage) -> Self {
        GameState::AwaitingResponse {
            origin,
            stage,
            received: String::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, GameState::AwaitingResponse { .. })
    }

    pub fn is_started(&self) -> bool {
        !matches!(self, GameState::NotStarted)
    }

    /// Wire name shown to clients
    pub fn name(&self) -> &'static str {
        match self {
            GameState::NotStarted => "not_started",
            GameState::AwaitingResponse { .. } => "awaiting_response",
            GameState::Idle => "idle",
        }
    }
}

/// Immutable configuration for one running game
#[derive(Debug, Clone)]
pub struct GameContext {
    /// Identifies the game in logs
    pub game_id: String,
    pub session_config: SessionConfig,
    /// Give up on a stream after this long without a fragment
    pub stream_idle_timeout: Option<Duration>,
}

impl GameContext {
    pub fn new(session_config: SessionConfig) -> Self {
        Self {
            game_id: uuid::Uuid::new_v4().to_string(),
            session_config,
            stream_idle_timeout: None,
        }
    }

    pub fn with_stream_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }
}
