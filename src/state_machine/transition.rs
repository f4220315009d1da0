//! Pure state transition function
//!
//! Given the current state, a read-only view of the transcript and an event,
//! produces the next state and the effects the runtime must execute. No I/O.

use super::state::{RequestOrigin, ResponseStage};
use super::{Effect, Event, GameState};
use crate::narrator::OPENING_PROMPT;
use crate::transcript::{Transcript, Turn};
use thiserror::Error;

/// Banner shown when the game could not be started
pub const START_FAILED_MESSAGE: &str =
    "Failed to start the adventure. Please check your API key and try again.";

/// Banner shown when a response broke off
pub const CONNECTION_LOST_MESSAGE: &str =
    "The connection to the storyteller was lost. Please try again.";

/// Text written into the transcript where narration failed
pub fn error_annotation(message: &str) -> String {
    format!("[Error: {message}]")
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: GameState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: GameState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Reasons an event is rejected. Rejections leave state and transcript
/// untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("The storyteller is still narrating, wait for the current response")]
    Busy,
    #[error("The adventure has already started")]
    AlreadyStarted,
    #[error("Start the adventure first")]
    NotStarted,
    #[error("Input is blank")]
    BlankInput,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &GameState,
    transcript: &Transcript,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Starting the game
        // ============================================================
        (GameState::NotStarted, Event::StartGame) => Ok(TransitionResult::new(
            GameState::awaiting(RequestOrigin::OpeningScene, ResponseStage::Connecting),
        )
        .with_effects([Effect::ClearError, Effect::NotifyState, Effect::CreateSession])),

        (GameState::AwaitingResponse { .. }, Event::StartGame | Event::PlayerInput { .. }) => {
            Err(TransitionError::Busy)
        }

        (GameState::Idle, Event::StartGame) => Err(TransitionError::AlreadyStarted),

        (GameState::NotStarted, Event::PlayerInput { .. }) => Err(TransitionError::NotStarted),

        (
            GameState::AwaitingResponse {
                origin: RequestOrigin::OpeningScene,
                stage: ResponseStage::Connecting,
                ..
            },
            Event::SessionReady,
        ) => Ok(TransitionResult::new(GameState::awaiting(
            RequestOrigin::OpeningScene,
            ResponseStage::Sending,
        ))
        .with_effect(Effect::send_prompt(OPENING_PROMPT))),

        // Setup failures and failed opening sends leave the game unstarted
        (
            GameState::AwaitingResponse {
                origin: RequestOrigin::OpeningScene,
                stage: ResponseStage::Connecting,
                ..
            },
            Event::SetupFailed { message },
        )
        | (
            GameState::AwaitingResponse {
                origin: RequestOrigin::OpeningScene,
                stage: ResponseStage::Sending,
                ..
            },
            Event::SendFailed { message },
        ) => Ok(TransitionResult::new(GameState::NotStarted)
            .with_effect(Effect::show_error(START_FAILED_MESSAGE, message))
            .with_effect(Effect::NotifyState)),

        // ============================================================
        // Player input
        // ============================================================
        (GameState::Idle, Event::PlayerInput { text }) => begin_player_turn(&text),

        // ============================================================
        // Streaming
        // ============================================================
        (
            GameState::AwaitingResponse {
                origin,
                stage: ResponseStage::Sending,
                received,
            },
            Event::StreamOpened,
        ) => Ok(stream_opened(*origin, received)),

        (
            GameState::AwaitingResponse {
                origin,
                stage: ResponseStage::Streaming,
                received,
            },
            Event::Fragment { text },
        ) => Ok(append_fragment(*origin, received, &text)),

        (
            GameState::AwaitingResponse {
                stage: ResponseStage::Streaming,
                ..
            },
            Event::StreamComplete,
        ) => Ok(TransitionResult::new(GameState::Idle)
            .with_effects([Effect::CloseNarration, Effect::NotifyState])),

        // ============================================================
        // Narration failures
        // ============================================================
        (
            GameState::AwaitingResponse {
                stage: ResponseStage::Streaming,
                ..
            }
            | GameState::AwaitingResponse {
                origin: RequestOrigin::PlayerTurn,
                stage: ResponseStage::Sending,
                ..
            },
            Event::StreamFailed { message } | Event::SendFailed { message },
        ) => Ok(narration_failed(transcript, message)),

        // ============================================================
        // Anything else is a bug in the runtime
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} + {event:?}",
            state.name()
        ))),
    }
}

fn begin_player_turn(text: &str) -> Result<TransitionResult, TransitionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TransitionError::BlankInput);
    }
    Ok(TransitionResult::new(GameState::awaiting(
        RequestOrigin::PlayerTurn,
        ResponseStage::Sending,
    ))
    .with_effects([
        Effect::ClearError,
        Effect::AppendTurn {
            turn: Turn::user(text),
        },
        Effect::OpenNarration,
        Effect::NotifyState,
        Effect::send_prompt(text),
    ]))
}

fn stream_opened(origin: RequestOrigin, received: &str) -> TransitionResult {
    let result = TransitionResult::new(GameState::AwaitingResponse {
        origin,
        stage: ResponseStage::Streaming,
        received: received.to_string(),
    });
    // Player turns open their narration up front, the opening scene
    // only once the model answers
    match origin {
        RequestOrigin::OpeningScene => result.with_effect(Effect::OpenNarration),
        RequestOrigin::PlayerTurn => result,
    }
}

fn append_fragment(origin: RequestOrigin, received: &str, text: &str) -> TransitionResult {
    let received = format!("{received}{text}");
    TransitionResult::new(GameState::AwaitingResponse {
        origin,
        stage: ResponseStage::Streaming,
        received: received.clone(),
    })
    .with_effect(Effect::ReplaceLast { text: received })
}

fn narration_failed(transcript: &Transcript, message: String) -> TransitionResult {
    TransitionResult::new(GameState::Idle)
        .with_effects(annotate_failure(transcript))
        .with_effect(Effect::show_error(CONNECTION_LOST_MESSAGE, message))
        .with_effect(Effect::NotifyState)
}

/// Mark the failure in the transcript: fill the empty narrator placeholder if
/// nothing arrived, otherwise keep the partial narration and add a new turn.
fn annotate_failure(transcript: &Transcript) -> Vec<Effect> {
    let annotation = error_annotation(CONNECTION_LOST_MESSAGE);
    let placeholder_open =
        transcript.has_open_narration() && transcript.last().is_some_and(Turn::is_empty_narration);

    if placeholder_open {
        vec![
            Effect::ReplaceLast { text: annotation },
            Effect::CloseNarration,
        ]
    } else {
        vec![Effect::AppendTurn {
            turn: Turn::narrator(annotation),
        }]
    }
}
