//! Runtime for executing the game
//!
//! One task owns the state, transcript, session and error banner. Everything
//! else talks to it through a [`GameHandle`].

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::GameRuntime;

use crate::llm::SessionFactory;
use crate::state_machine::{Event, GameContext, TransitionError};
use crate::transcript::Turn;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

const COMMAND_CAPACITY: usize = 64;
const BROADCAST_CAPACITY: usize = 1024;

/// The error banner shown out-of-band from the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Point-in-time view of the game for clients
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub game_id: String,
    pub state: &'static str,
    pub busy: bool,
    pub started: bool,
    pub turns: Vec<Turn>,
    pub error: Option<ErrorBanner>,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init { snapshot: GameSnapshot },
    TurnAppended { index: usize, turn: Turn },
    TurnUpdated { index: usize, text: String },
    StateChange { state: &'static str, busy: bool },
    Error { banner: ErrorBanner },
    ErrorCleared,
}

/// Errors returned to callers of a [`GameHandle`]
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Game runtime has stopped")]
    Stopped,
}

pub(crate) enum RuntimeCommand {
    /// Drive the state machine; player events carry a reply channel
    Event {
        event: Event,
        reply: Option<oneshot::Sender<Result<(), TransitionError>>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    /// Snapshot and subscription taken together so no update falls between
    Subscribe {
        reply: oneshot::Sender<(GameSnapshot, broadcast::Receiver<SseEvent>)>,
    },
}

impl RuntimeCommand {
    pub(crate) fn internal(event: Event) -> Self {
        RuntimeCommand::Event { event, reply: None }
    }
}

/// Handle to interact with the running game
#[derive(Clone)]
pub struct GameHandle {
    command_tx: mpsc::Sender<RuntimeCommand>,
}

impl GameHandle {
    /// Submit a player event and wait for it to be accepted or rejected.
    /// Acceptance means the transition happened, not that narration finished.
    pub async fn submit(&self, event: Event) -> Result<(), RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(RuntimeCommand::Event {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        rx.await.map_err(|_| RuntimeError::Stopped)??;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(RuntimeCommand::Snapshot { reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Subscribe to game updates, starting from the returned snapshot
    pub async fn subscribe(
        &self,
    ) -> Result<(GameSnapshot, broadcast::Receiver<SseEvent>), RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(RuntimeCommand::Subscribe { reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }
}

/// Start the game runtime in the background
pub fn spawn_game<F>(context: GameContext, factory: F) -> GameHandle
where
    F: SessionFactory + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

    let runtime = GameRuntime::new(
        context,
        factory,
        command_rx,
        command_tx.clone(),
        broadcast_tx,
    );

    tokio::spawn(async move {
        runtime.run().await;
    });

    GameHandle { command_tx }
}
