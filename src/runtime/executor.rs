//! Game runtime executor

use super::{ErrorBanner, GameSnapshot, RuntimeCommand, SseEvent};

use crate::llm::{ChatSession, SessionFactory};
use crate::state_machine::{transition, Effect, Event, GameContext, GameState, TransitionError};
use crate::transcript::{Transcript, Turn};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Owns the game and applies effects produced by the state machine
pub struct GameRuntime<F>
where
    F: SessionFactory + 'static,
{
    context: GameContext,
    state: GameState,
    transcript: Transcript,
    error: Option<ErrorBanner>,
    factory: F,
    /// The one session for this game, kept across failed sends
    session: Option<Arc<dyn ChatSession>>,
    command_rx: mpsc::Receiver<RuntimeCommand>,
    /// Handed to stream tasks so fragments come back through the same queue
    command_tx: mpsc::Sender<RuntimeCommand>,
    broadcast_tx: broadcast::Sender<SseEvent>,
}

impl<F> GameRuntime<F>
where
    F: SessionFactory + 'static,
{
    pub(crate) fn new(
        context: GameContext,
        factory: F,
        command_rx: mpsc::Receiver<RuntimeCommand>,
        command_tx: mpsc::Sender<RuntimeCommand>,
        broadcast_tx: broadcast::Sender<SseEvent>,
    ) -> Self {
        Self {
            context,
            state: GameState::NotStarted,
            transcript: Transcript::new(),
            error: None,
            factory,
            session: None,
            command_rx,
            command_tx,
            broadcast_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            game_id = %self.context.game_id,
            model = %self.context.session_config.model,
            "Starting game runtime"
        );

        while let Some(command) = self.command_rx.recv().await {
            match command {
                RuntimeCommand::Event { event, reply } => {
                    let outcome = self.process_event(event);
                    if let Err(e) = &outcome {
                        match e {
                            TransitionError::InvalidTransition(_) => {
                                tracing::error!(
                                    game_id = %self.context.game_id,
                                    error = %e,
                                    "Error handling event"
                                );
                            }
                            _ => {
                                tracing::debug!(
                                    game_id = %self.context.game_id,
                                    reason = %e,
                                    "Event rejected"
                                );
                            }
                        }
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(outcome);
                    }
                }
                RuntimeCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                RuntimeCommand::Subscribe { reply } => {
                    let _ = reply.send((self.snapshot(), self.broadcast_tx.subscribe()));
                }
            }
        }

        tracing::info!(game_id = %self.context.game_id, "Game runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Effects may generate follow-up events (session created, etc.)
        let mut events_to_process = VecDeque::from([event]);

        while let Some(current_event) = events_to_process.pop_front() {
            // Pure state transition
            let result = transition(&self.state, &self.transcript, current_event)?;
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect) {
                    events_to_process.push_back(generated_event);
                }
            }
        }

        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::CreateSession => match self.factory.create(&self.context.session_config) {
                Ok(session) => {
                    tracing::info!(
                        game_id = %self.context.game_id,
                        model = %session.model_id(),
                        "Chat session created"
                    );
                    self.session = Some(session);
                    Some(Event::SessionReady)
                }
                Err(e) => {
                    tracing::error!(
                        game_id = %self.context.game_id,
                        error = %e.message,
                        kind = ?e.kind,
                        "Chat session setup failed"
                    );
                    Some(Event::SetupFailed { message: e.message })
                }
            },

            Effect::SendPrompt { text } => {
                let Some(session) = self.session.clone() else {
                    return Some(Event::SendFailed {
                        message: "No chat session".to_string(),
                    });
                };
                tracing::debug!(
                    game_id = %self.context.game_id,
                    chars = text.len(),
                    "Sending prompt"
                );
                tokio::spawn(drive_stream(
                    session,
                    text,
                    self.context.stream_idle_timeout,
                    self.command_tx.clone(),
                ));
                None
            }

            Effect::AppendTurn { turn } => {
                let index = self.transcript.append(turn.clone());
                let _ = self.broadcast_tx.send(SseEvent::TurnAppended { index, turn });
                None
            }

            Effect::OpenNarration => {
                let index = self.transcript.open_narration();
                let _ = self.broadcast_tx.send(SseEvent::TurnAppended {
                    index,
                    turn: Turn::narrator(""),
                });
                None
            }

            Effect::ReplaceLast { text } => {
                match self.transcript.replace_last(text.clone()) {
                    Ok(index) => {
                        let _ = self.broadcast_tx.send(SseEvent::TurnUpdated { index, text });
                    }
                    Err(e) => {
                        tracing::error!(
                            game_id = %self.context.game_id,
                            error = %e,
                            "Transcript update rejected"
                        );
                    }
                }
                None
            }

            Effect::CloseNarration => {
                self.transcript.close_narration();
                None
            }

            Effect::ShowError { message, detail } => {
                tracing::warn!(
                    game_id = %self.context.game_id,
                    message = %message,
                    detail = detail.as_deref().unwrap_or_default(),
                    "Showing error banner"
                );
                let banner = ErrorBanner { message, detail };
                self.error = Some(banner.clone());
                let _ = self.broadcast_tx.send(SseEvent::Error { banner });
                None
            }

            Effect::ClearError => {
                if self.error.take().is_some() {
                    let _ = self.broadcast_tx.send(SseEvent::ErrorCleared);
                }
                None
            }

            Effect::NotifyState => {
                let _ = self.broadcast_tx.send(SseEvent::StateChange {
                    state: self.state.name(),
                    busy: self.state.is_busy(),
                });
                None
            }
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.context.game_id.clone(),
            state: self.state.name(),
            busy: self.state.is_busy(),
            started: self.state.is_started(),
            turns: self.transcript.turns().to_vec(),
            error: self.error.clone(),
        }
    }
}

/// Send one prompt and forward the response into the runtime, strictly in
/// arrival order. Ends after the first terminal event.
async fn drive_stream(
    session: Arc<dyn ChatSession>,
    text: String,
    idle_timeout: Option<Duration>,
    command_tx: mpsc::Sender<RuntimeCommand>,
) {
    let forward = |event: Event| {
        let command_tx = command_tx.clone();
        async move { command_tx.send(RuntimeCommand::internal(event)).await.is_ok() }
    };

    let opened = match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, session.send_streaming(&text))
            .await
            .unwrap_or_else(|_| Err(crate::llm::LlmError::network(silence_message(limit)))),
        None => session.send_streaming(&text).await,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            forward(Event::SendFailed { message: e.message }).await;
            return;
        }
    };

    if !forward(Event::StreamOpened).await {
        return;
    }

    loop {
        let next = match idle_timeout {
            Some(limit) => {
                let Ok(next) = tokio::time::timeout(limit, stream.next()).await else {
                    tracing::warn!(timeout_secs = limit.as_secs(), "Narration stream stalled");
                    forward(Event::StreamFailed {
                        message: silence_message(limit),
                    })
                    .await;
                    return;
                };
                next
            }
            None => stream.next().await,
        };

        let event = match next {
            Some(Ok(fragment)) => Event::fragment(fragment.text),
            Some(Err(e)) => {
                forward(Event::StreamFailed { message: e.message }).await;
                return;
            }
            None => {
                forward(Event::StreamComplete).await;
                return;
            }
        };

        if !forward(event).await {
            return;
        }
    }
}

fn silence_message(limit: Duration) -> String {
    format!("No narration received for {}s", limit.as_secs())
}
