//! Core game state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{GameContext, GameState};
pub use transition::{transition, TransitionError};
#[cfg(test)]
pub use transition::{error_annotation, CONNECTION_LOST_MESSAGE, START_FAILED_MESSAGE};
