//! Effects produced by state transitions

use crate::transcript::Turn;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Create the chat session for this game
    CreateSession,

    /// Send text to the session and stream the response
    SendPrompt { text: String },

    /// Append a finished turn to the transcript
    AppendTurn { turn: Turn },

    /// Append an empty narrator turn that fragments will fill
    OpenNarration,

    /// Replace the text of the open narrator turn
    ReplaceLast { text: String },

    /// Stop extending the open narrator turn
    CloseNarration,

    /// Show the error banner
    ShowError {
        message: String,
        detail: Option<String>,
    },

    /// Hide the error banner
    ClearError,

    /// Tell connected clients the state changed
    NotifyState,
}

impl Effect {
    pub fn send_prompt(text: impl Into<String>) -> Self {
        Effect::SendPrompt { text: text.into() }
    }

    pub fn show_error(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Effect::ShowError {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}
