//! Transcript store
//!
//! An append-only sequence of turns. The only in-place mutation allowed is
//! replacing the text of the trailing narrator turn while its stream is open.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who a turn is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Narrator,
}

/// One unit of transcript content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn narrator(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Narrator,
            text: text.into(),
        }
    }

    /// An empty narrator turn, the placeholder a response streams into
    pub fn is_empty_narration(&self) -> bool {
        self.speaker == Speaker::Narrator && self.text.is_empty()
    }
}

/// Errors from transcript mutation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("transcript is empty")]
    Empty,
    #[error("trailing turn is not an open narration")]
    NoOpenNarration,
}

/// Ordered sequence of turns; insertion order is display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
    /// Whether the trailing turn is a narrator turn still being extended
    #[serde(skip)]
    open: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Any open narration is closed first.
    pub fn append(&mut self, turn: Turn) -> usize {
        self.open = false;
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// Append an empty narrator turn and mark it open for streaming.
    pub fn open_narration(&mut self) -> usize {
        let index = self.append(Turn::narrator(""));
        self.open = true;
        index
    }

    /// Replace the text of the trailing open narrator turn.
    pub fn replace_last(&mut self, text: impl Into<String>) -> Result<usize, TranscriptError> {
        if self.is_empty() {
            return Err(TranscriptError::Empty);
        }
        if !self.open {
            return Err(TranscriptError::NoOpenNarration);
        }
        let index = self.len() - 1;
        self.turns[index].text = text.into();
        Ok(index)
    }

    pub fn close_narration(&mut self) {
        self.open = false;
    }

    pub fn has_open_narration(&self) -> bool {
        self.open
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
