//! Events that can occur in a game

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Player events
    StartGame,
    PlayerInput {
        text: String,
    },

    // Session events
    SessionReady,
    SetupFailed {
        message: String,
    },

    // Stream events
    StreamOpened,
    Fragment {
        text: String,
    },
    StreamComplete,
    /// The request failed before a stream was produced
    SendFailed {
        message: String,
    },
    /// The stream broke before completing
    StreamFailed {
        message: String,
    },
}

impl Event {
    pub fn player_input(text: impl Into<String>) -> Self {
        Event::PlayerInput { text: text.into() }
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Event::Fragment { text: text.into() }
    }
}
