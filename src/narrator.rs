//! Narrator persona: system instruction, opening prompt and sampling
//!
//! The narrator is a game master for an educational castaway-survival
//! adventure. Everything here is fixed for the lifetime of a game.

use crate::llm::{SamplingParams, SessionConfig};

/// Model used when `GEMINI_MODEL` is not set
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const SAMPLING: SamplingParams = SamplingParams {
    temperature: 0.7,
    top_p: 0.9,
    top_k: 40,
};

/// Prompt sent when the player starts the game
pub const OPENING_PROMPT: &str =
    "Start the game by describing the opening scene. The player has just woken up on a beach.";

const SYSTEM_INSTRUCTION: &str = r"You are an expert storyteller and game master for an educational, text-based adventure game.
The theme is 'Surviving on a Deserted Island with Science'.
Your goal is to create an engaging, interactive, and informative experience where the player learns real-world survival and scientific principles.
Describe the environment, challenges, and outcomes of the player's actions in a vivid, descriptive, and concise manner (2-3 paragraphs).
When describing challenges, subtly embed scientific or practical knowledge (e.g., finding fresh water, identifying edible plants, building a shelter, principles of fire-making).
Always present the player with a situation where they need to think and respond.
End your responses by describing the scene in a way that implies a decision is needed, without explicitly saying 'What do you do next?'.
The tone should be immersive and slightly mysterious. The player has just woken up with no memory of how they got here.
";

/// Session configuration for the narrator, optionally on another model
pub fn session_config(model_override: Option<&str>) -> SessionConfig {
    SessionConfig {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        model: model_override
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string(),
        sampling: SAMPLING,
    }
}
