//! Common types for streaming chat sessions

use futures::Stream;
use serde::Serialize;
use std::pin::Pin;

use super::LlmError;

/// One incremental piece of narration delivered by a streaming response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Lazy sequence of fragments for one response.
///
/// Boxed so sessions stay object-safe behind `Arc<dyn ChatSession>`.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, LlmError>> + Send + 'static>>;

/// Sampling parameters sent with every request of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

/// Everything needed to open a chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub system_instruction: String,
    pub model: String,
    pub sampling: SamplingParams,
}
