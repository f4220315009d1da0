//! Conversation session abstraction
//!
//! A session wraps one ongoing exchange with the remote model: send text,
//! receive a lazy sequence of text fragments. The wire protocol stays behind
//! these traits so the controller can be driven by mocks in tests.

mod config;
mod error;
mod gemini;
mod types;

pub use config::{GeminiSessionFactory, LlmConfig};
pub use error::LlmError;
#[cfg(test)]
pub use error::LlmErrorKind;
pub use types::*;

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

/// A live chat with the remote model
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Send a message. Errors here mean the request never produced a stream;
    /// errors yielded by the stream mean it broke part-way.
    async fn send_streaming(&self, text: &str) -> Result<FragmentStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Opens sessions. Creation fails on setup problems such as a missing
/// credential.
pub trait SessionFactory: Send + Sync {
    fn create(&self, config: &SessionConfig) -> Result<Arc<dyn ChatSession>, LlmError>;
}

/// Logging wrapper for chat sessions
pub struct LoggingSession {
    inner: Arc<dyn ChatSession>,
    model_id: String,
}

impl LoggingSession {
    pub fn new(inner: Arc<dyn ChatSession>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ChatSession for LoggingSession {
    async fn send_streaming(&self, text: &str) -> Result<FragmentStream, LlmError> {
        let start = Instant::now();
        let result = self.inner.send_streaming(text).await;

        match result {
            Ok(mut stream) => {
                tracing::info!(
                    model = %self.model_id,
                    open_ms = %start.elapsed().as_millis(),
                    "LLM stream opened"
                );
                let model_id = self.model_id.clone();
                Ok(Box::pin(async_stream::stream! {
                    let mut fragments: usize = 0;
                    let mut chars: usize = 0;
                    let mut failed = false;
                    while let Some(item) = stream.next().await {
                        match &item {
                            Ok(fragment) => {
                                fragments += 1;
                                chars += fragment.text.len();
                            }
                            Err(e) => {
                                failed = true;
                                tracing::error!(
                                    model = %model_id,
                                    duration_ms = %start.elapsed().as_millis(),
                                    fragments,
                                    error = %e.message,
                                    kind = ?e.kind,
                                    "LLM stream failed"
                                );
                            }
                        }
                        yield item;
                    }
                    if !failed {
                        tracing::info!(
                            model = %model_id,
                            duration_ms = %start.elapsed().as_millis(),
                            fragments,
                            chars,
                            "LLM stream finished"
                        );
                    }
                }))
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM request failed"
                );
                Err(e)
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
