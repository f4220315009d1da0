//! Google Gemini streaming chat session
//!
//! Talks to `streamGenerateContent?alt=sse`. Gemini is stateless, so the
//! session keeps the chat history itself and replays it with every send.
//! An exchange is recorded only once its stream has completed with some
//! narration, matching how the vendor chat client curates history.

use super::types::{Fragment, FragmentStream, SessionConfig};
use super::{ChatSession, LlmError};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Gemini chat session holding its own conversation history
pub struct GeminiSession {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
    history: Arc<Mutex<Vec<GeminiContent>>>,
}

impl GeminiSession {
    pub fn new(client: Client, api_key: String, base_url: &str, config: &SessionConfig) -> Self {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            base_url.trim_end_matches('/'),
            config.model
        );

        Self {
            client,
            api_key,
            url,
            model_id: config.model.clone(),
            system_instruction: GeminiContent::text(None, &config.system_instruction),
            generation_config: GeminiGenerationConfig {
                temperature: config.sampling.temperature,
                top_p: config.sampling.top_p,
                top_k: config.sampling.top_k,
            },
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn build_request(&self, text: &str) -> GeminiRequest {
        let mut contents = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        contents.push(GeminiContent::text(Some("user"), text));

        GeminiRequest {
            contents,
            system_instruction: Some(self.system_instruction.clone()),
            generation_config: Some(self.generation_config),
        }
    }

    /// Number of recorded history entries (user and model turns)
    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send_streaming(&self, text: &str) -> Result<FragmentStream, LlmError> {
        let request = self.build_request(text);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
            return Err(error_from_status(status, &body));
        }

        Ok(narration_stream(
            response.bytes_stream(),
            Arc::clone(&self.history),
            text.to_string(),
        ))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn record_exchange(history: &Mutex<Vec<GeminiContent>>, user_text: String, reply: String) {
    let mut history = history.lock().unwrap_or_else(PoisonError::into_inner);
    history.push(GeminiContent::text(Some("user"), user_text));
    history.push(GeminiContent::text(Some("model"), reply));
}

/// Classify a non-success HTTP response
fn error_from_status(status: StatusCode, body: &str) -> LlmError {
    if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(body) {
        let message = error_resp.error.message;
        return match status.as_u16() {
            400 => LlmError::invalid_request(format!("Invalid request: {message}")),
            401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
            429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
            500..=599 => LlmError::server_error(format!("Server error: {message}")),
            _ => LlmError::unknown(format!("HTTP {status}: {message}")),
        };
    }
    LlmError::unknown(format!("HTTP {status} error: {body}"))
}

/// Turn one SSE `data:` payload into a fragment.
///
/// Events that carry no narration (e.g. the final usage-only event) yield
/// `None`.
fn decode_event(payload: &str) -> Result<Option<Fragment>, LlmError> {
    let event: GeminiStreamEvent = serde_json::from_str(payload).map_err(|e| {
        LlmError::unknown(format!("Failed to parse stream event: {e} - data: {payload}"))
    })?;

    if let Some(error) = event.error {
        return Err(LlmError::server_error(format!(
            "Stream error: {}",
            error.message
        )));
    }

    if event.candidates.is_empty() {
        if let Some(reason) = event.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::invalid_request(format!("Prompt blocked: {reason}")));
        }
    }

    let text: String = event
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought.unwrap_or(false))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Fragment::new(text)))
    }
}

/// Decode a Gemini SSE body into narration fragments.
///
/// The exchange is written to `history` only when the body ends cleanly with
/// some narration.
fn narration_stream<S, B, E>(
    body: S,
    history: Arc<Mutex<Vec<GeminiContent>>>,
    user_text: String,
) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let mut events = Box::pin(body.eventsource());

    Box::pin(async_stream::stream! {
        let mut reply = String::new();

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(LlmError::network(format!("Stream interrupted: {e}")));
                    return;
                }
            };
            if event.data.is_empty() {
                continue;
            }
            match decode_event(&event.data) {
                Ok(Some(fragment)) => {
                    reply.push_str(&fragment.text);
                    yield Ok(fragment);
                }
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if !reply.is_empty() {
            record_exchange(&history, user_text, reply);
        }
    })
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: Some(text.into()),
                thought: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamEvent {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
