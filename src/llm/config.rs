//! Credential and endpoint configuration, and the production session factory

use super::gemini::GeminiSession;
use super::{ChatSession, LlmError, LoggingSession, SessionConfig, SessionFactory};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the Gemini provider
#[derive(Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// Overrides the narrator's default model
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .ok(),
            model: std::env::var("GEMINI_MODEL").ok(),
            base_url: std::env::var("GEMINI_BASE_URL").ok(),
        }
    }

    /// The credential, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// Creates Gemini sessions wrapped in logging
pub struct GeminiSessionFactory {
    config: LlmConfig,
}

impl GeminiSessionFactory {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for GeminiSessionFactory {
    fn create(&self, config: &SessionConfig) -> Result<Arc<dyn ChatSession>, LlmError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| LlmError::config("API_KEY environment variable not set"))?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::config(format!("Failed to create HTTP client: {e}")))?;

        let session =
            GeminiSession::new(client, api_key.to_string(), self.config.base_url(), config);
        let session: Arc<dyn ChatSession> = Arc::new(LoggingSession::new(Arc::new(session)));
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmErrorKind, SamplingParams};

    fn session_config() -> SessionConfig {
        SessionConfig {
            system_instruction: "narrate".to_string(),
            model: "gemini-2.5-flash".to_string(),
            sampling: SamplingParams {
                temperature: 0.7,
                top_p: 0.9,
                top_k: 40,
            },
        }
    }

    #[test]
    fn test_missing_credential_is_setup_error() {
        let factory = GeminiSessionFactory::new(LlmConfig::default());
        let err = factory.create(&session_config()).err().unwrap();
        assert_eq!(err.kind, LlmErrorKind::Config);
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let config = LlmConfig {
            api_key: Some("   ".to_string()),
            ..LlmConfig::default()
        };
        assert!(config.api_key().is_none());
        assert!(GeminiSessionFactory::new(config)
            .create(&session_config())
            .is_err());
    }

    #[test]
    fn test_creates_session_with_credential() {
        let factory = GeminiSessionFactory::new(LlmConfig {
            api_key: Some("secret".to_string()),
            ..LlmConfig::default()
        });
        let session = factory.create(&session_config()).unwrap();
        assert_eq!(session.model_id(), "gemini-2.5-flash");
    }

    #[test]
    fn test_default_base_url() {
        assert_eq!(LlmConfig::default().base_url(), DEFAULT_BASE_URL);
    }
}
