//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to submit player input
#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

/// Response for start and input commands
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub accepted: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
