//! Server configuration from the environment

use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a port number, got {value:?}")]
    InvalidPort { name: &'static str, value: String },
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidTimeout { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Longest silence tolerated between fragments; `None` waits forever
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            stream_idle_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("ISLAND_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort {
                    name: "ISLAND_PORT",
                    value,
                })?,
            None => DEFAULT_PORT,
        };

        let stream_idle_timeout = match lookup("ISLAND_STREAM_IDLE_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                // Zero disables the timeout
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return Err(ConfigError::InvalidTimeout {
                        name: "ISLAND_STREAM_IDLE_TIMEOUT_SECS",
                        value,
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            port,
            stream_idle_timeout,
        })
    }
}
