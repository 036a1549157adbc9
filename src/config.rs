//! Desk configuration, from CLI flags or the environment

use std::time::Duration;

use clap::Args;

use crate::api::query::MAX_PAGE_SIZE;
use crate::utils::RetryConfig;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("ORDER_API_BASE_URL must not be empty")]
    EmptyBaseUrl,

    #[error("ORDER_API_BASE_URL must start with http:// or https://, got {0}")]
    UnsupportedScheme(String),

    #[error("ORDER_PAGE_SIZE must be between 1 and 100, got {0}")]
    PageSize(u32),

    #[error("ORDER_DESK_ACTOR must not be empty")]
    EmptyActor,
}

/// Backend connection and desk defaults
#[derive(Debug, Clone, Args)]
pub struct DeskConfig {
    /// Base URL of the order REST API
    #[arg(long, env = "ORDER_API_BASE_URL", default_value = "http://localhost:8000/api")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "ORDER_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "ORDER_API_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Rows per page of the order table
    #[arg(long, env = "ORDER_PAGE_SIZE", default_value = "20")]
    pub page_size: u32,

    /// Name recorded as the actor of every change
    #[arg(long, env = "ORDER_DESK_ACTOR", default_value = "admin")]
    pub actor: String,

    /// Attempts for idempotent reads
    #[arg(long, env = "ORDER_API_RETRY_ATTEMPTS", default_value = "3")]
    pub retry_attempts: u32,

    /// First retry delay in milliseconds
    #[arg(long, env = "ORDER_API_RETRY_DELAY_MS", default_value = "200")]
    pub retry_delay_ms: u64,
}

impl DeskConfig {
    /// Defaults pointed at `base_url`, for library users
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_secs: 30,
            page_size: 20,
            actor: "admin".to_string(),
            retry_attempts: 3,
            retry_delay_ms: 200,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::UnsupportedScheme(base_url.to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::PageSize(self.page_size));
        }
        if self.actor.trim().is_empty() {
            return Err(ConfigError::EmptyActor);
        }
        Ok(())
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(
            self.retry_attempts.max(1),
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}
