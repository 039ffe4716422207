//! Configuration management for Deck Agent.
//!
//! Configuration can be set via environment variables:
//! - `ANTHROPIC_API_KEY` - Required. Anthropic API key for the agent model.
//! - `GOOGLE_ACCESS_TOKEN` - Required. OAuth bearer token for Slides/Drive.
//! - `TEMPLATE_PRESENTATION_ID` - Required. Slides template the agent edits.
//! - `AGENT_MODEL` - Optional. Model identifier. Defaults to `claude-3-5-sonnet-20241022`.
//! - `AGENT_MAX_ITERATIONS` - Optional. Default iteration cap. Defaults to `20`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Timeout for model/backend calls. Defaults to `60`.
//! - `RETRY_MAX_ATTEMPTS` - Optional. Retry budget for retryable failures. Defaults to `3`.
//! - `RETRY_BASE_DELAY_MS` - Optional. Backoff base delay. Defaults to `500`.
//! - `DEV_MODE` - Optional. Permissive CORS for local frontends.
//! - `FRONTEND_URL` - Optional. Frontend origin allowed by CORS outside dev mode.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Retry/backoff configuration shared by the model transport and the
/// presentation backend.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per call (first try included)
    pub max_attempts: u32,

    /// Base delay for exponential backoff
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Backoff delay before the given retry (1-based: the delay taken after
    /// the first failure is `backoff_delay(1)`).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic API key
    pub anthropic_api_key: String,

    /// Model identifier for the agent loop
    pub agent_model: String,

    /// OAuth bearer token for the Google Slides/Drive APIs
    pub google_access_token: String,

    /// Presentation template the agent clears and fills
    pub template_presentation_id: String,

    /// Default iteration cap for agent runs
    pub max_iterations: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Timeout applied to each model call and backend call
    pub request_timeout: Duration,

    /// Retry policy for retryable transport failures
    pub retry: RetryConfig,

    /// Development mode (permissive CORS)
    pub dev_mode: bool,

    /// Frontend origin allowed by CORS outside dev mode
    pub frontend_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if a required variable is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()))?;

        let google_access_token = std::env::var("GOOGLE_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("GOOGLE_ACCESS_TOKEN".to_string()))?;

        let template_presentation_id = std::env::var("TEMPLATE_PRESENTATION_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TEMPLATE_PRESENTATION_ID".to_string()))?;

        let agent_model = std::env::var("AGENT_MODEL")
            .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string());

        let max_iterations = parse_env_or("AGENT_MAX_ITERATIONS", 20u32)?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env_or("PORT", 3000u16)?;

        let request_timeout = Duration::from_secs(parse_env_or("REQUEST_TIMEOUT_SECS", 60u64)?);

        let retry = RetryConfig {
            max_attempts: parse_env_or("RETRY_MAX_ATTEMPTS", 3u32)?,
            base_delay: Duration::from_millis(parse_env_or("RETRY_BASE_DELAY_MS", 500u64)?),
        };

        let dev_mode = std::env::var("DEV_MODE")
            .ok()
            .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue("DEV_MODE".to_string(), e)))
            .transpose()?
            // In debug builds, default to dev_mode=true; in release, default to false.
            .unwrap_or(cfg!(debug_assertions));

        let frontend_origin = std::env::var("FRONTEND_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            anthropic_api_key,
            agent_model,
            google_access_token,
            template_presentation_id,
            max_iterations,
            host,
            port,
            request_timeout,
            retry,
            dev_mode,
            frontend_origin,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(
        anthropic_api_key: String,
        google_access_token: String,
        template_presentation_id: String,
    ) -> Self {
        Self {
            anthropic_api_key,
            agent_model: "claude-3-5-sonnet-20241022".to_string(),
            google_access_token,
            template_presentation_id,
            max_iterations: 20,
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
            dev_mode: true,
            frontend_origin: None,
        }
    }
}

fn parse_env_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_retry() {
        let retry = RetryConfig {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_delay(3), Duration::from_millis(400));
    }

    #[test]
    fn parse_bool_accepts_common_forms() {
        assert_eq!(parse_bool("Yes"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }
}
