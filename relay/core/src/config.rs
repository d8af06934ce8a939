//! Client Configuration
//!
//! Where the inference backend lives and how replies are read from it.
//! Values come from environment variables; surfaces may override them with
//! command-line flags.
//!
//! Environment variables:
//! - `RELAY_API_URL`: non-streaming endpoint (default `http://localhost:8000/api/message`)
//! - `RELAY_STREAM_URL` or `API_URL`: streaming endpoint
//!   (default `http://localhost:8000/api/message_stream`)
//! - `RELAY_STREAM_TIMEOUT_SECS`: overall limit for one reply (default: none)
//! - `RELAY_STRICT_UTF8`: reject invalid UTF-8 instead of substituting (default: false)

use std::time::Duration;

use crate::error::ConfigError;

/// Default non-streaming endpoint
pub const DEFAULT_MESSAGE_URL: &str = "http://localhost:8000/api/message";
/// Default streaming endpoint
pub const DEFAULT_STREAM_URL: &str = "http://localhost:8000/api/message_stream";

/// Configuration for [`ReplyClient`](crate::client::ReplyClient)
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Endpoint answering with `{"response": ...}`
    pub message_url: String,
    /// Endpoint answering with a raw text stream
    pub stream_url: String,
    /// Overall limit for one reply (None = wait for the stream to end)
    pub stream_timeout: Option<Duration>,
    /// Connection establishment limit
    pub connect_timeout: Duration,
    /// Reject invalid UTF-8 with `DecodeFailed` instead of substituting U+FFFD
    pub strict_utf8: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            message_url: DEFAULT_MESSAGE_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            stream_timeout: None,
            connect_timeout: Duration::from_secs(10),
            strict_utf8: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let stream_timeout = match env_var("RELAY_STREAM_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_var(
                "RELAY_STREAM_TIMEOUT_SECS",
                &raw,
            )?)),
            None => None,
        };

        Ok(Self {
            message_url: env_var("RELAY_API_URL").unwrap_or(defaults.message_url),
            stream_url: env_var("RELAY_STREAM_URL")
                .or_else(|| env_var("API_URL"))
                .unwrap_or(defaults.stream_url),
            stream_timeout,
            connect_timeout: defaults.connect_timeout,
            strict_utf8: env_var("RELAY_STRICT_UTF8")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    /// Set the streaming endpoint
    #[must_use]
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    /// Set the non-streaming endpoint
    #[must_use]
    pub fn with_message_url(mut self, url: impl Into<String>) -> Self {
        self.message_url = url.into();
        self
    }

    /// Set the overall stream timeout
    #[must_use]
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    /// Use strict UTF-8 decoding
    #[must_use]
    pub fn with_strict_utf8(mut self, strict: bool) -> Self {
        self.strict_utf8 = strict;
        self
    }
}

/// Read an environment variable, treating empty values as unset
#[must_use]
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read a required environment variable
pub fn require_env(key: &'static str) -> Result<String, ConfigError> {
    env_var(key).ok_or(ConfigError::Missing(key))
}

/// Parse a variable's value, naming the variable on failure
pub fn parse_var<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.message_url, DEFAULT_MESSAGE_URL);
        assert_eq!(config.stream_url, DEFAULT_STREAM_URL);
        assert!(config.stream_timeout.is_none());
        assert!(!config.strict_utf8);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::default()
            .with_stream_url("http://backend/stream")
            .with_message_url("http://backend/message")
            .with_stream_timeout(Duration::from_secs(5))
            .with_strict_utf8(true);

        assert_eq!(config.stream_url, "http://backend/stream");
        assert_eq!(config.message_url, "http://backend/message");
        assert_eq!(config.stream_timeout, Some(Duration::from_secs(5)));
        assert!(config.strict_utf8);
    }

    #[test]
    fn test_parse_var_reports_key() {
        let err = parse_var::<u64>("RELAY_STREAM_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("RELAY_STREAM_TIMEOUT_SECS"));
        assert_eq!(parse_var::<u16>("PORT", " 3000 ").unwrap(), 3000);
    }

    #[test]
    fn test_require_env_missing() {
        let err = require_env("RELAY_TEST_DEFINITELY_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }
}
