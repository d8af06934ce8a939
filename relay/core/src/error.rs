//! Error Types
//!
//! Errors produced while fetching a reply from the inference backend and
//! while validating inbound platform events.

use std::time::Duration;

use thiserror::Error;

/// Why a backend request failed
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RequestFailure {
    /// Backend answered with a non-success status
    #[error("backend returned status {0}")]
    Status(u16),

    /// Connection failed before or during streaming
    #[error("transport error: {0}")]
    Transport(String),

    /// The stream did not finish within the configured limit
    #[error("stream timed out after {0:?}")]
    TimedOut(Duration),

    /// Non-streaming reply did not have the expected shape
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

/// Errors surfaced by the reply consumer
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Non-success status or transport error before/during streaming
    #[error("request failed: {0}")]
    RequestFailed(#[from] RequestFailure),

    /// Response bytes were not valid UTF-8 (strict decoding only)
    #[error("invalid UTF-8 in response at byte {offset}")]
    DecodeFailed {
        /// Stream offset of the first invalid byte
        offset: usize,
    },

    /// The caller cancelled the stream
    #[error("stream cancelled")]
    Cancelled,
}

impl FetchError {
    /// Check if this is a `RequestFailed` error
    #[must_use]
    pub fn is_request_failed(&self) -> bool {
        matches!(self, Self::RequestFailed(_))
    }

    /// HTTP status if the backend rejected the request
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed(RequestFailure::Status(code)) => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::RequestFailed(RequestFailure::Status(status.as_u16()));
        }
        Self::RequestFailed(RequestFailure::Transport(e.to_string()))
    }
}

/// Errors from validating a raw platform event payload
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// A required field is absent or not a string
    #[error("event is missing required field `{0}`")]
    MissingField(&'static str),

    /// The payload is not the kind of event this handler accepts
    #[error("unexpected event type `{0}`")]
    UnexpectedType(String),
}

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// An environment variable has an unusable value
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
}
