//! Slack Errors

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors talking to Slack
#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request to the Web API failed
    #[error("Slack HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Web API answered with `ok: false`
    #[error("Slack API error: {0}")]
    Api(String),

    /// Socket Mode WebSocket failed
    #[error("Socket Mode connection failed: {0}")]
    Socket(Box<tungstenite::Error>),

    /// A frame or response could not be parsed
    #[error("invalid Slack payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tungstenite::Error> for SlackError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Socket(Box::new(e))
    }
}
