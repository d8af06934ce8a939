//! Slack Configuration
//!
//! Environment variables:
//! - `SLACK_BOT_TOKEN`: bot token (`xoxb-`), used to post replies (required)
//! - `SLACK_APP_TOKEN`: app-level token (`xapp-`), used to open Socket Mode
//!   connections (required)
//! - `SLACK_SIGNING_SECRET`: request signing secret (optional; Socket Mode
//!   does not sign requests)
//! - `SLACK_API_URL`: Web API base URL (default `https://slack.com/api`)

use relay_core::config::{env_var, require_env};
use relay_core::ConfigError;

use crate::web_api::SLACK_API_URL;

/// Slack credentials
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot token for the Web API
    pub bot_token: String,
    /// App-level token for Socket Mode
    pub app_token: String,
    /// Signing secret, if configured
    pub signing_secret: Option<String>,
    /// Web API base URL
    pub api_url: String,
}

impl SlackConfig {
    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: require_env("SLACK_BOT_TOKEN")?,
            app_token: require_env("SLACK_APP_TOKEN")?,
            signing_secret: env_var("SLACK_SIGNING_SECRET"),
            api_url: env_var("SLACK_API_URL").unwrap_or_else(|| SLACK_API_URL.to_string()),
        })
    }
}

// Tokens stay out of logs
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"<redacted>")
            .field("app_token", &"<redacted>")
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}
