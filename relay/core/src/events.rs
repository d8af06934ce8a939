//! Platform Events
//!
//! Inbound messaging-platform events arrive as loosely typed JSON. They are
//! validated once at the boundary into a fixed struct; anything missing a
//! required field is rejected instead of being trusted further in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;
use crate::mention::strip_mentions;

/// Event type this surface answers
pub const APP_MENTION: &str = "app_mention";

/// A message that mentions the bot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionEvent {
    /// Raw message text, mention tokens included
    pub text: String,
    /// Id of the user who wrote the message
    pub user: String,
    /// Channel the message was posted in
    pub channel: String,
    /// Timestamp id of the message itself
    pub ts: String,
    /// Thread the message belongs to, if it was posted in one
    pub thread_ts: Option<String>,
}

impl MentionEvent {
    /// Validate a raw event object
    pub fn from_payload(event: &Value) -> Result<Self, EventError> {
        let kind = required(event, "type")?;
        if kind != APP_MENTION {
            return Err(EventError::UnexpectedType(kind.to_string()));
        }

        Ok(Self {
            text: required(event, "text")?.to_string(),
            user: required(event, "user")?.to_string(),
            channel: required(event, "channel")?.to_string(),
            ts: required(event, "ts")?.to_string(),
            thread_ts: event
                .get("thread_ts")
                .and_then(Value::as_str)
                .map(String::from),
        })
    }

    /// Text to send to the backend, with mention tokens removed
    #[must_use]
    pub fn prompt(&self) -> String {
        strip_mentions(&self.text)
    }

    /// Thread a reply should be posted under
    ///
    /// Messages outside a thread start one rooted at themselves.
    #[must_use]
    pub fn reply_thread(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

fn required<'a>(event: &'a Value, field: &'static str) -> Result<&'a str, EventError> {
    event
        .get(field)
        .and_then(Value::as_str)
        .ok_or(EventError::MissingField(field))
}
