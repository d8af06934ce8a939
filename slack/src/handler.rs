//! Mention Handler
//!
//! Turns one `app_mention` event into one threaded reply: strip the mention
//! tokens, ask the backend for a complete reply, and post it back addressed
//! to the user. A backend failure is answered with a fixed apology instead.

use std::sync::Arc;

use tracing::{info, warn};

use relay_core::{address_reply, MentionEvent, ReplySource};

use crate::error::SlackError;
use crate::web_api::MessagePoster;

/// Reply text when the backend cannot be reached
pub const BACKEND_UNAVAILABLE: &str =
    "Sorry, I'm having trouble connecting to my backend. Please try again later.";

/// What the handler did with an event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    /// A reply was posted
    Replied,
    /// The mention carried no text, nothing was sent
    Skipped,
}

/// Answers mentions using an injected backend and poster
#[derive(Clone)]
pub struct MentionHandler {
    source: Arc<dyn ReplySource>,
    poster: Arc<dyn MessagePoster>,
}

impl MentionHandler {
    /// Create a handler
    pub fn new(source: Arc<dyn ReplySource>, poster: Arc<dyn MessagePoster>) -> Self {
        Self { source, poster }
    }

    /// Handle one mention
    pub async fn handle(&self, event: &MentionEvent) -> Result<Handled, SlackError> {
        let prompt = event.prompt();
        if prompt.is_empty() {
            info!(user = %event.user, channel = %event.channel, "Mention without text, ignoring");
            return Ok(Handled::Skipped);
        }

        let reply = match self.source.fetch_reply(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(user = %event.user, error = %e, "Error fetching bot response");
                BACKEND_UNAVAILABLE.to_string()
            }
        };

        self.poster
            .post_message(
                &event.channel,
                Some(event.reply_thread()),
                &address_reply(&event.user, &reply),
            )
            .await?;

        info!(user = %event.user, channel = %event.channel, "Answered mention");
        Ok(Handled::Replied)
    }
}
