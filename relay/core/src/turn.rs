//! Turn Orchestration
//!
//! One turn is one user input and the bot reply to it:
//!
//! 1. the trimmed input is appended as a user message (empty input is
//!    rejected before anything is appended or sent),
//! 2. an empty placeholder bot message is appended,
//! 3. the reply is streamed into the placeholder, which is rewritten with
//!    the accumulated text after every fragment,
//! 4. on failure the placeholder text is replaced by [`FALLBACK_REPLY`].
//!
//! Fetch errors never escape a turn; they are folded into the
//! [`TurnReport`]. The conversation is borrowed mutably for the whole turn,
//! so a conversation runs one turn at a time.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::ReplySource;
use crate::conversation::Conversation;
use crate::error::FetchError;
use crate::messages::{Message, MessageId, MessageStatus};
use crate::session::{StreamOutcome, StreamSession};

/// Text shown in place of a reply that could not be fetched
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again later.";

/// Input that cannot start a turn
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    /// Input was empty or whitespace only
    #[error("input is empty")]
    EmptyInput,
}

/// How the reply part of a turn ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream finished normally
    Completed,
    /// The request failed; the placeholder shows [`FALLBACK_REPLY`]
    Failed(FetchError),
    /// The caller cancelled; the placeholder keeps its partial text
    Cancelled,
}

/// Result of a turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    /// The user's message
    pub user_message: MessageId,
    /// The bot reply message
    pub reply_message: MessageId,
    /// Fragments written into the reply
    pub fragments: u32,
    /// How the reply ended
    pub outcome: TurnOutcome,
}

impl TurnReport {
    /// Check if the reply completed normally
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.outcome == TurnOutcome::Completed
    }
}

/// Run one turn against `source`
///
/// `on_update` is called with every message the turn appends or rewrites,
/// right after the change, so a live surface can re-render it.
pub async fn run_turn<S, U>(
    conversation: &mut Conversation,
    source: &S,
    input: &str,
    on_update: U,
) -> Result<TurnReport, TurnError>
where
    S: ReplySource + ?Sized,
    U: FnMut(&Message) + Send,
{
    run_turn_with_cancel(conversation, source, input, &CancellationToken::new(), on_update).await
}

/// Run one turn, stopping the reply stream when `cancel` fires
pub async fn run_turn_with_cancel<S, U>(
    conversation: &mut Conversation,
    source: &S,
    input: &str,
    cancel: &CancellationToken,
    mut on_update: U,
) -> Result<TurnReport, TurnError>
where
    S: ReplySource + ?Sized,
    U: FnMut(&Message) + Send,
{
    let text = input.trim();
    if text.is_empty() {
        return Err(TurnError::EmptyInput);
    }

    let user_message = conversation.append(Message::user(text));
    notify(conversation, user_message, &mut on_update);
    let reply_message = conversation.append(Message::placeholder());
    notify(conversation, reply_message, &mut on_update);

    let mut session = StreamSession::new(reply_message);
    tracing::debug!(reply = %session.message_id(), "Turn started");

    let result = {
        let mut on_fragment = |fragment: &str| {
            let accumulated = session.push(fragment);
            if conversation.update_text(reply_message, accumulated) {
                notify(conversation, reply_message, &mut on_update);
            }
        };
        source.stream_reply(text, cancel, &mut on_fragment).await
    };

    let failure = match result {
        Ok(()) => {
            session.close(StreamOutcome::Completed);
            None
        }
        Err(FetchError::Cancelled) => {
            session.close(StreamOutcome::Cancelled);
            None
        }
        Err(e) => {
            session.close(StreamOutcome::Failed);
            Some(e)
        }
    };

    let outcome = match (session.outcome(), failure) {
        (StreamOutcome::Failed, Some(e)) => {
            conversation.update_text(reply_message, FALLBACK_REPLY);
            conversation.set_status(reply_message, MessageStatus::Failed);
            tracing::warn!(
                reply = %reply_message,
                discarded_bytes = session.text().len(),
                error = %e,
                "Turn failed, showing fallback reply"
            );
            TurnOutcome::Failed(e)
        }
        (StreamOutcome::Cancelled, _) => {
            conversation.set_status(reply_message, MessageStatus::Failed);
            tracing::info!(reply = %reply_message, "Turn cancelled");
            TurnOutcome::Cancelled
        }
        _ => {
            conversation.set_status(reply_message, MessageStatus::Complete);
            TurnOutcome::Completed
        }
    };
    notify(conversation, reply_message, &mut on_update);

    Ok(TurnReport {
        user_message,
        reply_message,
        fragments: session.fragment_count(),
        outcome,
    })
}

fn notify<U>(conversation: &Conversation, id: MessageId, on_update: &mut U)
where
    U: FnMut(&Message),
{
    if let Some(message) = conversation.get_message(id) {
        on_update(message);
    }
}
