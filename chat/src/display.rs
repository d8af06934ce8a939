//! Display
//!
//! Turns conversation updates into terminal output. The terminal is
//! append-only, so a growing reply is printed as deltas: the first update
//! of a message prints its prefix and text, later updates print only what
//! was added. A reply whose text is replaced (the fallback after a failure)
//! is printed again on its own line.

use relay_core::{Message, MessageId, MessageStatus, Sender};

/// Prefix printed before a sender's text
#[must_use]
pub fn prefix(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You: ",
        Sender::Bot => "Bot: ",
    }
}

/// Tracks what the terminal already shows
#[derive(Debug, Default)]
pub struct Transcript {
    /// Message currently being printed
    current: Option<MessageId>,
    /// Text of the current message already printed
    shown: String,
    /// Whether the current message's line has been ended
    finished: bool,
}

impl Transcript {
    /// Create an empty transcript
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Output for one bot message update, if anything changed
    ///
    /// User messages are never echoed; the terminal already shows what
    /// was typed.
    pub fn render(&mut self, message: &Message) -> Option<String> {
        if message.sender() == Sender::User {
            return None;
        }

        let mut out = String::new();
        if self.current != Some(message.id()) {
            if self.current.is_some() && !self.finished {
                out.push('\n');
            }
            self.current = Some(message.id());
            self.shown.clear();
            self.finished = false;
            out.push_str(prefix(Sender::Bot));
        } else if self.finished {
            return None;
        }

        match message.text.strip_prefix(self.shown.as_str()) {
            Some(added) => out.push_str(added),
            None => {
                // Text was replaced, not extended
                out.push('\n');
                out.push_str(prefix(Sender::Bot));
                out.push_str(&message.text);
            }
        }
        self.shown.clone_from(&message.text);

        if message.status != MessageStatus::Streaming {
            out.push('\n');
            self.finished = true;
        }

        (!out.is_empty()).then_some(out)
    }
}
