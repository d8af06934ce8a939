//! Mention Handling
//!
//! Platform messages that address the bot carry mention tokens such as
//! `<@U123ABC>`. They are stripped before the text is sent to the backend,
//! and replies are addressed back to the user with the same token form.

use std::sync::OnceLock;

use regex::Regex;

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<@[A-Z0-9]+>").expect("hardcoded regex"))
}

/// Remove every `<@ID>` mention token and trim the rest
#[must_use]
pub fn strip_mentions(text: &str) -> String {
    mention_pattern().replace_all(text, "").trim().to_string()
}

/// Address `reply` to `user` (`<@USER>, reply`)
#[must_use]
pub fn address_reply(user: &str, reply: &str) -> String {
    format!("<@{user}>, {reply}")
}
