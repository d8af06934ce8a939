//! Relay Core - Streaming Chat Relay Logic
//!
//! This crate holds everything the relay surfaces share: the streaming reply
//! consumer, conversation state, turn orchestration, and validation of
//! inbound platform events. It has no opinion about how messages are shown.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        Surfaces                            │
//! │   ┌──────────────┐   ┌──────────────┐   ┌───────────────┐  │
//! │   │ relay-chat   │   │ relay-slack  │   │ relay-daemon  │  │
//! │   │ (terminal)   │   │ (bot)        │   │ (HTTP API)    │  │
//! │   └──────┬───────┘   └──────┬───────┘   └───────┬───────┘  │
//! │          │ run_turn         │ fetch_reply       │          │
//! └──────────┼──────────────────┼───────────────────┼──────────┘
//!            │                  │                   │
//! ┌──────────┼──────────────────┼───────────────────┼──────────┐
//! │          ▼                  ▼                   ▼          │
//! │   ┌──────────────┐   ┌──────────────┐   ┌───────────────┐  │
//! │   │ Conversation │   │ ReplyClient  │   │  LlmBackend   │  │
//! │   │ + Session    │◄──│ + Utf8Decoder│   │  (Ollama)     │  │
//! │   └──────────────┘   └──────────────┘   └───────────────┘  │
//! │                       RELAY CORE                           │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ReplyClient`]: Sends a message and streams the reply back as fragments
//! - [`ReplySource`]: Trait seam the surfaces depend on instead of HTTP
//! - [`Conversation`]: Ordered message log with in-place updates by id
//! - [`StreamSession`]: Accumulator for one reply stream
//! - [`run_turn`]: One user input and its streamed reply
//!
//! # Quick Start
//!
//! ```ignore
//! use relay_core::{run_turn, ClientConfig, Conversation, ReplyClient};
//!
//! let client = ReplyClient::new(ClientConfig::from_env()?)?;
//! let mut conversation = Conversation::with_greeting();
//! let report = run_turn(&mut conversation, &client, "2+2?", |message| {
//!     println!("{}: {}", message.id(), message.text);
//! })
//! .await?;
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: LLM backend abstraction used by the daemon (Ollama)
//! - [`client`]: Streaming reply consumer
//! - [`config`]: Client configuration and environment helpers
//! - [`conversation`]: Conversation state
//! - [`decode`]: Incremental UTF-8 decoding
//! - [`error`]: Error types
//! - [`events`]: Inbound platform event validation
//! - [`mention`]: Mention token handling
//! - [`messages`]: Message records
//! - [`protocol`]: Request and response bodies
//! - [`session`]: Per-stream accumulator
//! - [`turn`]: Turn orchestration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod client;
pub mod config;
pub mod conversation;
pub mod decode;
pub mod error;
pub mod events;
pub mod mention;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod turn;

// Re-exports for convenience
pub use backend::{LlmBackend, LlmRequest, LlmResponse, OllamaBackend, StreamingToken};
pub use client::{consume_stream, ReplyClient, ReplySource};
pub use config::ClientConfig;
pub use conversation::{Conversation, GREETING};
pub use decode::Utf8Decoder;
pub use error::{ConfigError, EventError, FetchError, RequestFailure};
pub use events::MentionEvent;
pub use mention::{address_reply, strip_mentions};
pub use messages::{Message, MessageId, MessageStatus, Sender};
pub use protocol::{MessageRequest, MessageResponse};
pub use session::{StreamOutcome, StreamSession};
pub use tokio_util::sync::CancellationToken;
pub use turn::{run_turn, run_turn_with_cancel, TurnError, TurnOutcome, TurnReport, FALLBACK_REPLY};
