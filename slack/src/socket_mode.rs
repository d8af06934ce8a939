//! Socket Mode
//!
//! Slack delivers events over a WebSocket instead of HTTP callbacks:
//!
//! 1. `apps.connections.open` returns a single-use `wss://` URL
//! 2. Slack sends `hello` once the socket is ready
//! 3. Every event arrives in an envelope that must be acknowledged by
//!    sending `{"envelope_id": ...}` back within a few seconds
//! 4. Slack sends `disconnect` before it closes the socket; the client then
//!    opens a fresh connection
//!
//! Envelopes are acknowledged before the event is handled. Mentions are
//! handled on their own task so a slow backend never delays later acks.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use relay_core::{CancellationToken, EventError, MentionEvent};

use crate::error::SlackError;
use crate::handler::MentionHandler;
use crate::web_api::SlackWebClient;

/// Pause before reconnecting after a failed connection
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
}

/// One decoded Socket Mode frame
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Connection is ready
    Hello,
    /// Slack is about to close the connection
    Disconnect {
        /// Why, e.g. `refresh_requested`
        reason: Option<String>,
    },
    /// An Events API callback
    EventsApi {
        /// Id to acknowledge
        envelope_id: String,
        /// The inner `event` object
        event: Value,
    },
    /// Any other envelope (slash commands, interactivity, ...)
    Other {
        /// Envelope type
        kind: String,
        /// Id to acknowledge, if the envelope has one
        envelope_id: Option<String>,
    },
}

impl Frame {
    /// Decode a text frame
    pub fn parse(text: &str) -> Result<Self, SlackError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(match envelope.kind.as_str() {
            "hello" => Self::Hello,
            "disconnect" => Self::Disconnect {
                reason: envelope.reason,
            },
            "events_api" => match envelope.envelope_id {
                Some(envelope_id) => Self::EventsApi {
                    envelope_id,
                    event: envelope
                        .payload
                        .and_then(|mut p| p.get_mut("event").map(Value::take))
                        .unwrap_or(Value::Null),
                },
                None => Self::Other {
                    kind: envelope.kind,
                    envelope_id: None,
                },
            },
            _ => Self::Other {
                kind: envelope.kind,
                envelope_id: envelope.envelope_id,
            },
        })
    }

    /// Envelope id that must be acknowledged, if any
    #[must_use]
    pub fn envelope_id(&self) -> Option<&str> {
        match self {
            Self::EventsApi { envelope_id, .. } => Some(envelope_id),
            Self::Other { envelope_id, .. } => envelope_id.as_deref(),
            Self::Hello | Self::Disconnect { .. } => None,
        }
    }
}

/// Acknowledgement frame for an envelope
#[must_use]
pub fn ack(envelope_id: &str) -> String {
    json!({ "envelope_id": envelope_id }).to_string()
}

/// How a single connection ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Slack asked us to reconnect
    Refresh,
    /// The socket closed
    Closed,
    /// Shutdown was requested
    Shutdown,
}

/// Socket Mode client
pub struct SocketModeClient {
    web: SlackWebClient,
    handler: MentionHandler,
}

impl SocketModeClient {
    /// Create a client
    pub fn new(web: SlackWebClient, handler: MentionHandler) -> Self {
        Self { web, handler }
    }

    /// Receive events until `shutdown` fires, reconnecting as needed
    pub async fn run(&self, shutdown: &CancellationToken) {
        while !shutdown.is_cancelled() {
            match self.connect_once(shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Refresh) => info!("Reconnecting at Slack's request"),
                Ok(SessionEnd::Closed) => {
                    warn!("Socket Mode connection closed, reconnecting");
                    self.pause(shutdown).await;
                }
                Err(e) => {
                    warn!(error = %e, delay_secs = RECONNECT_DELAY.as_secs(), "Socket Mode connection failed");
                    self.pause(shutdown).await;
                }
            }
        }
        info!("Socket Mode client stopped");
    }

    async fn pause(&self, shutdown: &CancellationToken) {
        tokio::select! {
            () = shutdown.cancelled() => {}
            () = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }

    async fn connect_once(&self, shutdown: &CancellationToken) -> Result<SessionEnd, SlackError> {
        let url = self.web.open_connection().await?;
        let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        debug!("Socket Mode WebSocket connected");

        loop {
            let next = tokio::select! {
                () = shutdown.cancelled() => {
                    let _ = ws.close(None).await;
                    return Ok(SessionEnd::Shutdown);
                }
                next = ws.next() => next,
            };

            let text = match next {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            };

            let frame = match Frame::parse(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "Unreadable Socket Mode frame");
                    continue;
                }
            };

            if let Some(envelope_id) = frame.envelope_id() {
                ws.send(Message::Text(ack(envelope_id))).await?;
            }

            match frame {
                Frame::Hello => info!("Connected to Slack"),
                Frame::Disconnect { reason } => {
                    info!(reason = ?reason, "Slack requested disconnect");
                    return Ok(SessionEnd::Refresh);
                }
                Frame::EventsApi { event, .. } => self.dispatch(&event),
                Frame::Other { kind, .. } => debug!(kind = %kind, "Ignoring envelope"),
            }
        }
    }

    fn dispatch(&self, event: &Value) {
        let mention = match MentionEvent::from_payload(event) {
            Ok(mention) => mention,
            Err(EventError::UnexpectedType(kind)) => {
                debug!(kind = %kind, "Ignoring event");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Rejected malformed app_mention event");
                return;
            }
        };

        let handler = self.handler.clone();
        tokio::spawn(async move {
            if let Err(e) = handler.handle(&mention).await {
                warn!(user = %mention.user, error = %e, "Error handling app_mention event");
            }
        });
    }
}
