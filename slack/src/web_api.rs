//! Slack Web API
//!
//! The two Web API methods the bot needs:
//!
//! - `apps.connections.open` (app token) - get a Socket Mode WebSocket URL
//! - `chat.postMessage` (bot token) - post a reply
//!
//! Every response carries `ok`; `ok: false` is turned into
//! [`SlackError::Api`] with Slack's error code.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SlackConfig;
use crate::error::SlackError;

/// Default Web API base URL
pub const SLACK_API_URL: &str = "https://slack.com/api";

/// Anything that can post a message into a channel
#[async_trait]
pub trait MessagePoster: Send + Sync {
    /// Post `text` to `channel`, threaded under `thread_ts` when given
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), SlackError>;
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl ApiResponse {
    fn into_result(self) -> Result<Self, SlackError> {
        if self.ok {
            Ok(self)
        } else {
            Err(SlackError::Api(
                self.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

/// Slack Web API client
#[derive(Clone)]
pub struct SlackWebClient {
    http_client: reqwest::Client,
    base_url: String,
    bot_token: String,
    app_token: String,
}

impl SlackWebClient {
    /// Create a client from the configured credentials and base URL
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config.api_url.clone(),
            bot_token: config.bot_token.clone(),
            app_token: config.app_token.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), method)
    }

    /// Open a Socket Mode connection, returning the WebSocket URL
    pub async fn open_connection(&self) -> Result<String, SlackError> {
        let response: ApiResponse = self
            .http_client
            .post(self.method_url("apps.connections.open"))
            .bearer_auth(&self.app_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .into_result()?
            .url
            .ok_or_else(|| SlackError::Api("missing_url".to_string()))
    }
}

#[async_trait]
impl MessagePoster for SlackWebClient {
    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), SlackError> {
        let body = PostMessage {
            channel,
            text,
            thread_ts,
        };
        let response: ApiResponse = self
            .http_client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_result()?;
        debug!(channel = %channel, thread_ts = ?thread_ts, "Reply posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    async fn fake_slack(ok: bool) -> (SocketAddr, Seen) {
        let seen: Seen = Arc::default();
        let record = seen.clone();
        let router = Router::new()
            .route(
                "/apps.connections.open",
                post(move |headers: HeaderMap| async move {
                    let auth = headers["authorization"].to_str().unwrap_or_default().to_string();
                    if ok && auth == "Bearer xapp-1" {
                        Json(json!({ "ok": true, "url": "wss://example.invalid/link" }))
                    } else {
                        Json(json!({ "ok": false, "error": "invalid_auth" }))
                    }
                }),
            )
            .route(
                "/chat.postMessage",
                post(move |headers: HeaderMap, Json(body): Json<Value>| {
                    let record = record.clone();
                    async move {
                        let auth = headers["authorization"].to_str().unwrap_or_default();
                        record.lock().unwrap().push((auth.to_string(), body));
                        if ok {
                            Json(json!({ "ok": true }))
                        } else {
                            Json(json!({ "ok": false, "error": "channel_not_found" }))
                        }
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (addr, seen)
    }

    fn client(addr: SocketAddr) -> SlackWebClient {
        let config = SlackConfig {
            bot_token: "xoxb-1".to_string(),
            app_token: "xapp-1".to_string(),
            signing_secret: None,
            api_url: format!("http://{addr}/"),
        };
        SlackWebClient::new(&config)
    }

    #[tokio::test]
    async fn test_open_connection_uses_app_token() {
        let (addr, _) = fake_slack(true).await;
        let url = client(addr).open_connection().await.unwrap();
        assert_eq!(url, "wss://example.invalid/link");
    }

    #[tokio::test]
    async fn test_open_connection_api_error() {
        let (addr, _) = fake_slack(false).await;
        let err = client(addr).open_connection().await.unwrap_err();
        assert!(matches!(err, SlackError::Api(code) if code == "invalid_auth"));
    }

    #[tokio::test]
    async fn test_post_message_threaded() {
        let (addr, seen) = fake_slack(true).await;
        client(addr)
            .post_message("C01", Some("1715000000.000100"), "<@U42>, 4")
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "Bearer xoxb-1");
        assert_eq!(
            seen[0].1,
            json!({
                "channel": "C01",
                "text": "<@U42>, 4",
                "thread_ts": "1715000000.000100"
            })
        );
    }

    #[tokio::test]
    async fn test_post_message_api_error() {
        let (addr, _) = fake_slack(false).await;
        let err = client(addr)
            .post_message("C404", None, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, SlackError::Api(code) if code == "channel_not_found"));
    }
}
