//! Streaming Reply Consumer
//!
//! Sends one user message to the inference backend and hands the reply back
//! to the caller as it arrives.
//!
//! # Reading the stream
//!
//! The streaming endpoint answers with raw text chunked however the transport
//! likes. Each chunk is run through an incremental UTF-8 decoder and every
//! non-empty piece of text is passed to the caller's fragment callback right
//! away, in arrival order. Fragments already delivered are never retracted,
//! even if the stream fails later.
//!
//! # Usage
//!
//! ```ignore
//! use relay_core::{ClientConfig, ReplyClient};
//!
//! let client = ReplyClient::new(ClientConfig::from_env()?)?;
//! let mut reply = String::new();
//! client.consume("2+2?", |fragment| reply.push_str(fragment)).await?;
//! ```

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::decode::Utf8Decoder;
use crate::error::{FetchError, RequestFailure};
use crate::protocol::{MessageRequest, MessageResponse};

/// Anything that can produce a reply for a user message
///
/// [`ReplyClient`] talks to the HTTP backend; tests and alternative
/// transports implement this directly.
#[async_trait]
pub trait ReplySource: Send + Sync {
    /// Stream a reply, calling `on_fragment` for each piece of text
    ///
    /// Must stop calling `on_fragment` once `cancel` fires.
    async fn stream_reply(
        &self,
        input: &str,
        cancel: &CancellationToken,
        on_fragment: &mut (dyn for<'f> FnMut(&'f str) + Send),
    ) -> Result<(), FetchError>;

    /// Fetch the complete reply as a single value
    async fn fetch_reply(&self, input: &str) -> Result<String, FetchError>;
}

/// HTTP client for the inference backend
#[derive(Clone)]
pub struct ReplyClient {
    /// Endpoints and limits
    config: ClientConfig,
    /// HTTP client
    http_client: reqwest::Client,
}

impl ReplyClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `input` to the streaming endpoint and deliver the reply fragments
    pub async fn consume<F>(&self, input: &str, on_fragment: F) -> Result<(), FetchError>
    where
        F: FnMut(&str) + Send,
    {
        self.consume_with_cancel(input, &CancellationToken::new(), on_fragment)
            .await
    }

    /// Like [`consume`](Self::consume), stopping early when `cancel` fires
    ///
    /// On cancellation the response body is dropped, which releases the
    /// connection, and `FetchError::Cancelled` is returned.
    pub async fn consume_with_cancel<F>(
        &self,
        input: &str,
        cancel: &CancellationToken,
        mut on_fragment: F,
    ) -> Result<(), FetchError>
    where
        F: FnMut(&str) + Send,
    {
        let url = self.config.stream_url.as_str();
        let start = Instant::now();

        let read = async {
            let response = self.post(url, input).await?;
            let mut decoder = self.decoder();
            consume_stream(response.bytes_stream(), &mut decoder, &mut on_fragment).await
        };

        match race(read, cancel, self.config.stream_timeout).await {
            Ok(fragments) => {
                tracing::debug!(
                    url = %url,
                    fragments,
                    elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Reply stream complete"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Reply stream ended with error");
                Err(e)
            }
        }
    }

    /// Send `input` to the non-streaming endpoint and return the whole reply
    pub async fn fetch_reply(&self, input: &str) -> Result<String, FetchError> {
        let url = self.config.message_url.as_str();

        let fetch = async {
            let response = self.post(url, input).await?;
            let body = response.text().await?;
            let reply: MessageResponse = serde_json::from_str(&body)
                .map_err(|e| RequestFailure::MalformedBody(e.to_string()))?;
            Ok::<_, FetchError>(reply.response)
        };

        race(fetch, &CancellationToken::new(), self.config.stream_timeout)
            .await
            .inspect_err(|e| tracing::warn!(url = %url, error = %e, "Reply request failed"))
    }

    async fn post(&self, url: &str, input: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .http_client
            .post(url)
            .json(&MessageRequest::new(input))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestFailure::Status(status.as_u16()).into());
        }
        Ok(response)
    }

    fn decoder(&self) -> Utf8Decoder {
        if self.config.strict_utf8 {
            Utf8Decoder::strict()
        } else {
            Utf8Decoder::lossy()
        }
    }
}

#[async_trait]
impl ReplySource for ReplyClient {
    async fn stream_reply(
        &self,
        input: &str,
        cancel: &CancellationToken,
        on_fragment: &mut (dyn for<'f> FnMut(&'f str) + Send),
    ) -> Result<(), FetchError> {
        self.consume_with_cancel(input, cancel, on_fragment).await
    }

    async fn fetch_reply(&self, input: &str) -> Result<String, FetchError> {
        ReplyClient::fetch_reply(self, input).await
    }
}

/// Read a byte stream to the end, delivering decoded text fragments
///
/// Returns the number of fragments delivered. Chunks that decode to nothing
/// (a held-back partial character) produce no callback. An error item ends
/// the loop with `RequestFailed(Transport)`.
pub async fn consume_stream<S, B, E, F>(
    stream: S,
    decoder: &mut Utf8Decoder,
    mut on_fragment: F,
) -> Result<u32, FetchError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&str),
{
    futures::pin_mut!(stream);
    let mut delivered = 0;

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| RequestFailure::Transport(e.to_string()))?;
        let text = decoder.decode(bytes.as_ref())?;
        if !text.is_empty() {
            on_fragment(&text);
            delivered += 1;
        }
    }

    if let Some(tail) = decoder.finish()? {
        on_fragment(&tail);
        delivered += 1;
    }

    Ok(delivered)
}

/// Race `work` against cancellation and an optional deadline
///
/// Whichever loses is dropped, taking any open response body with it.
async fn race<T>(
    work: impl Future<Output = Result<T, FetchError>>,
    cancel: &CancellationToken,
    limit: Option<Duration>,
) -> Result<T, FetchError> {
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::Cancelled),
        () = deadline => Err(RequestFailure::TimedOut(limit.unwrap_or_default()).into()),
        result = work => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::stream;
    use pretty_assertions::assert_eq;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<&'static [u8], String>> {
        stream::iter(parts.iter().map(|p| Ok::<_, String>(*p)).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_fragments_delivered_in_order() {
        let mut seen = Vec::new();
        let mut decoder = Utf8Decoder::lossy();
        let count = consume_stream(
            chunks(&[b"The ", b"answer ", b"is 4"]),
            &mut decoder,
            |f: &str| seen.push(f.to_string()),
        )
        .await
        .unwrap();

        assert_eq!(count, 3);
        assert_eq!(seen, vec!["The ", "answer ", "is 4"]);
    }

    #[tokio::test]
    async fn test_concatenation_matches_delivery() {
        let parts: &[&'static [u8]] = &[b"a", b"", b"bc", b"def", b"g"];
        let mut text = String::new();
        let mut decoder = Utf8Decoder::lossy();
        consume_stream(chunks(parts), &mut decoder, |f: &str| text.push_str(f))
            .await
            .unwrap();

        assert_eq!(text, "abcdefg");
    }

    #[tokio::test]
    async fn test_empty_stream_is_not_an_error() {
        let mut calls = 0;
        let mut decoder = Utf8Decoder::lossy();
        let count = consume_stream(chunks(&[]), &mut decoder, |_: &str| calls += 1)
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_split_character_is_reassembled() {
        // "ü" = 0xC3 0xBC
        let mut text = String::new();
        let mut decoder = Utf8Decoder::strict();
        let count = consume_stream(
            chunks(&[b"gr\xC3", b"\xBCn"]),
            &mut decoder,
            |f: &str| text.push_str(f),
        )
        .await
        .unwrap();

        assert_eq!(text, "grün");
        assert!(!text.contains('\u{FFFD}'));
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_delivered_fragments() {
        let items: Vec<Result<&'static [u8], String>> = vec![
            Ok(&b"partial "[..]),
            Err("connection reset".to_string()),
            Ok(&b"never seen"[..]),
        ];
        let mut text = String::new();
        let mut decoder = Utf8Decoder::lossy();
        let err = consume_stream(stream::iter(items), &mut decoder, |f: &str| {
            text.push_str(f);
        })
        .await
        .unwrap_err();

        assert_eq!(text, "partial ");
        assert_eq!(
            err,
            FetchError::RequestFailed(RequestFailure::Transport("connection reset".into()))
        );
    }

    #[tokio::test]
    async fn test_race_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), _> = race(std::future::pending(), &cancel, None).await;
        assert_eq!(result, Err(FetchError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_timeout_is_request_failure() {
        let limit = Duration::from_secs(3);
        let result: Result<(), _> =
            race(std::future::pending(), &CancellationToken::new(), Some(limit)).await;
        assert_eq!(
            result,
            Err(FetchError::RequestFailed(RequestFailure::TimedOut(limit)))
        );
    }

    #[tokio::test]
    async fn test_race_passes_result_through() {
        let result = race(async { Ok(5) }, &CancellationToken::new(), None).await;
        assert_eq!(result, Ok(5));
    }
}
