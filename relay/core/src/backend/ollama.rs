//! Ollama Backend Implementation
//!
//! LLM backend for Ollama (local LLM server).
//!
//! # Ollama API
//!
//! - `/api/generate` - Generate completions (streaming or batch)
//! - `/api/tags` - List available models (used as a health probe)
//!
//! Streaming responses are newline-delimited JSON objects, each carrying a
//! `response` token and a `done` flag.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::traits::{LlmBackend, LlmRequest, LlmResponse, StreamingToken};
use crate::config::{env_var, parse_var};
use crate::decode::Utf8Decoder;

/// Ollama backend client
#[derive(Clone)]
pub struct OllamaBackend {
    /// Host address
    host: String,
    /// Port number
    port: u16,
    /// HTTP client
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize, Default)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    eval_count: Option<u32>,
    error: Option<String>,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, reqwest::Error> {
        Ok(Self {
            host: host.into(),
            port,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?,
        })
    }

    /// Create from environment variables (`OLLAMA_HOST`, `OLLAMA_PORT`)
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env_var("OLLAMA_HOST").unwrap_or_else(|| "localhost".to_string());
        let port = match env_var("OLLAMA_PORT") {
            Some(raw) => parse_var::<u16>("OLLAMA_PORT", &raw)?,
            None => 11434,
        };
        Ok(Self::new(host, port)?)
    }

    /// Get the base URL
    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Get generate endpoint URL
    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url())
    }

    /// Get tags endpoint URL
    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url())
    }

    fn build_request<'a>(request: &'a LlmRequest, stream: bool) -> GenerateRequest<'a> {
        let options = (request.temperature.is_some() || request.max_tokens > 0).then(|| {
            GenerateOptions {
                temperature: request.temperature,
                num_predict: (request.max_tokens > 0).then_some(request.max_tokens),
            }
        });

        GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream,
            system: request.system.as_deref(),
            options,
        }
    }

    async fn post_generate(
        &self,
        request: &LlmRequest,
        stream: bool,
    ) -> anyhow::Result<reqwest::Response> {
        let response = self
            .http_client
            .post(self.generate_url())
            .json(&Self::build_request(request, stream))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama returned {status}: {body}");
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn send_streaming(
        &self,
        request: &LlmRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamingToken>> {
        let (tx, rx) = mpsc::channel(100);
        let mut stream = self.post_generate(request, true).await?.bytes_stream();

        // Spawn task to process stream
        tokio::spawn(async move {
            let mut decoder = Utf8Decoder::lossy();
            let mut lines = LineBuffer::default();
            let mut full_response = String::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(StreamingToken::Error(e.to_string())).await;
                        return;
                    }
                };
                let text = decoder.decode(&bytes).unwrap_or_default();

                for line in lines.push(&text) {
                    if forward_line(&line, &tx, &mut full_response).await == LineStep::Stop {
                        return;
                    }
                }
            }

            // Body ended; the last line may lack its newline
            if let Ok(Some(tail)) = decoder.finish() {
                lines.push(&tail);
            }
            if let Some(line) = lines.finish() {
                if forward_line(&line, &tx, &mut full_response).await == LineStep::Stop {
                    return;
                }
            }

            // Stream ended without done signal
            if !full_response.is_empty() {
                let _ = tx
                    .send(StreamingToken::Complete {
                        message: full_response,
                    })
                    .await;
            }
        });

        Ok(rx)
    }

    async fn send(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse> {
        let start = Instant::now();
        let data: GenerateChunk = self.post_generate(request, false).await?.json().await?;

        if let Some(error) = data.error {
            anyhow::bail!("Ollama error: {error}");
        }

        Ok(LlmResponse {
            content: data.response,
            model: request.model.clone(),
            tokens_used: data.eval_count,
            duration_ms: Some(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)),
        })
    }
}

/// Splits decoded text into complete, non-empty lines
#[derive(Debug, Default)]
struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    fn push(&mut self, text: &str) -> Vec<String> {
        self.partial.push_str(text);
        let mut lines = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let line = self.partial[..pos].trim().to_string();
            self.partial.drain(..=pos);
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Take whatever follows the last newline
    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.partial).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

/// Whether the stream task keeps reading after a line
#[derive(Debug, PartialEq, Eq)]
enum LineStep {
    Continue,
    Stop,
}

/// Forward one NDJSON line to the receiver
async fn forward_line(
    line: &str,
    tx: &mpsc::Sender<StreamingToken>,
    full_response: &mut String,
) -> LineStep {
    let data = match serde_json::from_str::<GenerateChunk>(line) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unparseable Ollama line");
            return LineStep::Continue;
        }
    };

    if let Some(error) = data.error {
        let _ = tx.send(StreamingToken::Error(error)).await;
        return LineStep::Stop;
    }

    if !data.response.is_empty() {
        full_response.push_str(&data.response);
        if tx.send(StreamingToken::Token(data.response)).await.is_err() {
            // Receiver dropped, stop streaming
            return LineStep::Stop;
        }
    }

    if data.done {
        let _ = tx
            .send(StreamingToken::Complete {
                message: std::mem::take(full_response),
            })
            .await;
        return LineStep::Stop;
    }

    LineStep::Continue
}
