//! Relay Daemon
//!
//! Inference backend for the relay surfaces. Accepts `{"text": ...}` and
//! answers with a reply produced by a local LLM, either complete or as a raw
//! stream of text deltas.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (0.0.0.0:8000)
//! relay-daemon
//!
//! # Custom address and model
//! relay-daemon --listen 127.0.0.1:9000 --model qwen2.5
//!
//! # With verbose logging
//! RUST_LOG=debug relay-daemon
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_LISTEN`: Listen address (default: 0.0.0.0:8000)
//! - `RELAY_MODEL`: Ollama model name (default: llama3.2)
//! - `RELAY_SYSTEM_PROMPT`: System prompt sent with every request
//! - `RELAY_TEMPERATURE`: Sampling temperature (default: model's own)
//! - `RELAY_MAX_TOKENS`: Reply length limit (default: model's own)
//! - `OLLAMA_HOST`: Ollama server host (default: localhost)
//! - `OLLAMA_PORT`: Ollama server port (default: 11434)
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown

mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use relay_core::{LlmBackend, OllamaBackend};

use crate::server::{build_router, AppState};

/// Default system prompt
const DEFAULT_SYSTEM_PROMPT: &str = "A helpful assistant that provides information and assistance.";

#[derive(Parser, Debug)]
#[command(name = "relay-daemon", version, about = "Inference backend for relay surfaces")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "RELAY_LISTEN", default_value = "0.0.0.0:8000")]
    listen: SocketAddr,

    /// Model to generate replies with
    #[arg(long, env = "RELAY_MODEL", default_value = "llama3.2")]
    model: String,

    /// System prompt sent with every request
    #[arg(long, env = "RELAY_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    system_prompt: String,

    /// Sampling temperature, 0.0-1.0 (default: model's own)
    #[arg(long, env = "RELAY_TEMPERATURE")]
    temperature: Option<f32>,

    /// Reply length limit in tokens (0 = model default)
    #[arg(long, env = "RELAY_MAX_TOKENS", default_value_t = 0)]
    max_tokens: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_daemon=info".parse()?)
                .add_directive("relay_core=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    info!("Starting Relay Daemon");

    let backend = OllamaBackend::from_env().context("Failed to configure Ollama backend")?;
    if backend.health_check().await {
        info!(backend = backend.name(), model = %args.model, "Backend reachable");
    } else {
        // Requests fail with 500 until the backend comes up
        warn!(backend = backend.name(), "Backend not reachable yet");
    }

    let state = AppState {
        backend: Arc::new(backend),
        model: args.model,
        system_prompt: Some(args.system_prompt).filter(|s| !s.trim().is_empty()),
        temperature: args.temperature,
        max_tokens: args.max_tokens,
    };

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Relay Daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
