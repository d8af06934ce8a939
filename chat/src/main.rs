//! Relay Chat
//!
//! Terminal chat against the relay backend's streaming endpoint. Replies are
//! printed as they arrive.
//!
//! # Usage
//!
//! ```bash
//! relay-chat
//!
//! # Another backend, give up on replies after 30 seconds
//! relay-chat --stream-url http://backend:8000/api/message_stream --timeout-secs 30
//! ```
//!
//! Type `/quit` or press Ctrl-D to leave. Ctrl-C stops the reply being
//! streamed.
//!
//! # Environment Variables
//!
//! - `RELAY_STREAM_URL` / `API_URL`: Streaming endpoint
//!   (default: http://localhost:8000/api/message_stream)
//! - `RELAY_STREAM_TIMEOUT_SECS`: Limit for one reply
//! - `RELAY_STRICT_UTF8`: Reject invalid UTF-8 in replies
//! - `RUST_LOG`: Log level, written to stderr (default: warn)

mod display;
mod repl;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use relay_core::{ClientConfig, ReplyClient};

#[derive(Parser, Debug)]
#[command(name = "relay-chat", version, about = "Terminal chat for the relay backend")]
struct Args {
    /// Streaming endpoint
    #[arg(long)]
    stream_url: Option<String>,

    /// Give up on a reply after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout is the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_chat=warn".parse()?)
                .add_directive("relay_core=warn".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env().context("Invalid backend configuration")?;
    if let Some(url) = args.stream_url {
        config = config.with_stream_url(url);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_stream_timeout(Duration::from_secs(secs));
    }
    tracing::info!(url = %config.stream_url, "Starting Relay Chat");

    let client = ReplyClient::new(config).context("Failed to build HTTP client")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(repl::print_output(rx));

    let stdin = BufReader::new(tokio::io::stdin());
    let result = repl::run_chat(stdin, &client, tx).await;

    // Sender dropped with run_chat; the printer drains and exits
    printer.await.context("Printer task failed")??;
    result.map(|_| ())
}
