//! Relay Slack Bot
//!
//! Answers `app_mention` events in Slack with a reply from the relay
//! backend, posted in the mention's thread and addressed to its author.
//!
//! # Usage
//!
//! ```bash
//! SLACK_BOT_TOKEN=xoxb-... SLACK_APP_TOKEN=xapp-... relay-slack
//!
//! # Different backend and health port
//! relay-slack --api-url http://backend:8000/api/message --port 8080
//! ```
//!
//! # Environment Variables
//!
//! - `SLACK_BOT_TOKEN`: Bot token (required)
//! - `SLACK_APP_TOKEN`: App-level token for Socket Mode (required)
//! - `SLACK_SIGNING_SECRET`: Signing secret (optional)
//! - `SLACK_API_URL`: Web API base URL (default: https://slack.com/api)
//! - `RELAY_API_URL`: Backend endpoint (default: http://localhost:8000/api/message)
//! - `RELAY_STREAM_TIMEOUT_SECS`: Limit for one backend reply
//! - `PORT`: Health endpoint port (default: 3000)
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

mod config;
mod error;
mod handler;
mod health;
mod socket_mode;
mod web_api;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use relay_core::{CancellationToken, ClientConfig, ReplyClient};

use crate::config::SlackConfig;
use crate::handler::MentionHandler;
use crate::socket_mode::SocketModeClient;
use crate::web_api::SlackWebClient;

#[derive(Parser, Debug)]
#[command(name = "relay-slack", version, about = "Slack bot for the relay backend")]
struct Args {
    /// Health endpoint port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Backend endpoint answering with `{"response": ...}`
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_slack=info".parse()?)
                .add_directive("relay_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let slack = SlackConfig::from_env().context("Slack credentials missing")?;

    let mut client_config = ClientConfig::from_env().context("Invalid backend configuration")?;
    if let Some(url) = args.api_url {
        client_config = client_config.with_message_url(url);
    }
    info!(
        backend = %client_config.message_url,
        signing_secret = slack.signing_secret.is_some(),
        "Starting Relay Slack bot"
    );

    let source = ReplyClient::new(client_config).context("Failed to build HTTP client")?;
    let web = SlackWebClient::new(&slack);
    let handler = MentionHandler::new(Arc::new(source), Arc::new(web.clone()));
    let socket = SocketModeClient::new(web, handler);

    let health = tokio::spawn(health::serve(args.port));

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        trigger.cancel();
    });

    tokio::select! {
        () = socket.run(&shutdown) => {}
        result = health => {
            // The health server only returns on failure
            match result {
                Ok(Err(e)) => error!(error = %e, "Health endpoint failed"),
                Err(e) => error!(error = %e, "Health endpoint task panicked"),
                Ok(Ok(())) => {}
            }
            shutdown.cancel();
        }
    }

    info!("Relay Slack bot stopped");
    Ok(())
}
