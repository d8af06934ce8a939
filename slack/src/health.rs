//! Health Endpoint
//!
//! Answers every request with 200 `OK`, whatever the path or method, so
//! hosting platforms can probe the process. It does not look at Slack or
//! backend state.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Router answering everything with `OK`
pub fn router() -> Router {
    Router::new().fallback(|| async { "OK" })
}

/// Serve the health endpoint until the process exits
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Health endpoint listening");
    axum::serve(listener, router()).await?;
    Ok(())
}
