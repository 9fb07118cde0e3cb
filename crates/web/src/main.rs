//! Web server binary for the counter app

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use tally_web::{server, WebServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let web_addr: SocketAddr = std::env::var("TALLY_WEB_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let cfg = WebServerConfig {
        test_mode: std::env::var("TALLY_WEB_TEST_MODE").map(|v| v == "1").unwrap_or(false),
    };

    info!(
        "Starting tally-web v{} (test_mode: {})",
        tally_core::VERSION,
        cfg.test_mode
    );

    server::serve(web_addr, cfg).await
}
