//! Server entry point.

use clap::Parser;
use ggchat_axum::{ServerConfig, start_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ggchat=debug")),
        )
        .init();

    let config = ServerConfig::parse();
    start_server(config).await
}
