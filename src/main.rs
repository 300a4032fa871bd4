//! Cadastre Server
//!
//! Run with: cargo run
//!
//! Configuration comes from `CADASTRE_*` environment variables, see
//! [`cadastre::config`]. RUST_LOG sets the log level (default: info).

use cadastre::api::run_server;
use cadastre::config::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadastre=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    tracing::info!("Cadastre configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!("  Dataset: {}", config.data_source);
    match config.cache_ttl {
        Some(ttl) => tracing::info!("  Cache TTL: {} seconds", ttl.as_secs()),
        None => tracing::info!("  Cache TTL: process lifetime"),
    }
    tracing::info!("  Users: {}", config.users_path.display());
    tracing::info!("  Query log: {}", config.log_path.display());
    tracing::info!("  Access requests: {}", config.pending_path.display());
    if let Some(path) = &config.column_map {
        tracing::info!("  Column map: {}", path.display());
    }
    tracing::info!(
        "  Session lifetime: {} seconds",
        config.session_ttl.as_secs()
    );

    run_server(config).await
}
