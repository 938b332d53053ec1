//! SignalGateway - Main Entry Point
//!
//! Listens for webhook signals and places the matching orders on the
//! configured futures venue.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use signal_gateway::config::load_config;
use signal_gateway::server::{app, AppState};
use signal_gateway::{SignalRouter, VenueHttpClient};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, env = "BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut config = load_config(Some(&args.config)).context("loading configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    // Initialize logging
    let log_level = args.log_level.unwrap_or_else(|| config.settings.log_level.clone());
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting SignalGateway");
    info!("Configuration file: {}", args.config);

    let credentials = config.venue.credentials()?;
    let profile = config.venue.profile();
    info!(
        venue = %profile.name,
        base_url = %profile.base_url,
        product_type = %profile.product_type,
        "venue profile selected"
    );

    let client = VenueHttpClient::with_timeout(
        profile,
        credentials,
        config.settings.request_timeout(),
    )?
    .with_retry_policy(config.settings.retry_policy());

    let router = SignalRouter::new(Arc::new(client), config.trading.clone())
        .with_contract_cache(config.settings.contract_cache_ttl());
    let state = Arc::new(AppState::new(router, &config.server));
    let routes = app(state, &config.server.webhook_path);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("binding {}", config.server.bind_address))?;
    info!(
        "Listening on {}{}",
        config.server.bind_address, config.server.webhook_path
    );

    axum::serve(listener, routes)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, cleaning up...");
}
