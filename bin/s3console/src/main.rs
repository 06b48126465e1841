//! s3console - S3 web console API server
//!
//! Serves the console's JSON routes, resolving per-request credentials from
//! the auth node and forwarding operations to the object store.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use s3console_api::{AppState, router};
use s3console_auth::resolver_from_config;
use s3console_common::ConsoleConfig;
use s3console_store::factory_from_config;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_PATH: &str = "/etc/s3console/console.toml";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "s3console")]
#[command(about = "S3 web console API server")]
#[command(version)]
struct Args {
    /// Configuration file path (default: /etc/s3console/console.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides server.listen
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let json = matches!(args.log_format, LogFormat::Json);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting s3console");

    // An explicit --config must exist; the default path is optional
    let config_path = args.config.clone().or_else(|| {
        let default = Path::new(DEFAULT_CONFIG_PATH);
        default.exists().then(|| default.to_path_buf())
    });
    match &config_path {
        Some(path) => info!("Loading configuration from {}", path.display()),
        None => info!("No configuration file, using defaults and environment"),
    }
    let mut config =
        ConsoleConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    let resolver =
        resolver_from_config(&config.auth).context("failed to build credential resolver")?;
    let stores = factory_from_config(&config.store);
    info!("Credential resolver: {}", resolver.name());
    info!(
        "Object store: {} (region {}, endpoint {})",
        stores.name(),
        config.store.region,
        config.store.endpoint_url().as_deref().unwrap_or("aws")
    );
    info!(
        "Max upload size: {} bytes",
        config.server.max_upload_bytes
    );

    let state = Arc::new(AppState::new(resolver, stores, config.console.clone()));
    let app = router(state, config.server.max_upload_bytes);

    let addr = config.server.listen;
    info!("Starting console API server on {}", addr);

    // Start server
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    info!("s3console shut down gracefully");

    Ok(())
}
