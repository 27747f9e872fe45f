use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trawl_core::{
    build_sources, create_authenticator, load_config, validate_config, Authenticator,
    SystemClock,
};
use trawl_server::sweeper::spawn_cache_sweeper;
use trawl_server::{create_router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TRAWL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        auth = ?config.auth.method,
        sources = config.sources.len(),
        "Configuration loaded successfully"
    );

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let sources = build_sources(&config.sources).context("Failed to build source adapters")?;
    let sweep_every = Duration::from_secs(config.cache.sweep_interval_secs);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    let state = Arc::new(
        AppState::assemble(config, authenticator, sources, Arc::new(SystemClock))
            .context("Failed to build source registry")?,
    );
    info!(
        sources = state.registry().len(),
        configured = state
            .registry()
            .list()
            .iter()
            .filter(|s| s.descriptor.configured)
            .count(),
        "Source registry ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_cache_sweeper(state.clone(), sweep_every, shutdown_rx);

    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutting down...");
    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    info!("Cache sweeper stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
