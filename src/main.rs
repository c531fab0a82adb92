//! Periscope Binary Entry Point
//!
//! This binary runs the complete periscope sampling daemon.
//! Core functionality is provided by the `periscope` library crate.

use clap::Parser;
use periscope::{
    config::AppConfig,
    export::InfluxSink,
    sampler::{SampleRegistry, SnapshotTimeExtractor},
    server::{AppState, create_router},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Periscope - Windowed HTTP Endpoint Sampler
#[derive(Parser, Debug)]
#[command(name = "periscope", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "PERISCOPE_CONFIG")]
    config: Option<String>,

    /// Server bind address (overrides config file)
    #[arg(long, env = "PERISCOPE_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "PERISCOPE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Time-series store write URL (overrides config file)
    #[arg(long, env = "PERISCOPE_INFLUX_URL")]
    influx_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,periscope=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Periscope - Windowed HTTP Endpoint Sampler");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file, or start from defaults
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            AppConfig::load(path)?
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            AppConfig::default()
        }
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(url) = cli.influx_url {
        config.export.influx_url = Some(url);
    }
    config.validate()?;

    tracing::info!(
        "Server: {}:{}, configured sets: {}",
        config.server.bind,
        config.server.port,
        config.sets.len(),
    );

    // Build the sample registry. Endpoints that embed a snapshot time get
    // stamped with it; everything else falls back to the wall clock.
    let mut registry =
        SampleRegistry::new().with_timestamp_extractor(Arc::new(SnapshotTimeExtractor));
    if let Some(url) = &config.export.influx_url {
        tracing::info!("Exporting retained samples to: {}", url);
        registry = registry.with_sink(Arc::new(InfluxSink::new(url)));
    }

    // Start the configured sets; a bad entry is logged and skipped
    for set in config.sets {
        let name = set.name.clone();
        match registry.add_set(set).await {
            Ok(()) => tracing::info!("Started sample set: {}", name),
            Err(e) => tracing::error!("Failed to start sample set '{}': {}", name, e),
        }
    }

    // Create web server state
    let app_state = AppState {
        registry: registry.clone(),
    };

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(registry: SampleRegistry) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!("Shutting down sample sets...");
    registry.shutdown().await;
}
