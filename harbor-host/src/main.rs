//! # Harbor Host
//!
//! Starts the configured application model, forwards `localhost` URLs when
//! running inside a GitHub Codespace, and serves health checks until
//! interrupted.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use harbor_host::{
    bootstrap::build_app_host,
    config::{ConfigLoad, ConfigLoader},
    routes::{HostState, create_router},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "harbor-host")]
#[command(
    about = "Application host with sandbox URL forwarding and resource health checks"
)]
struct Cli {
    /// Path to harbor.toml (defaults to ./harbor.toml or $HARBOR_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Health server host (overrides config)
    #[arg(long, env = "HARBOR_HEALTH_HOST")]
    health_host: Option<String>,

    /// Health server port (overrides config)
    #[arg(long, env = "HARBOR_HEALTH_PORT")]
    health_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = cli.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(host) = cli.health_host {
        config.server.host = host;
    }
    if let Some(port) = cli.health_port {
        config.server.port = port;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration loaded from file");
    }
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    let host =
        build_app_host(&config).context("invalid application model")?;
    if let Err(err) = host.start().await {
        if let Err(shutdown_err) = host.shutdown().await {
            warn!(error = %shutdown_err, "shutdown after failed start was incomplete");
        }
        return Err(err).context("application host failed to start");
    }

    let listener = tokio::net::TcpListener::bind((
        config.server.host.as_str(),
        config.server.port,
    ))
    .await
    .with_context(|| {
        format!(
            "failed to bind health server to {}:{}",
            config.server.host, config.server.port
        )
    })?;
    info!(
        "Serving health checks on {}:{}",
        config.server.host, config.server.port
    );

    let router = create_router(HostState::from_host(&host));
    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(host.shutdown_token()))
        .await;
    if let Err(err) = &serve_result {
        error!(error = %err, "health server stopped unexpectedly");
    }

    host.shutdown()
        .await
        .context("application host did not shut down cleanly")?;
    serve_result.context("health server failed")?;
    Ok(())
}

/// Resolves on Ctrl-C, SIGTERM, or when the host token is cancelled.
async fn shutdown_signal(host_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
        _ = host_token.cancelled() => info!("host cancelled, shutting down"),
    }
}
