//! # userhub-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the user API.
//! Configuration comes from the environment; command-line flags override it.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use userhub_api::db::{self, PgUserStore};
use userhub_api::state::{AppConfig, AppState, LogFormat};
use userhub_core::{InMemoryUserStore, UserStore};

/// Administrative user API server.
#[derive(Parser, Debug)]
#[command(name = "userhub-api", version, about)]
struct Cli {
    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Log output format (overrides LOG_FORMAT).
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    init_tracing(config.log_format);
    tracing::info!(?config, "starting userhub-api");

    // Database pool is optional; absent means in-memory only.
    let pool = db::init_pool(config.database_url.as_deref())
        .await
        .context("database initialization failed")?;
    let store: Arc<dyn UserStore> = match pool {
        Some(pool) => Arc::new(PgUserStore::new(pool)),
        None => Arc::new(InMemoryUserStore::new()),
    };

    let port = config.port;
    let state = AppState::try_new(config, store).context("route registry is invalid")?;
    tracing::info!(routes = state.registry.len(), "route registry built");

    let app = userhub_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("userhub API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
