use anyhow::{bail, Context, Result};
use clap::Parser;
use nakama::config::{get_config, CliArgs};
use nakama::{create_app, db, telemetry, AppState};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads the environment
    dotenv::dotenv().ok();

    let args = CliArgs::parse();
    let config = telemetry::with_bootstrap_logging(|| get_config(args));
    let _log_guard = telemetry::init_tracing(&config)?;
    config.log_summary();

    if config.session_secret.trim().is_empty() {
        bail!("SESSION_SECRET (or --session-secret) must be set to sign sessions");
    }
    if config.google().is_none() {
        warn!("Google login is disabled: GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET are not set");
    }

    let pool = db::init_pool(&config.database_url)?;
    {
        let mut conn = pool.get().context("Failed to open the database")?;
        db::run_migrations(&mut conn)?;
    }

    let address = config.bind_address();
    let state = AppState::new(Arc::new(pool), config)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
