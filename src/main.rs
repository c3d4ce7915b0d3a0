//! ipblacklist - standalone filtering daemon.
//!
//! Serves a catch-all `204 No Content` handler behind the blacklist filter.
//! Embedders call [`ipblacklist::http::protect`] on their own router instead.

use axum::Router;
use axum::http::StatusCode;
use ipblacklist::config::{self, Config};
use ipblacklist::{BlacklistFilter, http, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn allowed() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "configuration has {} error(s), see messages above",
            errors.len()
        ));
    }

    metrics::init();
    if let Some(port) = config.server.metrics_port {
        tokio::spawn(http::run_metrics_server(port));
    }

    let filter = BlacklistFilter::new(&config.blacklist).await?;

    match filter.database().blacklist().count().await {
        Ok(count) => info!(count, "Loaded dynamic blacklist"),
        Err(e) => tracing::warn!(error = %e, "Failed to count dynamic blacklist entries"),
    }

    let app = http::protect(Router::new().fallback(allowed), filter);

    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    info!(listen = %config.server.listen, "ipblacklist listening");

    axum::serve(listener, app).await?;
    Ok(())
}
