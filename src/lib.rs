pub mod api;
pub mod config;
pub mod error;
pub mod languages;
pub mod metrics;
pub mod models;
pub mod process;
pub mod workspace;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;

use crate::{config::AppConfig, metrics::MetricsRegistry};

/// Builds the full application router for the given configuration.
/// Integration tests drive this directly without binding a socket.
pub fn app(config: AppConfig) -> Router {
    api::routes(Arc::new(config), Arc::new(MetricsRegistry::new()))
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr;
    let router = app(config);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context("failed to bind listener")?;
    tracing::info!(addr = %bind_addr, "run-code service listening");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
