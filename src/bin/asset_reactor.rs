//! Asset reactor server.
//!
//! Reads configuration from the environment (and `.env` if present), wires
//! the selected handler over an HTTP catalog client and serves the map
//! endpoint until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use asset_reactor::{transport, ReactorConfig};
use catalog_client::{CatalogClient, HttpCatalogClient};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ReactorConfig::from_env().context("loading configuration")?;
    let client: Arc<dyn CatalogClient> = Arc::new(
        HttpCatalogClient::with_timeout(
            &config.base_url,
            &config.api_token,
            config.request_timeout(),
        )
        .context("building catalog client")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handler = config.handler.build(client, &config, shutdown_rx);
    let app = transport::router(handler);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(
        handler = %config.handler,
        addr = %config.bind_addr,
        catalog = %config.base_url,
        "asset_reactor listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Unable to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("serving")?;
    Ok(())
}
