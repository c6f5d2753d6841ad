//! Rebate Web - job trigger server.
//!
//! This binary exposes the reconciliation jobs over HTTP for the external
//! scheduler:
//! - `POST /jobs/registry-sync`
//! - `POST /jobs/redemptions`
//! - `POST /jobs/expiry-sweep`
//! - `POST /jobs/expiry-emails`
//!
//! Notifications produced by the jobs are published to RabbitMQ for the mailer.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rebate_sync::web::router;
use rebate_sync::{AppState, Config, HttpRegistryClient, Jobs, PgStore, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = Config::from_env();
    info!(
        port = config.port,
        db_max_connections = config.database_max_connections,
        registry_configured = !config.registry.base_url.is_empty(),
        job_timeout_secs = config.jobs.timeout.as_secs(),
        registry_sync_batch = config.jobs.registry_sync_batch,
        expiry_sweep_batch = config.jobs.expiry_sweep_batch,
        "config_loaded"
    );

    let store = PgStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;

    let client = Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to create HTTP client")?;
    let registry = HttpRegistryClient::new(client, &config.registry);

    let publisher = Publisher::new(config.cloudamqp_url.clone());
    info!("rabbitmq_publisher_created");

    let jobs = Jobs::new(
        Arc::new(store),
        Arc::new(registry),
        Arc::new(publisher.clone()),
        config.jobs.clone(),
    );

    let app = router(AppState::new(jobs));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    publisher.close().await;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
