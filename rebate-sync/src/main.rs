//! Rebate Mailer - RabbitMQ consumer for applicant notifications.
//!
//! This worker drains the rebate_notifications queue, renders each message
//! and submits it to the mail relay.

mod consumer;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rebate_sync::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!("mailer_starting");

    // Load configuration from environment
    let config = Config::from_env();
    tracing::info!(
        cloudamqp_url_set = !config.cloudamqp_url.is_empty(),
        email_url_set = !config.email.email_url.is_empty(),
        concurrency = config.worker_concurrency,
        "config_loaded"
    );

    consumer::run(config).await?;

    Ok(())
}
