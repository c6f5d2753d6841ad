//! RabbitMQ consumer module using lapin.
//!
//! This module handles connecting to RabbitMQ, consuming notifications from
//! the rebate_notifications queue, and spawning async tasks to deliver each
//! one through the mail relay.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties,
};
use reqwest::Client;
use tokio::signal;
use tracing::{error, info, warn};

use rebate_sync::queue::publisher::declare_notification_queue;
use rebate_sync::{Config, EmailJob, Mailer, NOTIFICATION_QUEUE};

/// Run the RabbitMQ consumer.
///
/// This function:
/// 1. Connects to RabbitMQ using the configured URL
/// 2. Sets up QoS so at most `worker_concurrency` messages are in flight
/// 3. Declares the queue (idempotent operation)
/// 4. Starts consuming messages, spawning a task for each
/// 5. Handles graceful shutdown on SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<()> {
    info!(url_length = config.cloudamqp_url.len(), "rabbitmq_connecting");

    let conn = Connection::connect(&config.cloudamqp_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    info!("rabbitmq_connected");

    let channel = conn.create_channel().await.context("Failed to create channel")?;

    let prefetch_count = config.worker_concurrency.min(u16::MAX as usize) as u16;
    channel
        .basic_qos(prefetch_count, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    info!(prefetch_count = prefetch_count, "rabbitmq_qos_set");

    declare_notification_queue(&channel)
        .await
        .context("Failed to declare queue")?;

    info!(queue = NOTIFICATION_QUEUE, "rabbitmq_queue_declared");

    let client = Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to create HTTP client")?;

    let mailer = Arc::new(Mailer::new(client, &config.email));

    let mut consumer = channel
        .basic_consume(
            NOTIFICATION_QUEUE,
            "rebate-mailer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = NOTIFICATION_QUEUE, "rabbitmq_consumer_started");
    info!("mailer_ready");

    let channel = Arc::new(channel);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("mailer_stopping");
                break;
            }
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let mailer = Arc::clone(&mailer);
                        let channel = Arc::clone(&channel);
                        tokio::spawn(async move {
                            handle_delivery(&mailer, &channel, delivery).await;
                        });
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "rabbitmq_delivery_error");
                    }
                    None => {
                        warn!("rabbitmq_consumer_closed");
                        break;
                    }
                }
            }
        }
    }

    info!("mailer_shutdown_complete");
    Ok(())
}

/// Deliver one notification and settle the message.
///
/// Malformed messages are dropped. A failed send is requeued once; a second
/// failure drops the message.
async fn handle_delivery(mailer: &Mailer, channel: &Channel, delivery: Delivery) {
    let delivery_tag = delivery.delivery_tag;
    let message_id = delivery
        .properties
        .message_id()
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    info!(
        queue = NOTIFICATION_QUEUE,
        message_id = %message_id,
        delivery_tag = delivery_tag,
        redelivered = delivery.redelivered,
        "rabbitmq_notification_received"
    );

    let job: EmailJob = match serde_json::from_slice(&delivery.data) {
        Ok(job) => job,
        Err(e) => {
            error!(
                message_id = %message_id,
                error = %e,
                body_preview = %String::from_utf8_lossy(
                    &delivery.data[..delivery.data.len().min(500)]
                ),
                "notification_parse_failed"
            );
            nack(channel, delivery_tag, false).await;
            return;
        }
    };

    match mailer.deliver(&job).await {
        Ok(()) => {
            if let Err(e) = channel
                .basic_ack(delivery_tag, BasicAckOptions::default())
                .await
            {
                error!(delivery_tag = delivery_tag, error = %e, "rabbitmq_ack_failed");
            }
        }
        Err(e) => {
            let requeue = !delivery.redelivered;
            error!(
                message_id = %message_id,
                application_id = %job.application_id,
                template = job.notification.name(),
                requeue = requeue,
                error = %e,
                "notification_send_failed"
            );
            nack(channel, delivery_tag, requeue).await;
        }
    }
}

async fn nack(channel: &Channel, delivery_tag: u64, requeue: bool) {
    if let Err(e) = channel
        .basic_nack(
            delivery_tag,
            BasicNackOptions {
                requeue,
                ..Default::default()
            },
        )
        .await
    {
        error!(delivery_tag = delivery_tag, error = %e, "rabbitmq_nack_failed");
    }
}

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
}
