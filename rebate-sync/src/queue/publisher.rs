//! Async RabbitMQ publisher for enqueueing notifications.
//!
//! This module provides a shared publisher that can be cloned across jobs
//! and handlers for fire-and-forget notification dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{EmailJob, NOTIFICATION_QUEUE};
use super::NotificationQueue;
use crate::error::QueueError;

/// Async RabbitMQ publisher with connection management.
///
/// The publisher maintains a persistent connection and channel to RabbitMQ,
/// automatically reconnecting on failure.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl Publisher {
    /// Create a new publisher with the given RabbitMQ URL.
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel, QueueError> {
        {
            let channel = self.inner.channel.read().await;
            if let Some(ch) = channel.as_ref() {
                if ch.status().connected() {
                    return Ok(ch.clone());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Double-check after acquiring write lock
        if let Some(ch) = channel.as_ref() {
            if ch.status().connected() {
                return Ok(ch.clone());
            }
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default()).await?;

        info!("rabbitmq_publisher_connected");

        let ch = conn.create_channel().await?;

        declare_notification_queue(&ch).await?;

        info!(queue = NOTIFICATION_QUEUE, "rabbitmq_queue_declared");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Publish a notification to the rebate_notifications queue.
    pub async fn publish_notification(&self, job: &EmailJob) -> Result<(), QueueError> {
        let channel = self.ensure_connected().await?;

        let body = serde_json::to_vec(job)?;
        let message_id = job.message_id();

        channel
            .basic_publish(
                "",
                NOTIFICATION_QUEUE,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into())
                    .with_message_id(message_id.clone().into()),
            )
            .await?
            .await?;

        info!(
            queue = NOTIFICATION_QUEUE,
            message_id = %message_id,
            body_length = body.len(),
            "rabbitmq_notification_published"
        );

        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

#[async_trait]
impl NotificationQueue for Publisher {
    async fn enqueue(&self, job: &EmailJob) -> Result<(), QueueError> {
        self.publish_notification(job).await
    }
}

/// Declare the durable notification queue (idempotent).
pub async fn declare_notification_queue(channel: &Channel) -> Result<(), lapin::Error> {
    channel
        .queue_declare(
            NOTIFICATION_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}
