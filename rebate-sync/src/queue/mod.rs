//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The notification message type carried on the queue
//! - The producer interface the jobs enqueue through
//! - An async RabbitMQ publisher implementing it
//!
//! ## Architecture
//!
//! ```text
//! Jobs → rebate_notifications queue → Mailer
//! ```

pub mod publisher;
pub mod types;

use async_trait::async_trait;

use crate::error::QueueError;

pub use publisher::Publisher;
pub use types::{EmailJob, NOTIFICATION_QUEUE};

/// Fire-and-forget producer for notification emails.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn enqueue(&self, job: &EmailJob) -> Result<(), QueueError>;
}
