//! Rebate reconciliation service.
//!
//! This library provides shared modules for the two binaries:
//! - `rebate-web`: Trigger server the scheduler calls to run reconciliation jobs
//! - `rebate-mailer`: Queue consumer that delivers applicant notifications
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → rebate-web → Jobs ─┬→ Registry
//!                                ├→ Database
//!                                └→ rebate_notifications → rebate-mailer → Mail relay
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod queue;
pub mod registry;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::{Config, JobSettings};
pub use error::{JobError, MailError, QueueError, RegistryError, StoreError};
pub use jobs::{JobReport, Jobs};
pub use notify::{Mailer, Notification};
pub use queue::{EmailJob, NotificationQueue, Publisher, NOTIFICATION_QUEUE};
pub use registry::{HttpRegistryClient, RegistryClient};
pub use store::{PgStore, RebateStore};
pub use web::AppState;
