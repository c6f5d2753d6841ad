//! Applicant notifications.
//!
//! ```text
//! Job → NotificationQueue → rebate_notifications queue → Mailer → mail relay
//! ```

pub mod mailer;
pub mod templates;

pub use mailer::Mailer;
pub use templates::{Notification, RenderedEmail};
