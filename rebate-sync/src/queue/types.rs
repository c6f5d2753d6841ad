//! Queue message types.

use serde::{Deserialize, Serialize};

use crate::notify::Notification;

/// Queue name for notification emails awaiting delivery.
pub const NOTIFICATION_QUEUE: &str = "rebate_notifications";

/// A notification to deliver to one applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailJob {
    /// Applicant email address
    pub recipient: String,
    /// Application the message is about; appears in the subject
    pub application_id: String,
    #[serde(flatten)]
    pub notification: Notification,
}

impl EmailJob {
    pub fn new(recipient: String, application_id: String, notification: Notification) -> Self {
        Self {
            recipient,
            application_id,
            notification,
        }
    }

    /// Message id used for broker-side tracking.
    pub fn message_id(&self) -> String {
        format!("{}-{}", self.notification.name(), self.application_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_job_serialization() {
        let job = EmailJob::new(
            "jane@example.com".to_string(),
            "app-1".to_string(),
            Notification::ExpiryWarning,
        );

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"template\":\"expiry_warning\""));

        let parsed: EmailJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn test_email_job_deserialization_with_params() {
        let json = r#"{
            "recipient": "jane@example.com",
            "application_id": "app-2",
            "template": "reject",
            "reasons": "a;b"
        }"#;

        let job: EmailJob = serde_json::from_str(json).unwrap();
        assert_eq!(
            job.notification,
            Notification::Reject {
                reasons: "a;b".to_string()
            }
        );
        assert_eq!(job.message_id(), "reject-app-2");
    }
}
