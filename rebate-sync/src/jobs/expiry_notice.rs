//! Warn applicants before their rebate approval lapses.

use chrono::{Duration, NaiveDate, Utc};
use tracing::info;

use super::{Deadline, JobReport, Jobs};
use crate::error::JobError;
use crate::notify::Notification;
use crate::queue::EmailJob;

const JOB: &str = "send_expiry_emails";

impl Jobs {
    /// Send the expired email for rebates expiring today and the warning
    /// email for rebates expiring in `expiry_warning_days`.
    pub async fn send_expiry_emails(&self) -> Result<JobReport, JobError> {
        let today = Utc::now().date_naive();
        self.bounded(JOB, |deadline| self.notify_expiring(today, deadline))
            .await
    }

    async fn notify_expiring(
        &self,
        today: NaiveDate,
        deadline: Deadline,
    ) -> Result<JobReport, JobError> {
        let mut report = JobReport::new(JOB);
        let warning_date = today + Duration::days(self.settings.expiry_warning_days);
        let rebates = self.store.expiring_on(&[today, warning_date]).await?;

        let mut expired_ids = Vec::new();
        let mut warning_ids = Vec::new();

        for item in &rebates {
            deadline.check(JOB)?;
            report.examined += 1;

            let Some(application) = item.application.as_ref() else {
                continue;
            };
            let expiry_date = item.rebate.expiry_date;

            let notification = if expiry_date == today {
                expired_ids.push(application.id.clone());
                Notification::Expired
            } else if expiry_date == warning_date {
                warning_ids.push(application.id.clone());
                Notification::ExpiryWarning
            } else {
                continue;
            };

            let job = EmailJob::new(application.email.clone(), application.id.clone(), notification);
            self.queue.enqueue(&job).await?;

            report.emails_enqueued += 1;
            report.application_ids.push(application.id.clone());
        }

        info!(application_ids = ?expired_ids, "expiry_emails_enqueued");
        info!(application_ids = ?warning_ids, "expiry_warning_emails_enqueued");

        Ok(report)
    }
}
