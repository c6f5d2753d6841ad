//! Push newly approved rebates to the redemption registry.

use tracing::{error, info};

use super::{Deadline, JobReport, Jobs};
use crate::error::JobError;
use crate::models::{RebateApplication, RebateTier, RebateWithApplication};
use crate::notify::Notification;
use crate::queue::EmailJob;
use crate::registry::NotifyRequest;

const JOB: &str = "send_rebates_to_registry";

impl Jobs {
    /// Register up to `registry_sync_batch` unregistered rebates.
    ///
    /// Each registered rebate with an approved application triggers the
    /// approval email. A failure on one rebate is logged and the batch moves on.
    pub async fn send_rebates_to_registry(&self) -> Result<JobReport, JobError> {
        self.bounded(JOB, |deadline| self.sync_pending(deadline)).await
    }

    async fn sync_pending(&self, deadline: Deadline) -> Result<JobReport, JobError> {
        let mut report = JobReport::new(JOB);
        let pending = self
            .store
            .rebates_pending_registry(self.settings.registry_sync_batch)
            .await?;

        info!(pending = pending.len(), "registry_sync_batch_loaded");

        for item in &pending {
            deadline.check(JOB)?;
            report.examined += 1;

            if let Err(e) = self.register(item).await {
                report.failed += 1;
                error!(
                    rebate_id = item.rebate.id,
                    error = %e,
                    "registry_rebate_post_failed"
                );
                continue;
            }
            report.updated += 1;

            let Some(application) = item.approved_application() else {
                continue;
            };
            // Registered rebates are never selected again; a failed enqueue is
            // only logged.
            match self.enqueue_approval(item, application).await {
                Ok(()) => {
                    report.emails_enqueued += 1;
                    report.application_ids.push(application.id.clone());
                }
                Err(e) => error!(
                    rebate_id = item.rebate.id,
                    application_id = %application.id,
                    error = %e,
                    "approval_email_enqueue_failed"
                ),
            }
        }

        Ok(report)
    }

    /// Register one rebate and record the id the registry assigned.
    async fn register(&self, item: &RebateWithApplication) -> Result<(), JobError> {
        let rebate = &item.rebate;
        let request = NotifyRequest {
            drivers_licence: rebate.drivers_licence.clone(),
            last_name: rebate.last_name.clone(),
            expiry_date: rebate.expiry_date.format("%m/%d/%Y").to_string(),
            amount: rebate.rebate_max_amount.to_string(),
            application_id: rebate.application_id.clone(),
        };

        let ncda_id = self.registry.notify(&request).await?;
        self.store.set_ncda_id(rebate.id, ncda_id).await?;

        info!(rebate_id = rebate.id, ncda_id = ncda_id, "registry_rebate_posted");
        Ok(())
    }

    async fn enqueue_approval(
        &self,
        item: &RebateWithApplication,
        application: &RebateApplication,
    ) -> Result<(), JobError> {
        let amounts = RebateTier::for_max_amount(item.rebate.rebate_max_amount).amounts();
        let job = EmailJob::new(
            application.email.clone(),
            application.id.clone(),
            Notification::Approved {
                applicant_full_name: application.full_name(),
                amounts,
            },
        );
        self.queue.enqueue(&job).await?;
        Ok(())
    }
}
