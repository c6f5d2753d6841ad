//! Retire rebates that expired without being redeemed.

use chrono::{Duration, NaiveDate, Utc};
use tracing::{error, info};

use super::{Deadline, JobReport, Jobs};
use crate::error::JobError;
use crate::models::RebateWithApplication;
use crate::registry::{record_status, NOT_REDEEMED};

const JOB: &str = "expire_expired_applications";

impl Jobs {
    /// Expire up to `expiry_sweep_batch` rebates that are at least
    /// `expiry_sweep_days_offset` days past expiry.
    ///
    /// A rebate is only expired when the registry still reports it as
    /// `Not-Redeemed`. Each rebate is handled in its own transaction.
    pub async fn expire_expired_applications(&self) -> Result<JobReport, JobError> {
        let today = Utc::now().date_naive();
        self.bounded(JOB, |deadline| self.sweep_expired(today, deadline))
            .await
    }

    async fn sweep_expired(
        &self,
        today: NaiveDate,
        deadline: Deadline,
    ) -> Result<JobReport, JobError> {
        let mut report = JobReport::new(JOB);
        let threshold = today - Duration::days(self.settings.expiry_sweep_days_offset);
        let candidates = self
            .store
            .expiry_candidates(threshold, self.settings.expiry_sweep_batch)
            .await?;

        info!(
            threshold = %threshold,
            candidates = candidates.len(),
            "expiry_sweep_batch_loaded"
        );

        for item in &candidates {
            deadline.check(JOB)?;
            report.examined += 1;

            match self.expire_one(item).await {
                Ok(Some(application_id)) => {
                    report.updated += 1;
                    report.application_ids.push(application_id);
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed += 1;
                    error!(
                        rebate_id = item.rebate.id,
                        error = %e,
                        "rebate_expire_failed"
                    );
                }
            }
        }

        info!(application_ids = ?report.application_ids, "applications_expired");

        Ok(report)
    }

    /// Expire a single rebate if the registry confirms it was never redeemed.
    ///
    /// The local changes commit only after the remote record is deleted.
    async fn expire_one(&self, item: &RebateWithApplication) -> Result<Option<String>, JobError> {
        let rebate = &item.rebate;
        let Some(ncda_id) = rebate.ncda_id else {
            return Ok(None);
        };

        let records = self.registry.get_rebate(ncda_id, &["Status"]).await?;
        let not_redeemed = records.len() == 1 && record_status(&records[0]) == Some(NOT_REDEEMED);
        if !not_redeemed {
            info!(
                rebate_id = rebate.id,
                ncda_id = ncda_id,
                records = records.len(),
                status = ?records.first().and_then(record_status),
                "rebate_expiry_skipped"
            );
            return Ok(None);
        }

        let Some(application) = item.application.as_ref() else {
            return Ok(None);
        };

        let tx = self.store.stage_expiry(rebate.id, &application.id).await?;
        self.registry.delete_rebate(ncda_id).await?;
        tx.commit().await?;

        info!(
            rebate_id = rebate.id,
            ncda_id = ncda_id,
            application_id = %application.id,
            "rebate_expired"
        );

        Ok(Some(application.id.clone()))
    }
}
