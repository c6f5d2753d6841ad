//! Detect rebates redeemed at a dealership.

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use super::{Deadline, JobReport, Jobs};
use crate::error::JobError;

const JOB: &str = "check_rebates_redeemed_since";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Start of the day before `iso_ts`, formatted for the registry query.
pub fn lookback_since(iso_ts: &str) -> Result<String, JobError> {
    let requested = NaiveDateTime::parse_from_str(iso_ts, TIMESTAMP_FORMAT)
        .map_err(|_| JobError::InvalidTimestamp(iso_ts.to_string()))?;
    let lookback = requested - Duration::days(1);
    Ok(lookback.format("%Y-%m-%dT00:00:00Z").to_string())
}

impl Jobs {
    /// Mark every rebate the registry reports as redeemed since the day
    /// before `iso_ts`, together with its application, in one transaction.
    pub async fn check_rebates_redeemed_since(&self, iso_ts: &str) -> Result<JobReport, JobError> {
        let since = lookback_since(iso_ts)?;
        self.bounded(JOB, |deadline| self.apply_redemptions(since, deadline))
            .await
    }

    async fn apply_redemptions(
        &self,
        since: String,
        deadline: Deadline,
    ) -> Result<JobReport, JobError> {
        let mut report = JobReport::new(JOB);

        info!(since = %since, "redemption_check_window");

        let ncda_ids = self.registry.get_rebates_redeemed_since(&since).await?;
        report.examined = ncda_ids.len();

        info!(since = %since, ncda_ids = ?ncda_ids, "registry_redeemed_ids_fetched");

        if ncda_ids.is_empty() {
            return Ok(report);
        }

        deadline.check(JOB)?;
        let update = self.store.mark_redeemed(&ncda_ids).await?;

        info!(
            rebates = update.rebate_ids.len(),
            applications = update.application_ids.len(),
            "rebates_marked_redeemed"
        );

        report.updated = update.rebate_ids.len();
        report.application_ids = update.application_ids;
        Ok(report)
    }
}
