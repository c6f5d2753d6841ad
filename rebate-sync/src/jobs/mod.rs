//! Reconciliation jobs.
//!
//! Four independent routines keep local rebate state in line with the
//! redemption registry and queue applicant notifications:
//!
//! - [`Jobs::send_rebates_to_registry`] registers new rebates and sends approvals
//! - [`Jobs::check_rebates_redeemed_since`] marks rebates redeemed at a dealer
//! - [`Jobs::expire_expired_applications`] retires rebates past expiry
//! - [`Jobs::send_expiry_emails`] warns applicants before and at expiry
//!
//! Each run is bounded by [`JobSettings::timeout`]. The deadline is checked
//! between records, and the whole run is also wrapped in a hard timeout so a
//! stuck remote call cannot hold it open.

pub mod expiry_notice;
pub mod expiry_sweep;
pub mod redemption;
pub mod registry_sync;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info};

use crate::config::JobSettings;
use crate::error::JobError;
use crate::queue::NotificationQueue;
use crate::registry::RegistryClient;
use crate::store::RebateStore;

/// Point in time after which a job must stop picking up new records.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Fail with [`JobError::TimedOut`] once the deadline has passed.
    pub fn check(&self, job: &'static str) -> Result<(), JobError> {
        if self.expired() {
            Err(JobError::TimedOut { job })
        } else {
            Ok(())
        }
    }
}

/// Outcome of one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: &'static str,
    /// Records looked at
    pub examined: usize,
    /// Records whose local or remote state changed
    pub updated: usize,
    /// Records skipped because of an error
    pub failed: usize,
    pub emails_enqueued: usize,
    /// Applications affected by the run
    pub application_ids: Vec<String>,
}

impl JobReport {
    fn new(job: &'static str) -> Self {
        Self {
            job,
            ..Default::default()
        }
    }
}

/// The reconciliation jobs and the collaborators they share.
#[derive(Clone)]
pub struct Jobs {
    store: Arc<dyn RebateStore>,
    registry: Arc<dyn RegistryClient>,
    queue: Arc<dyn NotificationQueue>,
    settings: JobSettings,
}

impl Jobs {
    pub fn new(
        store: Arc<dyn RebateStore>,
        registry: Arc<dyn RegistryClient>,
        queue: Arc<dyn NotificationQueue>,
        settings: JobSettings,
    ) -> Self {
        Self {
            store,
            registry,
            queue,
            settings,
        }
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Run `work` under the job budget.
    ///
    /// `work` receives the deadline to check between records. If the budget
    /// runs out, either at a check or while a call is in flight, the run ends
    /// with [`JobError::TimedOut`].
    async fn bounded<F, Fut>(&self, job: &'static str, work: F) -> Result<JobReport, JobError>
    where
        F: FnOnce(Deadline) -> Fut,
        Fut: Future<Output = Result<JobReport, JobError>>,
    {
        let deadline = Deadline::after(self.settings.timeout);
        info!(job = job, timeout_secs = self.settings.timeout.as_secs(), "job_started");

        let result = match tokio::time::timeout_at(deadline.expires_at, work(deadline)).await {
            Ok(result) => result,
            Err(_) => Err(JobError::TimedOut { job }),
        };

        match &result {
            Ok(report) => info!(
                job = job,
                examined = report.examined,
                updated = report.updated,
                failed = report.failed,
                emails_enqueued = report.emails_enqueued,
                "job_completed"
            ),
            Err(JobError::TimedOut { .. }) => error!(job = job, "job_timed_out"),
            Err(e) => error!(job = job, error = %e, "job_failed"),
        }

        result
    }
}
