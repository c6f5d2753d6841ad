//! Persistence for rebates and their applications.
//!
//! The schema is owned by the applicant-facing web application; this crate
//! only reads and updates the existing rows. [`PgStore`] talks to that
//! database; the job tests run against an in-memory store.

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::RebateWithApplication;

#[cfg(test)]
pub(crate) use memory::MemoryStore;
pub use postgres::PgStore;

/// Rows touched by a bulk redemption update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedemptionUpdate {
    pub rebate_ids: Vec<i64>,
    pub application_ids: Vec<String>,
}

/// Local half of a rebate expiry, held open while the remote record is deleted.
///
/// Dropping the transaction without calling [`commit`](Self::commit) discards
/// the staged changes.
#[async_trait]
pub trait ExpiryTransaction: Send {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RebateStore: Send + Sync {
    /// Rebates not yet registered with the registry, oldest first.
    async fn rebates_pending_registry(
        &self,
        limit: usize,
    ) -> Result<Vec<RebateWithApplication>, StoreError>;

    /// Record the registry id assigned to a rebate.
    async fn set_ncda_id(&self, rebate_id: i64, ncda_id: i64) -> Result<(), StoreError>;

    /// Atomically mark every rebate with one of `ncda_ids` as redeemed and move
    /// their applications to `redeemed`.
    async fn mark_redeemed(&self, ncda_ids: &[i64]) -> Result<RedemptionUpdate, StoreError>;

    /// Unredeemed, registered rebates with an approved application whose
    /// expiry is on or before `expired_on_or_before`.
    async fn expiry_candidates(
        &self,
        expired_on_or_before: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RebateWithApplication>, StoreError>;

    /// Stage expiry of a rebate: application to `expired`, rebate row deleted.
    async fn stage_expiry<'a>(
        &'a self,
        rebate_id: i64,
        application_id: &'a str,
    ) -> Result<Box<dyn ExpiryTransaction + 'a>, StoreError>;

    /// Unredeemed rebates with an approved application expiring on any of `dates`.
    async fn expiring_on(
        &self,
        dates: &[NaiveDate],
    ) -> Result<Vec<RebateWithApplication>, StoreError>;
}
