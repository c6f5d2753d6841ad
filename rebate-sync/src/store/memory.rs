//! In-memory rebate store for the job tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{ExpiryTransaction, RebateStore, RedemptionUpdate};
use crate::error::StoreError;
use crate::models::{ApplicationStatus, Rebate, RebateApplication, RebateWithApplication};

#[derive(Debug, Default)]
struct Tables {
    rebates: BTreeMap<i64, Rebate>,
    applications: HashMap<String, RebateApplication>,
}

impl Tables {
    fn joined(&self, rebate: &Rebate) -> RebateWithApplication {
        RebateWithApplication {
            rebate: rebate.clone(),
            application: rebate
                .application_id
                .as_ref()
                .and_then(|id| self.applications.get(id))
                .cloned(),
        }
    }

    fn has_approved_application(&self, rebate: &Rebate) -> bool {
        rebate
            .application_id
            .as_ref()
            .and_then(|id| self.applications.get(id))
            .map(|app| app.status == ApplicationStatus::Approved)
            .unwrap_or(false)
    }
}

/// Rebate store held entirely in memory, ordered by rebate id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_application(&self, application: RebateApplication) {
        let mut tables = self.tables.write().await;
        tables
            .applications
            .insert(application.id.clone(), application);
    }

    pub async fn insert_rebate(&self, rebate: Rebate) {
        let mut tables = self.tables.write().await;
        tables.rebates.insert(rebate.id, rebate);
    }

    pub async fn rebate(&self, id: i64) -> Option<Rebate> {
        self.tables.read().await.rebates.get(&id).cloned()
    }

    pub async fn application(&self, id: &str) -> Option<RebateApplication> {
        self.tables.read().await.applications.get(id).cloned()
    }
}

struct MemoryExpiry<'a> {
    store: &'a MemoryStore,
    rebate_id: i64,
    application_id: String,
}

#[async_trait]
impl ExpiryTransaction for MemoryExpiry<'_> {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tables = self.store.tables.write().await;
        if let Some(app) = tables.applications.get_mut(&self.application_id) {
            app.status = ApplicationStatus::Expired;
            app.modified = Utc::now();
        }
        tables.rebates.remove(&self.rebate_id);
        Ok(())
    }
}

#[async_trait]
impl RebateStore for MemoryStore {
    async fn rebates_pending_registry(
        &self,
        limit: usize,
    ) -> Result<Vec<RebateWithApplication>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rebates
            .values()
            .filter(|r| r.ncda_id.is_none())
            .take(limit)
            .map(|r| tables.joined(r))
            .collect())
    }

    async fn set_ncda_id(&self, rebate_id: i64, ncda_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rebate = tables
            .rebates
            .get_mut(&rebate_id)
            .ok_or(StoreError::RebateNotFound(rebate_id))?;
        rebate.ncda_id = Some(ncda_id);
        rebate.modified = Utc::now();
        Ok(())
    }

    async fn mark_redeemed(&self, ncda_ids: &[i64]) -> Result<RedemptionUpdate, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut update = RedemptionUpdate::default();

        for rebate in tables.rebates.values_mut() {
            if rebate.ncda_id.map_or(false, |id| ncda_ids.contains(&id)) {
                rebate.redeemed = true;
                rebate.modified = now;
                update.rebate_ids.push(rebate.id);
                if let Some(app_id) = &rebate.application_id {
                    update.application_ids.push(app_id.clone());
                }
            }
        }

        for app_id in &update.application_ids {
            if let Some(app) = tables.applications.get_mut(app_id) {
                app.status = ApplicationStatus::Redeemed;
                app.modified = now;
            }
        }

        Ok(update)
    }

    async fn expiry_candidates(
        &self,
        expired_on_or_before: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RebateWithApplication>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rebates
            .values()
            .filter(|r| {
                !r.redeemed
                    && r.expiry_date <= expired_on_or_before
                    && r.ncda_id.is_some()
                    && tables.has_approved_application(r)
            })
            .take(limit)
            .map(|r| tables.joined(r))
            .collect())
    }

    async fn stage_expiry<'a>(
        &'a self,
        rebate_id: i64,
        application_id: &'a str,
    ) -> Result<Box<dyn ExpiryTransaction + 'a>, StoreError> {
        if !self.tables.read().await.rebates.contains_key(&rebate_id) {
            return Err(StoreError::RebateNotFound(rebate_id));
        }
        Ok(Box::new(MemoryExpiry {
            store: self,
            rebate_id,
            application_id: application_id.to_string(),
        }))
    }

    async fn expiring_on(
        &self,
        dates: &[NaiveDate],
    ) -> Result<Vec<RebateWithApplication>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rebates
            .values()
            .filter(|r| {
                !r.redeemed
                    && dates.contains(&r.expiry_date)
                    && tables.has_approved_application(r)
            })
            .map(|r| tables.joined(r))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{application, rebate};

    #[tokio::test]
    async fn test_staged_expiry_discarded_on_drop() {
        let store = MemoryStore::new();
        store
            .insert_application(application("app-1", ApplicationStatus::Approved))
            .await;
        store.insert_rebate(rebate(1, Some("app-1"), Some(10))).await;

        let tx = store.stage_expiry(1, "app-1").await.unwrap();
        drop(tx);

        assert!(store.rebate(1).await.is_some());
        assert_eq!(
            store.application("app-1").await.unwrap().status,
            ApplicationStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_staged_expiry_commit() {
        let store = MemoryStore::new();
        store
            .insert_application(application("app-1", ApplicationStatus::Approved))
            .await;
        store.insert_rebate(rebate(1, Some("app-1"), Some(10))).await;

        let tx = store.stage_expiry(1, "app-1").await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.rebate(1).await.is_none());
        assert_eq!(
            store.application("app-1").await.unwrap().status,
            ApplicationStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_set_ncda_id_missing_rebate() {
        let store = MemoryStore::new();
        let err = store.set_ncda_id(42, 7).await.unwrap_err();
        assert!(matches!(err, StoreError::RebateNotFound(42)));
    }

    #[tokio::test]
    async fn test_pending_registry_respects_limit() {
        let store = MemoryStore::new();
        for id in 1..=5 {
            store.insert_rebate(rebate(id, None, None)).await;
        }
        store.insert_rebate(rebate(6, None, Some(99))).await;

        let pending = store.rebates_pending_registry(3).await.unwrap();
        let ids: Vec<i64> = pending.iter().map(|r| r.rebate.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
