//! Fakes and fixtures shared by the job tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};

use super::Jobs;
use crate::config::JobSettings;
use crate::error::{QueueError, RegistryError};
use crate::models::{ApplicationStatus, Rebate, RebateApplication};
use crate::queue::{EmailJob, NotificationQueue};
use crate::registry::{NotifyRequest, RedeemedPage, RegistryClient, RegistryRecord};
use crate::store::MemoryStore;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn application(id: &str, status: ApplicationStatus) -> RebateApplication {
    RebateApplication {
        id: id.to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: format!("{}@example.com", id),
        status,
        modified: Utc::now(),
    }
}

pub fn rebate(id: i64, application_id: Option<&str>, ncda_id: Option<i64>) -> Rebate {
    Rebate {
        id,
        application_id: application_id.map(str::to_string),
        drivers_licence: format!("DL{:05}", id),
        last_name: "Doe".to_string(),
        expiry_date: today() + Duration::days(365),
        rebate_max_amount: 4000,
        ncda_id,
        redeemed: false,
        modified: Utc::now(),
    }
}

/// Registry double with scripted responses and a call log.
#[derive(Default)]
pub struct FakeRegistry {
    /// Responses for successive `notify` calls; `Err` carries a message.
    pub notify_results: Mutex<VecDeque<Result<i64, String>>>,
    pub notified: Mutex<Vec<NotifyRequest>>,
    pub statuses: Mutex<HashMap<i64, Vec<&'static str>>>,
    pub redeemed: Mutex<Vec<i64>>,
    pub redeemed_since: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<i64>>,
    pub fail_delete: Mutex<bool>,
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn notify(&self, request: &NotifyRequest) -> Result<i64, RegistryError> {
        self.notified.lock().unwrap().push(request.clone());
        match self.notify_results.lock().unwrap().pop_front() {
            Some(Ok(id)) => Ok(id),
            Some(Err(msg)) => Err(RegistryError::Response(msg)),
            None => Err(RegistryError::Response("no scripted response".to_string())),
        }
    }

    async fn get_rebate(
        &self,
        id: i64,
        _fields: &[&str],
    ) -> Result<Vec<RegistryRecord>, RegistryError> {
        let statuses = self.statuses.lock().unwrap();
        Ok(statuses
            .get(&id)
            .map(|list| {
                list.iter()
                    .map(|status| {
                        let mut record = RegistryRecord::new();
                        record.insert("Status".to_string(), (*status).into());
                        record
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn redeemed_page(
        &self,
        since: &str,
        _cursor: Option<&str>,
    ) -> Result<RedeemedPage, RegistryError> {
        self.redeemed_since.lock().unwrap().push(since.to_string());
        Ok(RedeemedPage {
            ids: self.redeemed.lock().unwrap().clone(),
            next: None,
        })
    }

    async fn delete_rebate(&self, id: i64) -> Result<(), RegistryError> {
        if *self.fail_delete.lock().unwrap() {
            return Err(RegistryError::Response("delete rejected".to_string()));
        }
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

/// Queue double that records every enqueued job.
#[derive(Default)]
pub struct RecordingQueue {
    pub jobs: Mutex<Vec<EmailJob>>,
    pub fail_enqueue: Mutex<bool>,
}

#[async_trait]
impl NotificationQueue for RecordingQueue {
    async fn enqueue(&self, job: &EmailJob) -> Result<(), QueueError> {
        if *self.fail_enqueue.lock().unwrap() {
            let err = serde_json::from_str::<EmailJob>("not json").unwrap_err();
            return Err(QueueError::Serialize(err));
        }
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub registry: Arc<FakeRegistry>,
    pub queue: Arc<RecordingQueue>,
    pub jobs: Jobs,
}

pub fn harness(settings: JobSettings) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(FakeRegistry::default());
    let queue = Arc::new(RecordingQueue::default());
    let jobs = Jobs::new(store.clone(), registry.clone(), queue.clone(), settings);
    Harness {
        store,
        registry,
        queue,
        jobs,
    }
}
