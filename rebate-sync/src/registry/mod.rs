//! Redemption registry client.
//!
//! The registry is the partner system of record for whether a rebate has been
//! redeemed at a dealership. The jobs talk to it through [`RegistryClient`] so
//! they can be exercised against a scripted fake.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::RegistryError;

pub use http::HttpRegistryClient;

/// Registry status string for a rebate that was never claimed.
pub const NOT_REDEEMED: &str = "Not-Redeemed";

/// Payload pushed to the registry for a newly approved rebate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifyRequest {
    #[serde(rename = "DriversLicense")]
    pub drivers_licence: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    /// Expiry formatted `MM/DD/YYYY`
    #[serde(rename = "ExpiryDate")]
    pub expiry_date: String,
    #[serde(rename = "RebateMaxAmount")]
    pub amount: String,
    #[serde(rename = "ApplicationId")]
    pub application_id: Option<String>,
}

/// One page of redeemed registry ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedeemedPage {
    pub ids: Vec<i64>,
    /// Cursor for the following page, if any
    pub next: Option<String>,
}

/// A registry record, restricted to the requested fields.
pub type RegistryRecord = Map<String, Value>;

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Register a rebate and return its registry id.
    async fn notify(&self, request: &NotifyRequest) -> Result<i64, RegistryError>;

    /// Fetch the records matching `id`, selecting only `fields`.
    async fn get_rebate(&self, id: i64, fields: &[&str])
        -> Result<Vec<RegistryRecord>, RegistryError>;

    /// Fetch one page of ids redeemed since `since`.
    ///
    /// `cursor` is `None` for the first page and the previous page's `next`
    /// afterwards.
    async fn redeemed_page(
        &self,
        since: &str,
        cursor: Option<&str>,
    ) -> Result<RedeemedPage, RegistryError>;

    async fn delete_rebate(&self, id: i64) -> Result<(), RegistryError>;

    /// Collect every id redeemed since `since`, following page cursors.
    async fn get_rebates_redeemed_since(&self, since: &str) -> Result<Vec<i64>, RegistryError> {
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.redeemed_page(since, cursor.as_deref()).await?;
            ids.extend(page.ids);
            match page.next {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    warn!(since = since, cursor = %next, "registry_cursor_repeated");
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(ids)
    }
}

/// Read the `Status` field of a registry record.
pub fn record_status(record: &RegistryRecord) -> Option<&str> {
    record.get("Status").and_then(Value::as_str)
}
