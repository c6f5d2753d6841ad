//! PostgreSQL rebate store over the application's existing tables.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::info;

use super::{ExpiryTransaction, RebateStore, RedemptionUpdate};
use crate::error::StoreError;
use crate::models::{ApplicationStatus, Rebate, RebateApplication, RebateWithApplication};

const REBATE_TABLE: &str = "api_goelectricrebate";
const APPLICATION_TABLE: &str = "api_goelectricrebateapplication";

/// Rebate columns joined with the owning application, prefixed `app_`.
fn select_joined() -> String {
    format!(
        r#"
        SELECT r.id::bigint AS id,
               r.application_id,
               r.drivers_licence,
               r.last_name,
               r.expiry_date,
               r.rebate_max_amount,
               r.ncda_id::bigint AS ncda_id,
               r.redeemed,
               r.modified,
               a.id AS app_id,
               a.first_name AS app_first_name,
               a.last_name AS app_last_name,
               a.email AS app_email,
               a.status AS app_status,
               a.modified AS app_modified
        FROM {REBATE_TABLE} r
        LEFT JOIN {APPLICATION_TABLE} a ON a.id = r.application_id
        "#
    )
}

fn map_joined(row: &PgRow) -> Result<RebateWithApplication, StoreError> {
    let rebate = Rebate {
        id: row.try_get("id")?,
        application_id: row.try_get("application_id")?,
        drivers_licence: row.try_get("drivers_licence")?,
        last_name: row.try_get("last_name")?,
        expiry_date: row.try_get("expiry_date")?,
        rebate_max_amount: row.try_get("rebate_max_amount")?,
        ncda_id: row.try_get("ncda_id")?,
        redeemed: row.try_get("redeemed")?,
        modified: row.try_get("modified")?,
    };

    let app_id: Option<String> = row.try_get("app_id")?;
    let application = match app_id {
        Some(id) => {
            let status: String = row.try_get("app_status")?;
            Some(RebateApplication {
                id,
                first_name: row.try_get("app_first_name")?,
                last_name: row.try_get("app_last_name")?,
                email: row.try_get("app_email")?,
                status: status
                    .parse()
                    .map_err(|e| StoreError::InvalidValue(format!("{}", e)))?,
                modified: row.try_get("app_modified")?,
            })
        }
        None => None,
    };

    Ok(RebateWithApplication {
        rebate,
        application,
    })
}

/// Store backed by a shared `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!(max_connections = max_connections, "database_pool_connected");

        Ok(Self::new(pool))
    }

    async fn fetch_joined(
        &self,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<RebateWithApplication>, StoreError> {
        query
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(map_joined)
            .collect()
    }
}

struct PgExpiry {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ExpiryTransaction for PgExpiry {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RebateStore for PgStore {
    async fn rebates_pending_registry(
        &self,
        limit: usize,
    ) -> Result<Vec<RebateWithApplication>, StoreError> {
        let sql = format!(
            "{} WHERE r.ncda_id IS NULL ORDER BY r.id LIMIT $1",
            select_joined()
        );
        self.fetch_joined(sqlx::query(&sql).bind(limit as i64)).await
    }

    async fn set_ncda_id(&self, rebate_id: i64, ncda_id: i64) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {REBATE_TABLE} SET ncda_id = $1, modified = now() WHERE id = $2"
        );
        let result = sqlx::query(&sql)
            .bind(ncda_id)
            .bind(rebate_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RebateNotFound(rebate_id));
        }
        Ok(())
    }

    async fn mark_redeemed(&self, ncda_ids: &[i64]) -> Result<RedemptionUpdate, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE {REBATE_TABLE} SET redeemed = true, modified = now() \
             WHERE ncda_id = ANY($1) \
             RETURNING id::bigint AS id, application_id"
        );
        let rows = sqlx::query(&sql)
            .bind(ncda_ids.to_vec())
            .fetch_all(&mut *tx)
            .await?;

        let mut update = RedemptionUpdate::default();
        for row in &rows {
            update.rebate_ids.push(row.try_get("id")?);
            if let Some(app_id) = row.try_get::<Option<String>, _>("application_id")? {
                update.application_ids.push(app_id);
            }
        }

        if !update.application_ids.is_empty() {
            let sql = format!(
                "UPDATE {APPLICATION_TABLE} SET status = $1, modified = now() WHERE id = ANY($2)"
            );
            sqlx::query(&sql)
                .bind(ApplicationStatus::Redeemed.as_str())
                .bind(&update.application_ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(update)
    }

    async fn expiry_candidates(
        &self,
        expired_on_or_before: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RebateWithApplication>, StoreError> {
        let sql = format!(
            "{} WHERE r.redeemed = false \
               AND r.expiry_date <= $1 \
               AND r.ncda_id IS NOT NULL \
               AND a.status = $2 \
             ORDER BY r.id LIMIT $3",
            select_joined()
        );
        self.fetch_joined(
            sqlx::query(&sql)
                .bind(expired_on_or_before)
                .bind(ApplicationStatus::Approved.as_str())
                .bind(limit as i64),
        )
        .await
    }

    async fn stage_expiry<'a>(
        &'a self,
        rebate_id: i64,
        application_id: &'a str,
    ) -> Result<Box<dyn ExpiryTransaction + 'a>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE {APPLICATION_TABLE} SET status = $1, modified = now() WHERE id = $2"
        );
        sqlx::query(&sql)
            .bind(ApplicationStatus::Expired.as_str())
            .bind(application_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("DELETE FROM {REBATE_TABLE} WHERE id = $1");
        let deleted = sqlx::query(&sql)
            .bind(rebate_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(StoreError::RebateNotFound(rebate_id));
        }

        Ok(Box::new(PgExpiry { tx }))
    }

    async fn expiring_on(
        &self,
        dates: &[NaiveDate],
    ) -> Result<Vec<RebateWithApplication>, StoreError> {
        let sql = format!(
            "{} WHERE r.redeemed = false \
               AND r.expiry_date = ANY($1) \
               AND a.status = $2 \
             ORDER BY r.id",
            select_joined()
        );
        self.fetch_joined(
            sqlx::query(&sql)
                .bind(dates.to_vec())
                .bind(ApplicationStatus::Approved.as_str()),
        )
        .await
    }
}
