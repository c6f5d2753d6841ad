//! Job trigger endpoint handlers.
//!
//! Each handler runs its job to completion and returns the [`JobReport`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::JobError;
use crate::jobs::{JobReport, Jobs};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<Jobs>,
}

impl AppState {
    pub fn new(jobs: Jobs) -> Self {
        Self {
            jobs: Arc::new(jobs),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Job Triggers
// =============================================================================

/// Error body returned when a job cannot run or fails.
#[derive(Debug, Serialize)]
pub struct JobFailure {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl JobFailure {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }
}

impl From<JobError> for JobFailure {
    fn from(err: JobError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.to_string(),
        }
    }
}

impl IntoResponse for JobFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

type JobResponse = Result<Json<JobReport>, JobFailure>;

/// Optional body for the redemption check.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedemptionRequest {
    /// Requested timestamp, `YYYY-MM-DDTHH:MM:SSZ`; defaults to now
    pub since: Option<String>,
}

impl RedemptionRequest {
    /// Parse a trigger body. An empty body means "now".
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

pub async fn registry_sync(State(state): State<AppState>) -> JobResponse {
    info!(job = "registry_sync", "job_trigger_received");
    Ok(Json(state.jobs.send_rebates_to_registry().await?))
}

pub async fn redemptions(State(state): State<AppState>, body: Bytes) -> JobResponse {
    let request = RedemptionRequest::from_body(&body).map_err(|e| {
        warn!(job = "redemptions", error = %e, "job_trigger_body_invalid");
        JobFailure::bad_request(format!("invalid request body: {}", e))
    })?;
    let since = request
        .since
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());

    info!(job = "redemptions", since = %since, "job_trigger_received");
    Ok(Json(state.jobs.check_rebates_redeemed_since(&since).await?))
}

pub async fn expiry_sweep(State(state): State<AppState>) -> JobResponse {
    info!(job = "expiry_sweep", "job_trigger_received");
    Ok(Json(state.jobs.expire_expired_applications().await?))
}

pub async fn expiry_emails(State(state): State<AppState>) -> JobResponse {
    info!(job = "expiry_emails", "job_trigger_received");
    Ok(Json(state.jobs.send_expiry_emails().await?))
}
