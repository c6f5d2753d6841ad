//! Error types for each external boundary and for job runs.

/// Failure talking to the redemption registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry token request failed: {0}")]
    Auth(#[from] AuthError),
    #[error("invalid registry url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected registry response: {0}")]
    Response(String),
}

/// Failure obtaining an OAuth access token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token response missing access_token")]
    MissingToken,
}

/// Failure submitting a message to the mail relay.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail relay token request failed: {0}")]
    Auth(#[from] AuthError),
}

/// Failure reading or writing rebate records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("rebate {0} not found")]
    RebateNotFound(i64),
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

/// Failure enqueueing a notification.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),
}

/// Job-level failure reported to whatever triggered the job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{job} timed out")]
    TimedOut { job: &'static str },
    #[error("invalid timestamp {0:?}, expected YYYY-MM-DDTHH:MM:SSZ")]
    InvalidTimestamp(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
