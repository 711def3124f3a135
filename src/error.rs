use thiserror::Error;

/// Reasons a trade tick is rejected by the aggregator
#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("malformed trade: {0}")]
    Malformed(String),

    #[error("stale trade at {event_time}: bucket {bucket_start} already finalized")]
    Stale { event_time: i64, bucket_start: i64 },

    #[error("candle state lock poisoned")]
    Poisoned,
}

/// Failures at the order gateway boundary
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures at the trade store boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid stored row: {0}")]
    InvalidRow(String),
}

/// Failures at the notifier boundary
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}
