use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};

/// Jittered exponential backoff starting at 100ms, five attempts total.
/// Shared by every I/O adapter so a transient SQS/S3/Postgres error is
/// retried in place rather than surfaced to the caller.
pub fn default_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(100).map(jitter).take(4)
}
