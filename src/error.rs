// src/error.rs
// Error taxonomy for the sync run. Only `SyncError::UpstreamUnavailable`
// aborts a run; store-side errors degrade into partial indexes or
// per-operation failure counts.

use std::time::Duration;

/// Classification of a single failed upstream attempt. Internal to the
/// retry loop; surfaced only inside `SyncError::UpstreamUnavailable`
/// once retries are exhausted.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("rate limited by upstream (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A failed interaction with the remote record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Fatal run errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("upstream price source unavailable after {attempts} attempts: {source}")]
    UpstreamUnavailable {
        attempts: u32,
        #[source]
        source: UpstreamError,
    },
}
