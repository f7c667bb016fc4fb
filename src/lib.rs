// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod index;
pub mod reconcile;
pub mod store;
pub mod types;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::config::SyncConfig;
pub use crate::engine::SyncEngine;
pub use crate::error::{StoreError, SyncError, UpstreamError};
pub use crate::types::{
    Operation, OperationResult, Outcome, Quote, SyncSummary, TrackedAsset,
};
