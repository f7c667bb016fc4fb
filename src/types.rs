// src/types.rs
use chrono::{DateTime, Utc};

/// One configured asset whose price is kept in sync. Static for a run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct TrackedAsset {
    /// Identifier the upstream price source knows, e.g. "bitcoin".
    pub external_id: String,
    /// Human-facing label and primary record-matching key, e.g. "BTC".
    pub display_key: String,
}

/// A price the upstream source returned for one asset during this run.
/// Assets absent from the upstream response simply have no `Quote`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub external_id: String,
    pub value: f64,
    pub fetched_at: DateTime<Utc>,
}

/// A pending write against the remote record store.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Update {
        record_id: String,
        value: f64,
        timestamp: DateTime<Utc>,
    },
    Create {
        display_key: String,
        external_id: String,
        value: f64,
        timestamp: DateTime<Utc>,
    },
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Update { .. } => OpKind::Update,
            Operation::Create { .. } => OpKind::Create,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Update,
    Create,
}

/// An `Operation` paired with the display key it was planned for, so the
/// executor can report outcomes per asset without knowing wire details.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOperation {
    pub asset_key: String,
    pub op: Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub asset_key: String,
    pub kind: OpKind,
    pub outcome: Outcome,
}

/// Aggregate report for one run. Individual failures live here, not in the
/// run's `Result`; only a totally unreachable upstream fails the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub updated: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Display keys that had no price data this run.
    pub skipped_assets: Vec<String>,
}
