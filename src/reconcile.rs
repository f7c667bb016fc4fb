// src/reconcile.rs
//! # Reconciler
//! Pure join of upstream quotes with the record index: each tracked asset
//! with a quote becomes exactly one Update or Create, in configured asset
//! order. Suitable for unit tests; no I/O, mutates neither input.

use std::collections::HashMap;

use crate::index::{normalize_key, RecordIndex};
use crate::types::{Operation, PlannedOperation, Quote, TrackedAsset};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub operations: Vec<PlannedOperation>,
    /// Display keys of assets with no price data this run.
    pub skipped: Vec<String>,
}

pub fn reconcile(
    assets: &[TrackedAsset],
    quotes: &HashMap<String, Quote>,
    index: &RecordIndex,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for asset in assets {
        let Some(quote) = quotes.get(&asset.external_id) else {
            tracing::info!(
                asset = %asset.display_key,
                external_id = %asset.external_id,
                "no price data; skipping"
            );
            plan.skipped.push(asset.display_key.clone());
            continue;
        };

        let key = normalize_key(&asset.display_key);
        let op = match index.get(&key) {
            Some(record_id) => Operation::Update {
                record_id: record_id.to_string(),
                value: quote.value,
                timestamp: quote.fetched_at,
            },
            None => Operation::Create {
                display_key: asset.display_key.clone(),
                external_id: asset.external_id.clone(),
                value: quote.value,
                timestamp: quote.fetched_at,
            },
        };
        plan.operations.push(PlannedOperation {
            asset_key: asset.display_key.clone(),
            op,
        });
    }

    plan
}
