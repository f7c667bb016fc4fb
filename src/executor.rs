// src/executor.rs
//! # Executor
//! Fans planned operations out across two independently bounded worker
//! pools (updates and creates), isolates each operation's failure, and
//! fans back in before reporting counts. A failed update never falls back
//! to a create; that would risk duplicate records if the update partially
//! landed upstream.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::ExecutorCfg;
use crate::store::{NewRecordProps, PropertyUpdate, RemoteStore};
use crate::types::{OpKind, Operation, Outcome, OperationResult, PlannedOperation};

#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub updated: usize,
    pub created: usize,
    pub failed: usize,
    pub results: Vec<OperationResult>,
}

pub struct Executor {
    store: Arc<dyn RemoteStore>,
    cfg: ExecutorCfg,
}

impl Executor {
    pub fn new(store: Arc<dyn RemoteStore>, cfg: ExecutorCfg) -> Self {
        Self { store, cfg }
    }

    /// Run every operation and return once all of them have completed or
    /// failed. Updates and creates are gated by separate semaphores, so
    /// the two kinds proceed concurrently but neither exceeds its
    /// configured width.
    pub async fn execute(&self, operations: Vec<PlannedOperation>) -> ExecutionReport {
        let update_gate = Arc::new(Semaphore::new(self.cfg.update_workers.max(1)));
        let create_gate = Arc::new(Semaphore::new(self.cfg.create_workers.max(1)));

        let mut handles: Vec<JoinHandle<OperationResult>> =
            Vec::with_capacity(operations.len());
        for planned in operations {
            let gate = match planned.op.kind() {
                OpKind::Update => update_gate.clone(),
                OpKind::Create => create_gate.clone(),
            };
            let store = self.store.clone();
            handles.push(tokio::spawn(run_one(store, gate, planned)));
        }

        let mut report = ExecutionReport::default();
        for handle in handles {
            let result = match handle.await {
                Ok(r) => r,
                Err(e) => {
                    // A panicked worker is a failure of its operation, not the run.
                    tracing::error!(error = %e, "operation task panicked");
                    OperationResult {
                        asset_key: String::new(),
                        kind: OpKind::Update,
                        outcome: Outcome::Failure(format!("task join error: {e}")),
                    }
                }
            };
            match (&result.outcome, result.kind) {
                (Outcome::Success, OpKind::Update) => report.updated += 1,
                (Outcome::Success, OpKind::Create) => report.created += 1,
                (Outcome::Failure(_), _) => report.failed += 1,
            }
            report.results.push(result);
        }

        counter!("sync_updated_total").increment(report.updated as u64);
        counter!("sync_created_total").increment(report.created as u64);
        counter!("sync_failed_total").increment(report.failed as u64);
        report
    }
}

async fn run_one(
    store: Arc<dyn RemoteStore>,
    gate: Arc<Semaphore>,
    planned: PlannedOperation,
) -> OperationResult {
    let kind = planned.op.kind();
    let permit = match gate.acquire_owned().await {
        Ok(p) => p,
        Err(_) => {
            return OperationResult {
                asset_key: planned.asset_key,
                kind,
                outcome: Outcome::Failure("worker pool closed".to_string()),
            }
        }
    };

    let outcome = match planned.op {
        Operation::Update {
            ref record_id,
            value,
            timestamp,
        } => store
            .update_record(record_id, PropertyUpdate { value, timestamp })
            .await
            .map(|()| {
                tracing::info!(asset = %planned.asset_key, value, "updated record price")
            }),
        Operation::Create {
            ref display_key,
            ref external_id,
            value,
            timestamp,
        } => store
            .create_record(NewRecordProps {
                display_key: display_key.clone(),
                external_id: external_id.clone(),
                value,
                timestamp,
            })
            .await
            .map(|()| {
                tracing::info!(asset = %planned.asset_key, value, "created record")
            }),
    };
    drop(permit);

    let outcome = match outcome {
        Ok(()) => Outcome::Success,
        Err(e) => {
            tracing::error!(asset = %planned.asset_key, error = %e, "operation failed");
            Outcome::Failure(e.to_string())
        }
    };
    OperationResult {
        asset_key: planned.asset_key,
        kind,
        outcome,
    }
}
