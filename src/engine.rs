//! # Sync Engine
//! One synchronous run: fetch quotes and build the record index
//! concurrently, reconcile them into a plan, execute the plan under
//! bounded concurrency, and report aggregate counts. Only a totally
//! unreachable upstream fails the run; everything else degrades into
//! the summary.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::config::{ExecutorCfg, IndexCfg};
use crate::error::SyncError;
use crate::executor::Executor;
use crate::index::{build_index, normalize_key};
use crate::reconcile::reconcile;
use crate::store::RemoteStore;
use crate::types::{SyncSummary, TrackedAsset};
use crate::upstream::QuoteFetcher;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "sync_quotes_fetched_total",
            "Quotes returned by the upstream source."
        );
        describe_counter!(
            "sync_upstream_failures_total",
            "Runs aborted with the upstream unreachable."
        );
        describe_counter!("sync_updated_total", "Records updated successfully.");
        describe_counter!("sync_created_total", "Records created successfully.");
        describe_counter!("sync_skipped_total", "Assets skipped for lack of a quote.");
        describe_counter!("sync_failed_total", "Operations that failed.");
        describe_counter!(
            "sync_index_collisions_total",
            "Duplicate match keys dropped while indexing."
        );
        describe_counter!(
            "sync_index_page_errors_total",
            "Record pages that failed to fetch or parse."
        );
        describe_gauge!("sync_last_run_ts", "Unix ts when a sync run last finished.");
    });
}

pub struct SyncEngine {
    fetcher: QuoteFetcher,
    store: Arc<dyn RemoteStore>,
    index_cfg: IndexCfg,
    executor_cfg: ExecutorCfg,
}

impl SyncEngine {
    pub fn new(
        fetcher: QuoteFetcher,
        store: Arc<dyn RemoteStore>,
        index_cfg: IndexCfg,
        executor_cfg: ExecutorCfg,
    ) -> Self {
        Self {
            fetcher,
            store,
            index_cfg,
            executor_cfg,
        }
    }

    pub async fn run(&self, assets: &[TrackedAsset]) -> Result<SyncSummary, SyncError> {
        ensure_metrics_described();

        let known_keys: HashSet<String> = assets
            .iter()
            .map(|a| normalize_key(&a.display_key))
            .collect();

        // Quote fetch and index build are mutually independent; the
        // reconciler is the barrier that needs both.
        let (quotes, index) = tokio::join!(
            self.fetcher.fetch_all(assets),
            build_index(self.store.as_ref(), self.index_cfg.page_size, &known_keys),
        );
        let quotes = quotes?;

        let plan = reconcile(assets, &quotes, &index);
        counter!("sync_skipped_total").increment(plan.skipped.len() as u64);

        let report = Executor::new(self.store.clone(), self.executor_cfg.clone())
            .execute(plan.operations)
            .await;

        gauge!("sync_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        let summary = SyncSummary {
            updated: report.updated,
            created: report.created,
            skipped: plan.skipped.len(),
            failed: report.failed,
            skipped_assets: plan.skipped,
        };
        tracing::info!(
            updated = summary.updated,
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync run finished"
        );
        Ok(summary)
    }
}
