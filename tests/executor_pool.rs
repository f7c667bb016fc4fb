// tests/executor_pool.rs
// Bounded-concurrency behavior of the executor's two worker pools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use price_sync::config::ExecutorCfg;
use price_sync::error::StoreError;
use price_sync::executor::Executor;
use price_sync::store::{NewRecordProps, PropertyUpdate, RecordPage, RemoteStore};
use price_sync::types::{Operation, PlannedOperation};

/// Tracks how many operations of each kind are in flight at once.
#[derive(Default)]
struct GaugedStore {
    updates_in_flight: AtomicUsize,
    updates_peak: AtomicUsize,
    creates_in_flight: AtomicUsize,
    creates_peak: AtomicUsize,
    total_peak: AtomicUsize,
}

impl GaugedStore {
    fn enter(in_flight: &AtomicUsize, peak: &AtomicUsize) -> usize {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        now
    }

    async fn work(&self, in_flight: &AtomicUsize, peak: &AtomicUsize) {
        let now = Self::enter(in_flight, peak);
        let total = self.updates_in_flight.load(Ordering::SeqCst)
            + self.creates_in_flight.load(Ordering::SeqCst);
        self.total_peak.fetch_max(total.max(now), Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for GaugedStore {
    async fn query_page(
        &self,
        _cursor: Option<&str>,
        _page_size: u32,
    ) -> Result<RecordPage, StoreError> {
        unimplemented!("not exercised")
    }

    async fn update_record(
        &self,
        _record_id: &str,
        _props: PropertyUpdate,
    ) -> Result<(), StoreError> {
        self.work(&self.updates_in_flight, &self.updates_peak).await;
        Ok(())
    }

    async fn create_record(&self, _props: NewRecordProps) -> Result<(), StoreError> {
        self.work(&self.creates_in_flight, &self.creates_peak).await;
        Ok(())
    }
}

fn update(n: usize) -> PlannedOperation {
    PlannedOperation {
        asset_key: format!("U{n}"),
        op: Operation::Update {
            record_id: format!("r{n}"),
            value: n as f64,
            timestamp: Utc::now(),
        },
    }
}

fn create(n: usize) -> PlannedOperation {
    PlannedOperation {
        asset_key: format!("C{n}"),
        op: Operation::Create {
            display_key: format!("C{n}"),
            external_id: format!("c{n}"),
            value: n as f64,
            timestamp: Utc::now(),
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn twelve_updates_never_exceed_width_five() {
    let store = Arc::new(GaugedStore::default());
    let executor = Executor::new(
        store.clone(),
        ExecutorCfg {
            update_workers: 5,
            create_workers: 3,
        },
    );

    let report = executor.execute((0..12).map(update).collect()).await;

    assert_eq!(report.updated, 12);
    assert_eq!(report.failed, 0);
    assert!(
        store.updates_peak.load(Ordering::SeqCst) <= 5,
        "update pool exceeded its width"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pools_are_bounded_independently() {
    let store = Arc::new(GaugedStore::default());
    let executor = Executor::new(
        store.clone(),
        ExecutorCfg {
            update_workers: 2,
            create_workers: 1,
        },
    );

    let mut ops: Vec<PlannedOperation> = (0..6).map(update).collect();
    ops.extend((0..4).map(create));
    let report = executor.execute(ops).await;

    assert_eq!(report.updated, 6);
    assert_eq!(report.created, 4);
    assert!(store.updates_peak.load(Ordering::SeqCst) <= 2);
    assert!(store.creates_peak.load(Ordering::SeqCst) <= 1);
}

/// Store that rejects every write; the executor must still join cleanly
/// and count each failure.
struct RefusingStore;

#[async_trait]
impl RemoteStore for RefusingStore {
    async fn query_page(
        &self,
        _cursor: Option<&str>,
        _page_size: u32,
    ) -> Result<RecordPage, StoreError> {
        unimplemented!("not exercised")
    }

    async fn update_record(
        &self,
        _record_id: &str,
        _props: PropertyUpdate,
    ) -> Result<(), StoreError> {
        Err(StoreError::Status {
            status: 503,
            body: "down".to_string(),
        })
    }

    async fn create_record(&self, _props: NewRecordProps) -> Result<(), StoreError> {
        Err(StoreError::Status {
            status: 503,
            body: "down".to_string(),
        })
    }
}

#[tokio::test]
async fn failures_are_isolated_and_counted() {
    let executor = Executor::new(Arc::new(RefusingStore), ExecutorCfg::default());
    let mut ops: Vec<PlannedOperation> = (0..3).map(update).collect();
    ops.push(create(0));

    let report = executor.execute(ops).await;

    assert_eq!(report.updated, 0);
    assert_eq!(report.created, 0);
    assert_eq!(report.failed, 4);
    assert_eq!(report.results.len(), 4);
    assert!(report.results.iter().all(|r| matches!(
        r.outcome,
        price_sync::types::Outcome::Failure(_)
    )));
}
