// src/upstream/mod.rs
// Upstream price retrieval: one batched request per run, wrapped in a
// bounded retry loop with rate-limit-aware backoff.

pub mod coingecko;

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;

use crate::config::FetchCfg;
use crate::error::{SyncError, UpstreamError};
use crate::types::{Quote, TrackedAsset};

/// A source of current prices. Implementations own transport details;
/// the fetcher only sees values keyed by external id.
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch current values for the given external ids in one request.
    /// Ids the source has no data for are simply absent from the map.
    async fn fetch_batch(
        &self,
        external_ids: &[String],
        currency: &str,
    ) -> Result<HashMap<String, f64>, UpstreamError>;

    fn name(&self) -> &'static str;
}

pub struct QuoteFetcher {
    source: Box<dyn QuoteSource>,
    cfg: FetchCfg,
}

impl QuoteFetcher {
    pub fn new(source: Box<dyn QuoteSource>, cfg: FetchCfg) -> Self {
        Self { source, cfg }
    }

    /// Retrieve quotes for all assets with one batched request, retrying up
    /// to `max_attempts` times. A rate-limit response waits the
    /// server-specified interval (fallback 60s) and still consumes exactly
    /// one attempt; transport and status errors wait the fixed backoff.
    /// Fails only after every attempt is exhausted.
    pub async fn fetch_all(
        &self,
        assets: &[TrackedAsset],
    ) -> Result<HashMap<String, Quote>, SyncError> {
        let ids: Vec<String> = assets.iter().map(|a| a.external_id.clone()).collect();
        let max_attempts = self.cfg.max_attempts.max(1);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.source.fetch_batch(&ids, &self.cfg.currency).await {
                Ok(values) => {
                    let fetched_at = Utc::now();
                    let quotes: HashMap<String, Quote> = values
                        .into_iter()
                        .map(|(external_id, value)| {
                            let q = Quote {
                                external_id: external_id.clone(),
                                value,
                                fetched_at,
                            };
                            (external_id, q)
                        })
                        .collect();
                    counter!("sync_quotes_fetched_total").increment(quotes.len() as u64);
                    tracing::info!(
                        source = self.source.name(),
                        attempt,
                        quotes = quotes.len(),
                        "fetched upstream prices"
                    );
                    return Ok(quotes);
                }
                Err(e) => e,
            };

            if attempt >= max_attempts {
                counter!("sync_upstream_failures_total").increment(1);
                return Err(SyncError::UpstreamUnavailable {
                    attempts: max_attempts,
                    source: err,
                });
            }

            let wait = match &err {
                UpstreamError::RateLimited { retry_after } => {
                    let wait = retry_after
                        .unwrap_or(Duration::from_secs(self.cfg.rate_limit_fallback_secs));
                    tracing::info!(
                        source = self.source.name(),
                        attempt,
                        wait_secs = wait.as_secs(),
                        "rate limit hit; waiting for reset"
                    );
                    wait
                }
                other => {
                    tracing::warn!(
                        source = self.source.name(),
                        attempt,
                        error = %other,
                        "upstream attempt failed; backing off"
                    );
                    Duration::from_secs(self.cfg.backoff_secs)
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}
