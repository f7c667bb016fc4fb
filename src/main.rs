//! Price Sync — Binary Entrypoint
//! One synchronous run: load config and credentials, sync tracked asset
//! prices into the remote record store, print the summary, exit. Exit
//! status is non-zero only when the run could not complete at all;
//! individual asset failures are reported in the summary instead.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use price_sync::config::SyncConfig;
use price_sync::engine::SyncEngine;
use price_sync::store::notion::NotionStore;
use price_sync::upstream::coingecko::CoinGeckoSource;
use price_sync::upstream::QuoteFetcher;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("price_sync=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op where the environment is already set.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = SyncConfig::load_default().context("loading sync configuration")?;
    let store = NotionStore::from_env().context("configuring record store")?;
    let fetcher = QuoteFetcher::new(Box::new(CoinGeckoSource::from_env()), cfg.fetch.clone());

    let engine = SyncEngine::new(
        fetcher,
        Arc::new(store),
        cfg.index.clone(),
        cfg.executor.clone(),
    );
    let summary = engine.run(&cfg.assets).await?;

    println!(
        "updated={} created={} skipped={} failed={}",
        summary.updated, summary.created, summary.skipped, summary.failed
    );
    for key in &summary.skipped_assets {
        println!("skipped {key}: no price data");
    }
    Ok(())
}
