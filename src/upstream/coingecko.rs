// src/upstream/coingecko.rs
use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::UpstreamError;
use crate::upstream::QuoteSource;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// CoinGecko `simple/price` client. One GET covers the whole tracked set:
/// `{base}/simple/price?ids=a,b,c&vs_currencies=usd`.
pub struct CoinGeckoSource {
    base_url: String,
    client: Client,
}

impl CoinGeckoSource {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Tests and alternate deployments point this at another origin.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Honors `COINGECKO_BASE_URL` when set.
    pub fn from_env() -> Self {
        match std::env::var("COINGECKO_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url),
            _ => Self::new(),
        }
    }

    fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
        resp.headers()
            .get(reqwest::header::RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}

impl Default for CoinGeckoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl QuoteSource for CoinGeckoSource {
    async fn fetch_batch(
        &self,
        external_ids: &[String],
        currency: &str,
    ) -> Result<HashMap<String, f64>, UpstreamError> {
        let url = format!("{}/simple/price", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("ids", external_ids.join(",").as_str()),
                ("vs_currencies", currency),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited {
                retry_after: Self::retry_after(&resp),
            });
        }
        if !resp.status().is_success() {
            return Err(UpstreamError::Status(resp.status().as_u16()));
        }

        // Shape: { "<id>": { "<currency>": <number>, ... }, ... }
        let body: HashMap<String, HashMap<String, f64>> = resp.json().await?;
        let mut out = HashMap::with_capacity(external_ids.len());
        for id in external_ids {
            if let Some(value) = body.get(id).and_then(|per| per.get(currency)) {
                out.insert(id.clone(), *value);
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "coingecko"
    }
}
