// src/config.rs
// Run configuration: the tracked-asset list plus tuning knobs, loaded from
// TOML. Components receive their slice of this struct at construction and
// never read process-wide state themselves.

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::TrackedAsset;

const ENV_PATH: &str = "SYNC_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/assets.toml";

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_secs() -> u64 {
    5
}
fn default_rate_limit_fallback_secs() -> u64 {
    60
}
fn default_currency() -> String {
    "usd".to_string()
}
fn default_page_size() -> u32 {
    100
}
fn default_update_workers() -> usize {
    5
}
fn default_create_workers() -> usize {
    3
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct FetchCfg {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Wait applied on a rate-limit signal when the server supplies no
    /// reset interval.
    #[serde(default = "default_rate_limit_fallback_secs")]
    pub rate_limit_fallback_secs: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            rate_limit_fallback_secs: default_rate_limit_fallback_secs(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct IndexCfg {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for IndexCfg {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ExecutorCfg {
    #[serde(default = "default_update_workers")]
    pub update_workers: usize,
    #[serde(default = "default_create_workers")]
    pub create_workers: usize,
}

impl Default for ExecutorCfg {
    fn default() -> Self {
        Self {
            update_workers: default_update_workers(),
            create_workers: default_create_workers(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SyncConfig {
    pub assets: Vec<TrackedAsset>,
    #[serde(default)]
    pub fetch: FetchCfg,
    #[serde(default)]
    pub index: IndexCfg,
    #[serde(default)]
    pub executor: ExecutorCfg,
}

impl SyncConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: SyncConfig = toml::from_str(s).context("parsing sync config TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sync config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallback:
    /// 1) $SYNC_CONFIG_PATH
    /// 2) config/assets.toml
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("SYNC_CONFIG_PATH points to non-existent path"));
        }
        let default = PathBuf::from(DEFAULT_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Err(anyhow!(
            "no sync config found (set {ENV_PATH} or provide {DEFAULT_PATH})"
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            bail!("sync config declares no assets");
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.external_id.trim().is_empty() || asset.display_key.trim().is_empty() {
                bail!("asset entries must have non-empty external_id and display_key");
            }
            if !seen.insert(asset.external_id.as_str()) {
                bail!("duplicate external_id in sync config: {}", asset.external_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    const MINIMAL: &str = r#"
[[assets]]
external_id = "bitcoin"
display_key = "BTC"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = SyncConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(cfg.assets.len(), 1);
        assert_eq!(cfg.fetch.max_attempts, 3);
        assert_eq!(cfg.fetch.backoff_secs, 5);
        assert_eq!(cfg.fetch.rate_limit_fallback_secs, 60);
        assert_eq!(cfg.fetch.currency, "usd");
        assert_eq!(cfg.index.page_size, 100);
        assert_eq!(cfg.executor.update_workers, 5);
        assert_eq!(cfg.executor.create_workers, 3);
    }

    #[test]
    fn overrides_are_honored() {
        let toml = format!(
            "{MINIMAL}\n[fetch]\nmax_attempts = 5\n\n[executor]\nupdate_workers = 2\n"
        );
        let cfg = SyncConfig::from_toml_str(&toml).unwrap();
        assert_eq!(cfg.fetch.max_attempts, 5);
        assert_eq!(cfg.executor.update_workers, 2);
        // untouched tables keep defaults
        assert_eq!(cfg.executor.create_workers, 3);
        assert_eq!(cfg.index.page_size, 100);
    }

    #[test]
    fn duplicate_external_id_is_rejected() {
        let toml = r#"
[[assets]]
external_id = "bitcoin"
display_key = "BTC"

[[assets]]
external_id = "bitcoin"
display_key = "XBT"
"#;
        assert!(SyncConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn empty_asset_list_is_rejected() {
        assert!(SyncConfig::from_toml_str("assets = []").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallback() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files in temp CWD: error, not silent empty config.
        assert!(SyncConfig::load_default().is_err());

        // Env var takes precedence over the repo-relative fallback.
        let p = tmp.path().join("assets.toml");
        fs::write(&p, MINIMAL).unwrap();
        env::set_var(ENV_PATH, p.display().to_string());
        let cfg = SyncConfig::load_default().unwrap();
        assert_eq!(cfg.assets[0].display_key, "BTC");
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
