use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tidepool_common::utils::config::load_config;

/// Mempool configuration. Defaults mirror a production consensus node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolConfig {
    /// Maximum number of admitted transactions
    #[serde(default = "default_size")]
    pub size: usize,

    /// Maximum cumulative bytes of all admitted transactions
    #[serde(default = "default_max_txs_bytes")]
    pub max_txs_bytes: u64,

    /// Maximum size of a single transaction
    #[serde(default = "default_max_tx_bytes")]
    pub max_tx_bytes: usize,

    /// Capacity of the recent-tx cache; 0 disables it
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Keep fingerprints of rejected transactions cached, suppressing
    /// re-validation at the cost of never retrying them
    #[serde(default)]
    pub keep_invalid_txs_in_cache: bool,

    /// Re-validate surviving transactions after every committed block
    #[serde(default = "default_recheck")]
    pub recheck: bool,

    /// Record gossip nodes for re-broadcast
    #[serde(default = "default_broadcast")]
    pub broadcast: bool,

    /// Grace window for a single application check, in milliseconds.
    /// A check that outlives it counts as rejected.
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            max_txs_bytes: default_max_txs_bytes(),
            max_tx_bytes: default_max_tx_bytes(),
            cache_size: default_cache_size(),
            keep_invalid_txs_in_cache: false,
            recheck: default_recheck(),
            broadcast: default_broadcast(),
            check_timeout_ms: default_check_timeout_ms(),
        }
    }
}

// Default values
fn default_size() -> usize { 5000 }
fn default_max_txs_bytes() -> u64 { 1024 * 1024 * 1024 }
fn default_max_tx_bytes() -> usize { 1024 * 1024 }
fn default_cache_size() -> usize { 10000 }
fn default_recheck() -> bool { true }
fn default_broadcast() -> bool { true }
fn default_check_timeout_ms() -> u64 { 5000 }

/// On-disk configuration wrapper; the mempool options live under a
/// `[mempool]` section as in the node configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub mempool: MempoolConfig,
}

impl MempoolConfig {
    /// Loads the `[mempool]` section from a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: CoreConfig = load_config(path)?;
        Ok(config.mempool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = MempoolConfig::default();
        assert_eq!(cfg.size, 5000);
        assert_eq!(cfg.cache_size, 10000);
        assert_eq!(cfg.max_tx_bytes, 1024 * 1024);
        assert!(!cfg.keep_invalid_txs_in_cache);
        assert!(cfg.recheck);
        assert!(cfg.broadcast);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[mempool]\nsize = 3\ncache_size = 1").unwrap();

        let cfg = MempoolConfig::load(&path).unwrap();
        assert_eq!(cfg.size, 3);
        assert_eq!(cfg.cache_size, 1);
        // untouched keys come from the defaults
        assert_eq!(cfg.max_txs_bytes, 1024 * 1024 * 1024);
        assert!(cfg.recheck);
    }
}
