//! Runtime configuration
//!
//! Values come from the environment (optionally seeded from a `.env` file by
//! the CLI). Everything has a default except the ledger download source,
//! which is only needed when a ledger is missing from the cache.

use std::path::PathBuf;
use std::time::Duration;

/// Slots in one epoch
pub const SLOTS_PER_EPOCH: u64 = 7140;

/// Wall-clock length of one slot
pub const SLOT_DURATION: Duration = Duration::from_secs(3 * 60);

/// Receipt latency above which a produced block counts as late
pub const DEFAULT_LATE_THRESHOLD: Duration = Duration::from_secs(3 * 60);

pub const DEFAULT_ENDPOINT: &str = "https://graphql.minaexplorer.com";

#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Indexer GraphQL endpoint
    pub endpoint: String,
    /// Directory holding `<ledger_hash>.json` snapshots
    pub ledger_dir: PathBuf,
    /// Base URL serving `<ledger_hash>.json` (fetched on cache miss)
    pub ledger_source: Option<String>,
    /// Root of `<producer_key>/check-epoch-<epoch>` witness streams
    pub witness_dir: PathBuf,
    pub request_timeout: Duration,
    pub late_threshold: Duration,
    pub slot_duration: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            ledger_dir: default_ledger_dir(),
            ledger_source: None,
            witness_dir: PathBuf::from("vrf-checked"),
            request_timeout: Duration::from_secs(30),
            late_threshold: DEFAULT_LATE_THRESHOLD,
            slot_duration: SLOT_DURATION,
        }
    }
}

impl AuditConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("MINA_EXPLORER_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(path) = std::env::var("LEDGER_PATH") {
            config.ledger_dir = PathBuf::from(path);
        }
        if let Ok(source) = std::env::var("LEDGER_DOWNLOAD_SOURCE") {
            if !source.trim().is_empty() {
                config.ledger_source = Some(source.trim_end_matches('/').to_string());
            }
        }
        if let Ok(path) = std::env::var("VRF_CHECKED_PATH") {
            config.witness_dir = PathBuf::from(path);
        }
        if let Some(secs) = env_secs("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("LATE_THRESHOLD_SECS") {
            config.late_threshold = Duration::from_secs(secs);
        }

        config
    }
}

fn env_secs(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// `<cache dir>/minavrf/ledgers`, or `./ledgers` when the platform has no cache dir
pub fn default_ledger_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("minavrf").join("ledgers"))
        .unwrap_or_else(|| PathBuf::from("ledgers"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.late_threshold, Duration::from_secs(180));
        assert_eq!(config.slot_duration, Duration::from_secs(180));
        assert!(config.ledger_source.is_none());
        assert!(config.ledger_dir.ends_with("ledgers"));
    }
}
