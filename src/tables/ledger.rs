//! Staking ledger snapshots
//!
//! A ledger is addressed by its hash and never changes once published, so a
//! snapshot is downloaded at most once and kept on disk as `<hash>.json`.
//! Concurrent writers may race on the same entry; each writes its own
//! uniquely named temp file and persists it over the entry. The bytes are
//! identical either way.

use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// One account of a staking ledger. Its position in the snapshot is the
/// delegator index referenced by eligibility witnesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub pk: String,
    #[serde(default)]
    pub delegate: Option<String>,
    #[serde(default)]
    pub balance: Option<serde_json::Value>,
}

/// Delegator index -> public key, restricted to accounts delegating to `producer_key`
pub fn delegator_index_map(entries: &[LedgerEntry], producer_key: &str) -> HashMap<u64, String> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.delegate.as_deref() == Some(producer_key))
        .map(|(i, e)| (i as u64, e.pk.clone()))
        .collect()
}

/// On-disk cache of ledger snapshots with a download fallback
pub struct LedgerStore {
    dir: PathBuf,
    source: Option<String>,
    client: Client,
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>, source: Option<String>, client: Client) -> Self {
        Self {
            dir: dir.into(),
            source,
            client,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::new(
            config.ledger_dir.clone(),
            config.ledger_source.clone(),
            client,
        ))
    }

    /// Cache path for a ledger hash
    pub fn path(&self, ledger_hash: &str) -> Result<PathBuf> {
        if ledger_hash.is_empty()
            || ledger_hash.contains(['/', '\\'])
            || ledger_hash.starts_with('.')
        {
            return Err(AuditError::MalformedRecord(format!(
                "invalid ledger hash {:?}",
                ledger_hash
            )));
        }
        Ok(self.dir.join(format!("{}.json", ledger_hash)))
    }

    /// Load a ledger snapshot, downloading it on a cache miss
    pub async fn load(&self, ledger_hash: &str) -> Result<Vec<LedgerEntry>> {
        let path = self.path(ledger_hash)?;

        if path.exists() {
            debug!(ledger_hash, path = %path.display(), "ledger cache hit");
        } else {
            let bytes = self.download(ledger_hash).await?;
            write_if_absent(&path, &bytes)?;
        }

        let data = std::fs::read(&path).map_err(|e| AuditError::io(&path, e))?;
        let entries: Vec<LedgerEntry> = serde_json::from_slice(&data)?;
        debug!(ledger_hash, accounts = entries.len(), "ledger loaded");
        Ok(entries)
    }

    async fn download(&self, ledger_hash: &str) -> Result<Vec<u8>> {
        let source = self.source.as_deref().ok_or_else(|| {
            AuditError::SourceUnavailable(format!(
                "ledger {} is not cached and no download source is configured",
                ledger_hash
            ))
        })?;
        let url = format!("{}/{}.json", source.trim_end_matches('/'), ledger_hash);
        info!(ledger_hash, %url, "ledger cache miss, downloading");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::SourceUnavailable(format!(
                "ledger download {} failed with status {}",
                url, status
            )));
        }
        let bytes = response.bytes().await?.to_vec();

        // Refuse to cache anything that is not a ledger.
        serde_json::from_slice::<Vec<LedgerEntry>>(&bytes)?;
        Ok(bytes)
    }
}

/// Write `bytes` to `path` unless it already exists, via a uniquely named
/// temp file in the same directory that is then persisted over `path`
fn write_if_absent(path: &Path, bytes: &[u8]) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| AuditError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| AuditError::io(parent, e))?;
    temp.write_all(bytes).map_err(|e| AuditError::io(parent, e))?;
    temp.persist(path).map_err(|e| AuditError::io(path, e.error))?;
    Ok(())
}
