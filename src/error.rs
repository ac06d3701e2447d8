//! Error taxonomy for epoch assembly
//!
//! Every failure aborts the whole epoch. A row is never classified from
//! partially decoded or unresolved inputs.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Debug, Error)]
pub enum AuditError {
    /// The indexer (or the ledger download source) failed or returned an error payload.
    #[error("query source unavailable: {0}")]
    SourceUnavailable(String),

    /// No local witness stream exists for this (producer, epoch).
    #[error("no witness file for epoch {epoch} at {}", path.display())]
    WitnessFileMissing { epoch: u32, path: PathBuf },

    /// VRF output is not valid base58check or is too short.
    #[error("cannot decode VRF output {output:?}: {reason}")]
    Decode { output: String, reason: String },

    /// A witness names a delegator index the ledger does not map to this producer.
    #[error("delegator index {index} (global slot {global_slot}) not found in ledger {ledger_hash}")]
    UnresolvedDelegator {
        index: u64,
        global_slot: u64,
        ledger_hash: String,
    },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AuditError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for AuditError {
    fn from(err: reqwest::Error) -> Self {
        AuditError::SourceUnavailable(err.to_string())
    }
}
