//! minavrf - block production outcome analysis for Mina block producers
//!
//! For one producer key and one finished epoch, this crate reconstructs what
//! happened at every slot the producer was eligible to win: it joins the
//! indexer's canonical blocks, the producer's own blocks and the node's local
//! VRF eligibility witnesses, then classifies each slot (won, lost, missed,
//! future, ...).
//!
//! ```no_run
//! # async fn run() -> minavrf::Result<()> {
//! use minavrf::{AuditConfig, EpochAssembler, IndexerClient, IndexerConfig};
//!
//! let config = AuditConfig::from_env();
//! let client = IndexerClient::new(IndexerConfig::from_audit_config(&config))?;
//! let assembler = EpochAssembler::from_config(client, &config)?;
//! let result = assembler.assemble(42, "B62q...").await?;
//! println!("{:?}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
/// VRF output decoding and the slot tie-break rule
pub mod digest;
pub mod error;
pub mod outcome;
/// Indexer query builders and client
pub mod query;
pub mod tables;

pub use assembler::{EpochAssembler, EpochResult, SlotLookups, SlotRow};
pub use config::{AuditConfig, SLOTS_PER_EPOCH};
pub use error::{AuditError, Result};
pub use outcome::{classify, ClassifierContext, Outcome, OutcomeSummary, SlotOutcomeRow};
pub use query::client::IndexerConfig;
pub use query::{IndexerClient, QuerySource};
