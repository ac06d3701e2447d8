//! Indexer queries
//!
//! The assembler only sees the [`QuerySource`] trait. [`IndexerClient`] is the
//! GraphQL implementation; tests substitute an in-memory source.

pub mod builders;
pub mod client;

pub use builders::{epoch_blocks_query, stakers_query};
pub use client::IndexerClient;

use crate::error::Result;
use crate::tables::{RawBlock, RawStake};

/// Source of block and staking data for one epoch
#[allow(async_fn_in_trait)]
pub trait QuerySource {
    /// Blocks of `epoch`. With no creator, only canonical blocks; with a
    /// creator, every block that key produced, canonical or not.
    async fn epoch_blocks(&self, epoch: u32, creator: Option<&str>) -> Result<Vec<RawBlock>>;

    /// Accounts delegating to `delegate` in the staking ledger `ledger_hash`
    async fn stakes(&self, delegate: &str, ledger_hash: &str) -> Result<Vec<RawStake>>;
}
