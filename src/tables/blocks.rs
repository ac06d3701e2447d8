//! Canonical-winner and own-candidate block tables

use super::{coerce_f64, coerce_u64, delta_secs};
use crate::error::{AuditError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Block as returned by the indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub block_height: Value,
    #[serde(default)]
    pub canonical: Option<bool>,
    pub creator: String,
    pub date_time: String,
    pub received_time: String,
    pub protocol_state: RawProtocolState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProtocolState {
    pub consensus_state: RawConsensusState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConsensusState {
    pub slot: Value,
    pub slot_since_genesis: Value,
    pub last_vrf_output: String,
    #[serde(default)]
    pub staking_epoch_data: Option<RawStakingEpochData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStakingEpochData {
    pub ledger: RawLedgerRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLedgerRef {
    pub hash: String,
    pub total_currency: Value,
}

/// Normalized block row
#[derive(Debug, Clone, Serialize)]
pub struct BlockRecord {
    pub block_height: u64,
    pub creator: String,
    /// Slot within the epoch
    pub slot: u64,
    /// Slot since genesis
    pub global_slot: u64,
    pub last_vrf_output: String,
    pub canonical: Option<bool>,
    /// Produced
    pub date_time: DateTime<Utc>,
    /// Seen by the indexer
    pub received_time: DateTime<Utc>,
    /// `received_time - date_time`
    #[serde(serialize_with = "delta_secs::serialize")]
    pub time_diff: TimeDelta,
    pub ledger_hash: Option<String>,
    /// Total currency in nanomina
    pub total_currency: Option<f64>,
}

fn parse_time(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AuditError::MalformedRecord(format!("{} {:?}: {}", field, value, e)))
}

impl TryFrom<RawBlock> for BlockRecord {
    type Error = AuditError;

    fn try_from(raw: RawBlock) -> Result<Self> {
        let consensus = raw.protocol_state.consensus_state;
        let date_time = parse_time(&raw.date_time, "dateTime")?;
        let received_time = parse_time(&raw.received_time, "receivedTime")?;

        let (ledger_hash, total_currency) = match consensus.staking_epoch_data {
            Some(data) => (
                Some(data.ledger.hash),
                Some(coerce_f64(&data.ledger.total_currency, "totalCurrency")?),
            ),
            None => (None, None),
        };

        Ok(Self {
            block_height: coerce_u64(&raw.block_height, "blockHeight")?,
            creator: raw.creator,
            slot: coerce_u64(&consensus.slot, "slot")?,
            global_slot: coerce_u64(&consensus.slot_since_genesis, "slotSinceGenesis")?,
            last_vrf_output: consensus.last_vrf_output,
            canonical: raw.canonical,
            date_time,
            received_time,
            time_diff: received_time - date_time,
            ledger_hash,
            total_currency,
        })
    }
}

fn normalize(raw: Vec<RawBlock>) -> Result<Vec<BlockRecord>> {
    raw.into_iter().map(BlockRecord::try_from).collect()
}

/// Canonical winners of the epoch, ascending by global slot
pub fn canonical_table(raw: Vec<RawBlock>) -> Result<Vec<BlockRecord>> {
    let mut table = normalize(raw)?;
    table.sort_by_key(|b| (b.global_slot, b.block_height));
    Ok(table)
}

/// Blocks the tracked producer created, tallest first so the first match per
/// slot is the most canonical candidate
pub fn own_candidate_table(raw: Vec<RawBlock>) -> Result<Vec<BlockRecord>> {
    let mut table = normalize(raw)?;
    table.sort_by(|a, b| b.block_height.cmp(&a.block_height));
    Ok(table)
}

/// Epoch-constant values read once from the canonical table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochData {
    pub ledger_hash: String,
    /// Total currency in mina
    pub total_currency: f64,
    /// Epoch-relative slot of the last canonical block
    pub last_slot: u64,
    /// Global slot of the last canonical block
    pub last_global_slot: u64,
}

impl EpochData {
    /// Staking ledger values from the first row, last slot from the last row
    pub fn from_canonical(table: &[BlockRecord]) -> Result<Self> {
        let (first, last) = match (table.first(), table.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(AuditError::MalformedRecord(
                    "no canonical blocks in epoch".to_string(),
                ))
            }
        };

        let ledger_hash = first.ledger_hash.clone().ok_or_else(|| {
            AuditError::MalformedRecord("canonical block missing staking ledger hash".to_string())
        })?;
        let total_currency = first.total_currency.ok_or_else(|| {
            AuditError::MalformedRecord("canonical block missing total currency".to_string())
        })?;

        Ok(Self {
            ledger_hash,
            total_currency: total_currency / 1e9,
            last_slot: last.slot,
            last_global_slot: last.global_slot,
        })
    }
}
