//! Epoch assembly
//!
//! Joins the canonical-winner table, the producer's own candidates and the
//! local eligibility witnesses for one (epoch, producer) pair into one row
//! per eligible slot, then classifies every row.
//!
//! Only slots with a threshold-met witness get a row. The canonical and
//! own-candidate fetches run concurrently, as do the ledger and stake
//! fetches that depend on the epoch's ledger hash.

use crate::config::{AuditConfig, DEFAULT_LATE_THRESHOLD, SLOTS_PER_EPOCH, SLOT_DURATION};
use crate::error::{AuditError, Result};
use crate::outcome::{classify, ClassifierContext, OutcomeSummary, SlotOutcomeRow};
use crate::query::QuerySource;
use crate::tables::{
    canonical_table, delegator_index_map, delta_secs, own_candidate_table, stake_table,
    supercharged_keys, BlockRecord, EligibilityWitness, EpochData, LedgerStore, StakeRecord,
    WitnessStore,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Joined per-slot fields before classification
#[derive(Debug, Clone, Serialize)]
pub struct SlotRow {
    pub epoch: u32,
    /// Slot within the epoch
    pub slot: u64,
    pub global_slot: u64,
    /// Height of the canonical block at this slot
    pub block: Option<u64>,
    pub winner_exists: bool,
    /// The producer created at least one block at this slot
    pub saw_my_producer: bool,
    /// The canonical block at this slot was created by the producer
    pub bp_won: bool,
    /// Receipt latencies of the producer's blocks at this slot
    #[serde(serialize_with = "delta_secs::list")]
    pub block_time: Vec<TimeDelta>,
    /// When the indexer received the canonical block
    pub received_time: Option<DateTime<Utc>>,
    /// Delegator account whose stake won the slot for the producer
    pub winner_pk: String,
    pub super_charged: bool,
}

/// Slot-keyed lookups shared by assembly and classification.
///
/// Canonical and own-candidate maps keep the first row per slot (the
/// canonical table is ordered by slot, own candidates tallest first).
/// Witness maps keep the last witness per slot.
#[derive(Debug, Clone, Default)]
pub struct SlotLookups {
    pub winner_vrf: HashMap<u64, String>,
    pub winner_height: HashMap<u64, u64>,
    pub winner_received: HashMap<u64, DateTime<Utc>>,
    pub winner_creator: HashMap<u64, String>,
    pub own_height: HashMap<u64, u64>,
    pub own_latencies: HashMap<u64, Vec<TimeDelta>>,
    pub delegator_index: HashMap<u64, u64>,
    pub witness_vrf: HashMap<u64, String>,
}

impl SlotLookups {
    pub fn build(
        canonical: &[BlockRecord],
        own: &[BlockRecord],
        witnesses: &[EligibilityWitness],
    ) -> Self {
        let mut lookups = Self::default();

        for block in canonical {
            let slot = block.global_slot;
            lookups
                .winner_vrf
                .entry(slot)
                .or_insert_with(|| block.last_vrf_output.clone());
            lookups.winner_height.entry(slot).or_insert(block.block_height);
            lookups.winner_received.entry(slot).or_insert(block.received_time);
            lookups
                .winner_creator
                .entry(slot)
                .or_insert_with(|| block.creator.clone());
        }

        for block in own {
            lookups
                .own_height
                .entry(block.global_slot)
                .or_insert(block.block_height);
            lookups
                .own_latencies
                .entry(block.global_slot)
                .or_default()
                .push(block.time_diff);
        }

        for witness in witnesses {
            lookups
                .delegator_index
                .insert(witness.global_slot, witness.delegator_index);
            lookups
                .witness_vrf
                .insert(witness.global_slot, witness.vrf_output.clone());
        }

        lookups
    }
}

/// Distinct witness slots in stream order
pub fn working_slots(witnesses: &[EligibilityWitness]) -> Vec<u64> {
    let mut seen = HashSet::new();
    witnesses
        .iter()
        .filter(|w| seen.insert(w.global_slot))
        .map(|w| w.global_slot)
        .collect()
}

/// Everything produced by one assembly
#[derive(Debug, Clone, Serialize)]
pub struct EpochResult {
    pub epoch: u32,
    pub producer_key: String,
    pub rows: Vec<SlotOutcomeRow>,
    pub canonical: Vec<BlockRecord>,
    pub own_candidates: Vec<BlockRecord>,
    pub stakes: Vec<StakeRecord>,
    pub epoch_data: EpochData,
    #[serde(serialize_with = "elapsed_secs")]
    pub elapsed: Duration,
}

impl EpochResult {
    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary::from_rows(&self.rows)
    }
}

fn elapsed_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Per-epoch assembler over a query source, a ledger cache and a witness store
pub struct EpochAssembler<S> {
    source: S,
    ledgers: LedgerStore,
    witnesses: WitnessStore,
    late_threshold: Duration,
    slot_duration: Duration,
}

impl<S: QuerySource> EpochAssembler<S> {
    pub fn new(source: S, ledgers: LedgerStore, witnesses: WitnessStore) -> Self {
        Self {
            source,
            ledgers,
            witnesses,
            late_threshold: DEFAULT_LATE_THRESHOLD,
            slot_duration: SLOT_DURATION,
        }
    }

    pub fn from_config(source: S, config: &AuditConfig) -> Result<Self> {
        Ok(Self::new(
            source,
            LedgerStore::from_config(config)?,
            WitnessStore::new(config.witness_dir.clone()),
        )
        .with_late_threshold(config.late_threshold)
        .with_slot_duration(config.slot_duration))
    }

    pub fn with_late_threshold(mut self, threshold: Duration) -> Self {
        self.late_threshold = threshold;
        self
    }

    pub fn with_slot_duration(mut self, duration: Duration) -> Self {
        self.slot_duration = duration;
        self
    }

    pub fn witness_store(&self) -> &WitnessStore {
        &self.witnesses
    }

    /// Assemble and classify every eligible slot of `epoch` for `producer_key`
    pub async fn assemble(&self, epoch: u32, producer_key: &str) -> Result<EpochResult> {
        let start = Instant::now();

        let (canonical_raw, own_raw) = tokio::try_join!(
            self.source.epoch_blocks(epoch, None),
            self.source.epoch_blocks(epoch, Some(producer_key)),
        )?;
        let canonical = canonical_table(canonical_raw)?;
        let epoch_data = EpochData::from_canonical(&canonical)?;

        let (ledger, stakes_raw) = tokio::try_join!(
            self.ledgers.load(&epoch_data.ledger_hash),
            self.source.stakes(producer_key, &epoch_data.ledger_hash),
        )?;
        let delegators = delegator_index_map(&ledger, producer_key);
        let own_candidates = own_candidate_table(own_raw)?;
        let stakes = stake_table(stakes_raw)?;
        let supercharged = supercharged_keys(&stakes);

        let witnesses = self.witnesses.read(producer_key, epoch, true)?;
        let lookups = SlotLookups::build(&canonical, &own_candidates, &witnesses);
        let slots = working_slots(&witnesses);
        debug!(
            epoch,
            canonical = canonical.len(),
            own = own_candidates.len(),
            delegators = delegators.len(),
            slots = slots.len(),
            "tables loaded"
        );

        let epoch_start = u64::from(epoch) * SLOTS_PER_EPOCH;
        let mut rows = Vec::with_capacity(slots.len());
        for global_slot in slots {
            let slot = global_slot.checked_sub(epoch_start).ok_or_else(|| {
                AuditError::MalformedRecord(format!(
                    "witness global slot {} precedes epoch {}",
                    global_slot, epoch
                ))
            })?;

            let index = lookups.delegator_index.get(&global_slot).copied().ok_or_else(|| {
                AuditError::MalformedRecord(format!("no delegator index for slot {}", global_slot))
            })?;
            let winner_pk = delegators.get(&index).cloned().ok_or_else(|| {
                AuditError::UnresolvedDelegator {
                    index,
                    global_slot,
                    ledger_hash: epoch_data.ledger_hash.clone(),
                }
            })?;

            rows.push(SlotRow {
                epoch,
                slot,
                global_slot,
                block: lookups.winner_height.get(&global_slot).copied(),
                winner_exists: lookups.winner_height.contains_key(&global_slot),
                saw_my_producer: lookups.own_height.contains_key(&global_slot),
                bp_won: lookups.winner_creator.get(&global_slot).map(String::as_str)
                    == Some(producer_key),
                block_time: lookups
                    .own_latencies
                    .get(&global_slot)
                    .cloned()
                    .unwrap_or_default(),
                received_time: lookups.winner_received.get(&global_slot).copied(),
                super_charged: supercharged.contains(&winner_pk),
                winner_pk,
            });
        }

        let ctx = ClassifierContext {
            lookups: &lookups,
            max_global_slot: canonical.iter().map(|b| b.global_slot).max().unwrap_or(0),
            last_slot: epoch_data.last_slot,
            late_threshold: self.late_threshold,
            slot_duration: self.slot_duration,
        };
        let rows = rows
            .into_iter()
            .map(|row| classify(row, &ctx))
            .collect::<Result<Vec<_>>>()?;

        let elapsed = start.elapsed();
        info!(
            epoch,
            producer = producer_key,
            rows = rows.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "epoch assembled"
        );

        Ok(EpochResult {
            epoch,
            producer_key: producer_key.to_string(),
            rows,
            canonical,
            own_candidates,
            stakes,
            epoch_data,
            elapsed,
        })
    }
}
