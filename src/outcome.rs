//! Slot outcome classification
//!
//! [`classify`] is a pure function of one assembled [`SlotRow`] and an
//! explicit [`ClassifierContext`]. Branches are evaluated in a fixed order and
//! the first match wins:
//!
//! 1. the canonical winner is the producer → `WON`
//! 2. no canonical winner:
//!    - nothing produced → `FUTURE` past the last observed slot, else `MISSED_NOT_PRODUCED`
//!    - something produced → `MISSED_TOO_LATE` if late, else `LOST UNEXPLAINED`
//! 3. someone else won; compare VRF digests:
//!    - produced at the winner's height → `MISSED_TOO_LATE` / `LOST BUT WON VRF` when
//!      our VRF wins (late / on time), `LOST` otherwise
//!    - produced at another height → `MISSED_HEIGHT_DIFF`
//!    - nothing produced → `MISSED_NOT_PRODUCED` whichever VRF wins

use crate::assembler::{SlotLookups, SlotRow};
use crate::digest;
use crate::error::{AuditError, Result};
use crate::tables::delta_secs;
use chrono::TimeDelta;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Outcome {
    #[serde(rename = "WON")]
    Won,
    #[serde(rename = "LOST")]
    Lost,
    #[serde(rename = "LOST UNEXPLAINED")]
    LostUnexplained,
    #[serde(rename = "LOST BUT WON VRF")]
    LostButWonVrf,
    #[serde(rename = "MISSED_TOO_LATE")]
    MissedTooLate,
    #[serde(rename = "MISSED_HEIGHT_DIFF")]
    MissedHeightDiff,
    #[serde(rename = "MISSED_NOT_PRODUCED")]
    MissedNotProduced,
    #[serde(rename = "FUTURE")]
    Future,
    /// Nobody won the slot. Defined for reports; the classifier never assigns it.
    #[serde(rename = "LOST_NOT_PRODUCED")]
    LostNotProduced,
}

impl Outcome {
    pub const ALL: [Outcome; 9] = [
        Outcome::Won,
        Outcome::Lost,
        Outcome::LostUnexplained,
        Outcome::LostButWonVrf,
        Outcome::MissedTooLate,
        Outcome::MissedHeightDiff,
        Outcome::MissedNotProduced,
        Outcome::Future,
        Outcome::LostNotProduced,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Won => "WON",
            Outcome::Lost => "LOST",
            Outcome::LostUnexplained => "LOST UNEXPLAINED",
            Outcome::LostButWonVrf => "LOST BUT WON VRF",
            Outcome::MissedTooLate => "MISSED_TOO_LATE",
            Outcome::MissedHeightDiff => "MISSED_HEIGHT_DIFF",
            Outcome::MissedNotProduced => "MISSED_NOT_PRODUCED",
            Outcome::Future => "FUTURE",
            Outcome::LostNotProduced => "LOST_NOT_PRODUCED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Epoch-wide inputs to classification
#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext<'a> {
    pub lookups: &'a SlotLookups,
    /// Highest global slot with a canonical block
    pub max_global_slot: u64,
    /// Epoch-relative slot of the last canonical block
    pub last_slot: u64,
    pub late_threshold: Duration,
    pub slot_duration: Duration,
}

/// Assembled row plus its classification
#[derive(Debug, Clone, Serialize)]
pub struct SlotOutcomeRow {
    #[serde(flatten)]
    pub row: SlotRow,
    pub outcome: Outcome,
    pub block_height_equal: bool,
    pub too_late: bool,
    /// Smallest production-to-receipt latency; zero with no observations
    #[serde(serialize_with = "delta_secs::serialize")]
    pub min_block_time: TimeDelta,
    /// Time until a `FUTURE` slot arrives
    #[serde(serialize_with = "duration_secs")]
    pub next_block_in: Option<Duration>,
}

impl SlotOutcomeRow {
    pub fn min_block_time_minutes(&self) -> f64 {
        self.min_block_time.num_milliseconds() as f64 / 60_000.0
    }
}

fn duration_secs<S: Serializer>(d: &Option<Duration>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&d.as_secs_f64()),
        None => s.serialize_none(),
    }
}

/// Both the canonical winner and an own candidate exist and share a height
pub fn block_height_equal(global_slot: u64, lookups: &SlotLookups) -> bool {
    match (
        lookups.winner_height.get(&global_slot),
        lookups.own_height.get(&global_slot),
    ) {
        (Some(winner), Some(own)) => winner == own,
        _ => false,
    }
}

/// A past slot where no observed latency came in under the threshold
/// (including the case of no observations at all)
pub fn is_too_late(
    global_slot: u64,
    max_global_slot: u64,
    latencies: &[TimeDelta],
    threshold: Duration,
) -> bool {
    if global_slot > max_global_slot {
        return false;
    }
    !latencies.iter().any(|latency| match latency.to_std() {
        Ok(latency) => latency < threshold,
        // Received before it was produced: clock skew, but certainly on time.
        Err(_) => true,
    })
}

/// Classify one assembled row
pub fn classify(row: SlotRow, ctx: &ClassifierContext<'_>) -> Result<SlotOutcomeRow> {
    let height_equal = block_height_equal(row.global_slot, ctx.lookups);
    let too_late = is_too_late(
        row.global_slot,
        ctx.max_global_slot,
        &row.block_time,
        ctx.late_threshold,
    );
    let outcome = decide(&row, height_equal, too_late, ctx)?;

    let next_block_in = match outcome {
        Outcome::Future => {
            let slots = row.slot.saturating_sub(ctx.last_slot);
            Some(ctx.slot_duration.saturating_mul(u32::try_from(slots).unwrap_or(u32::MAX)))
        }
        _ => None,
    };
    let min_block_time = row.block_time.iter().min().copied().unwrap_or_else(TimeDelta::zero);

    Ok(SlotOutcomeRow {
        row,
        outcome,
        block_height_equal: height_equal,
        too_late,
        min_block_time,
        next_block_in,
    })
}

fn decide(
    row: &SlotRow,
    height_equal: bool,
    too_late: bool,
    ctx: &ClassifierContext<'_>,
) -> Result<Outcome> {
    if row.bp_won {
        return Ok(Outcome::Won);
    }

    if !row.winner_exists {
        return Ok(match (row.saw_my_producer, too_late) {
            (false, _) if row.global_slot > ctx.max_global_slot => Outcome::Future,
            (false, _) => Outcome::MissedNotProduced,
            (true, true) => Outcome::MissedTooLate,
            (true, false) => Outcome::LostUnexplained,
        });
    }

    let winner_vrf = ctx.lookups.winner_vrf.get(&row.global_slot).ok_or_else(|| {
        AuditError::MalformedRecord(format!("no winner VRF output for slot {}", row.global_slot))
    })?;
    let our_vrf = ctx.lookups.witness_vrf.get(&row.global_slot).ok_or_else(|| {
        AuditError::MalformedRecord(format!("no witness VRF output for slot {}", row.global_slot))
    })?;
    let won_vrf = digest::compare(&digest::decode(our_vrf)?, &digest::decode(winner_vrf)?);

    if !row.saw_my_producer {
        return Ok(Outcome::MissedNotProduced);
    }

    Ok(match (height_equal, won_vrf, too_late) {
        (false, _, _) => Outcome::MissedHeightDiff,
        (true, true, true) => Outcome::MissedTooLate,
        (true, true, false) => Outcome::LostButWonVrf,
        (true, false, _) => Outcome::Lost,
    })
}

/// Row counts per outcome, in label declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub counts: BTreeMap<Outcome, usize>,
    pub total: usize,
}

impl OutcomeSummary {
    pub fn from_rows(rows: &[SlotOutcomeRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            *summary.counts.entry(row.outcome).or_insert(0) += 1;
            summary.total += 1;
        }
        summary
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }
}
