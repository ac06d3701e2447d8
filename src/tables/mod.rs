//! Data joiners
//!
//! Normalize raw indexer responses and local files into typed records keyed
//! by slot. Numeric fields arrive as JSON numbers or as strings depending on
//! the source, so every slot/height/index column goes through [`coerce_u64`].

pub mod blocks;
pub mod ledger;
pub mod stakes;
pub mod witness;

pub use blocks::{canonical_table, own_candidate_table, BlockRecord, EpochData, RawBlock};
pub use ledger::{delegator_index_map, LedgerEntry, LedgerStore};
pub use stakes::{stake_table, supercharged_keys, RawStake, StakeRecord};
pub use witness::{parse_witness_stream, EligibilityWitness, WitnessStore};

use crate::error::{AuditError, Result};
use serde_json::Value;

/// Integer column that may be sent as a number or a numeric string
pub(crate) fn coerce_u64(value: &Value, field: &str) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AuditError::MalformedRecord(format!("{} is not an integer: {}", field, value)))
}

/// Float column that may be sent as a number or a numeric string
pub(crate) fn coerce_f64(value: &Value, field: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AuditError::MalformedRecord(format!("{} is not a number: {}", field, value)))
}

/// Serialize `chrono::TimeDelta` values as fractional seconds
pub(crate) mod delta_secs {
    use chrono::TimeDelta;
    use serde::ser::SerializeSeq;
    use serde::Serializer;

    fn secs(delta: &TimeDelta) -> f64 {
        delta.num_milliseconds() as f64 / 1000.0
    }

    pub fn serialize<S: Serializer>(delta: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(secs(delta))
    }

    pub fn list<S: Serializer>(deltas: &[TimeDelta], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(deltas.len()))?;
        for d in deltas {
            seq.serialize_element(&secs(d))?;
        }
        seq.end()
    }
}
