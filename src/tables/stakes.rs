//! Delegator stake table

use super::coerce_f64;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStake {
    pub public_key: String,
    #[serde(default)]
    pub balance: Option<Value>,
    #[serde(default)]
    pub delegate: Option<String>,
    #[serde(default)]
    pub timing: Option<RawTiming>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTiming {
    #[serde(default)]
    pub timed_weighting: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeRecord {
    pub public_key: String,
    pub balance: Option<f64>,
    pub delegate: Option<String>,
    /// Weight of time-locked stake; 1.0 when the account is untimed
    pub timed_weighting: f64,
}

impl StakeRecord {
    /// Untimed (fully unlocked) stake earns supercharged rewards
    pub fn is_supercharged(&self) -> bool {
        self.timed_weighting == 1.0
    }
}

pub fn stake_table(raw: Vec<RawStake>) -> Result<Vec<StakeRecord>> {
    raw.into_iter()
        .map(|stake| {
            let timed_weighting = match stake.timing.and_then(|t| t.timed_weighting) {
                Some(Value::Null) | None => 1.0,
                Some(w) => coerce_f64(&w, "timed_weighting")?,
            };
            let balance = match stake.balance {
                Some(Value::Null) | None => None,
                Some(b) => Some(coerce_f64(&b, "balance")?),
            };
            Ok(StakeRecord {
                public_key: stake.public_key,
                balance,
                delegate: stake.delegate,
                timed_weighting,
            })
        })
        .collect()
}

/// Public keys whose stake is supercharged
pub fn supercharged_keys(stakes: &[StakeRecord]) -> HashSet<String> {
    stakes
        .iter()
        .filter(|s| s.is_supercharged())
        .map(|s| s.public_key.clone())
        .collect()
}
