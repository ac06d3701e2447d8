//! Eligibility witness streams
//!
//! The producer's node appends one JSON object per evaluated slot to
//! `<root>/<producer_key>/check-epoch-<epoch>`. Objects are concatenated with
//! no enclosing array, so the file is read as a stream of JSON values.

use super::coerce_u64;
use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWitness {
    message: RawWitnessMessage,
    #[serde(default)]
    public_key: Option<String>,
    vrf_output: String,
    threshold_met: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWitnessMessage {
    global_slot: Value,
    delegator_index: Value,
}

/// Locally generated proof that the producer was eligible at a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityWitness {
    pub public_key: Option<String>,
    pub global_slot: u64,
    /// Position of the winning account in the staking ledger
    pub delegator_index: u64,
    pub vrf_output: String,
    pub threshold_met: bool,
}

impl EligibilityWitness {
    fn from_raw(raw: RawWitness) -> Result<Self> {
        Ok(Self {
            public_key: raw.public_key,
            global_slot: coerce_u64(&raw.message.global_slot, "message.globalSlot")?,
            delegator_index: coerce_u64(&raw.message.delegator_index, "message.delegatorIndex")?,
            vrf_output: raw.vrf_output,
            threshold_met: raw.threshold_met,
        })
    }
}

/// Parse a concatenated JSON witness stream
pub fn parse_witness_stream<R: Read>(
    reader: R,
    only_threshold_met: bool,
) -> Result<Vec<EligibilityWitness>> {
    let mut witnesses = Vec::new();
    let mut total = 0usize;

    for value in serde_json::Deserializer::from_reader(reader).into_iter::<RawWitness>() {
        let raw = value?;
        total += 1;
        if only_threshold_met && !raw.threshold_met {
            continue;
        }
        witnesses.push(EligibilityWitness::from_raw(raw)?);
    }

    debug!(total, kept = witnesses.len(), only_threshold_met, "parsed witness stream");
    Ok(witnesses)
}

/// Directory of per-producer witness streams
#[derive(Debug, Clone)]
pub struct WitnessStore {
    root: PathBuf,
}

impl WitnessStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream path for one (producer, epoch)
    pub fn path(&self, producer_key: &str, epoch: u32) -> PathBuf {
        self.root
            .join(producer_key)
            .join(format!("check-epoch-{}", epoch))
    }

    /// Read the witnesses for one (producer, epoch)
    pub fn read(
        &self,
        producer_key: &str,
        epoch: u32,
        only_threshold_met: bool,
    ) -> Result<Vec<EligibilityWitness>> {
        let path = self.path(producer_key, epoch);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuditError::WitnessFileMissing { epoch, path })
            }
            Err(e) => return Err(AuditError::io(path, e)),
        };
        parse_witness_stream(BufReader::new(file), only_threshold_met)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = r#"{"publicKey":"B62qa","message":{"globalSlot":"71400","epochSeed":"x","delegatorIndex":3},"vrfOutput":"48H9","thresholdMet":true}
{"publicKey":"B62qa","message":{"globalSlot":71401,"delegatorIndex":"4"},"vrfOutput":"48HA","thresholdMet":false}{"publicKey":"B62qa","message":{"globalSlot":71409,"delegatorIndex":5},"vrfOutput":"48HB","thresholdMet":true}"#;

    #[test]
    fn test_parse_filters_threshold_met() {
        let witnesses = parse_witness_stream(STREAM.as_bytes(), true).unwrap();
        let slots: Vec<u64> = witnesses.iter().map(|w| w.global_slot).collect();
        assert_eq!(slots, vec![71400, 71409]);
        assert_eq!(witnesses[0].delegator_index, 3);
        assert_eq!(witnesses[0].public_key.as_deref(), Some("B62qa"));
    }

    #[test]
    fn test_parse_all_witnesses() {
        let witnesses = parse_witness_stream(STREAM.as_bytes(), false).unwrap();
        assert_eq!(witnesses.len(), 3);
        assert_eq!(witnesses[1].delegator_index, 4);
        assert!(!witnesses[1].threshold_met);
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let truncated = &STREAM[..STREAM.len() - 10];
        assert!(matches!(
            parse_witness_stream(truncated.as_bytes(), true),
            Err(AuditError::Json(_))
        ));
    }

    #[test]
    fn test_record_without_threshold_flag_is_rejected() {
        let stream = r#"{"publicKey":"B62qa","message":{"globalSlot":71400,"delegatorIndex":3},"vrfOutput":"48H9"}"#;
        assert!(matches!(
            parse_witness_stream(stream.as_bytes(), true),
            Err(AuditError::Json(_))
        ));
    }

    #[test]
    fn test_record_without_vrf_output_is_rejected() {
        let stream = r#"{"publicKey":"B62qa","message":{"globalSlot":71400,"delegatorIndex":3},"thresholdMet":true}"#;
        assert!(matches!(
            parse_witness_stream(stream.as_bytes(), false),
            Err(AuditError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = WitnessStore::new(dir.path());
        match store.read("B62qa", 12, true) {
            Err(AuditError::WitnessFileMissing { epoch, path }) => {
                assert_eq!(epoch, 12);
                assert!(path.ends_with("B62qa/check-epoch-12"));
            }
            other => panic!("expected WitnessFileMissing, got {:?}", other),
        }
    }
}
