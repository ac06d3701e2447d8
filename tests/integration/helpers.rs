//! Fixtures for epoch assembly tests

use chrono::{DateTime, TimeDelta, Utc};
use minavrf::digest;
use minavrf::tables::{LedgerStore, RawBlock, RawStake, WitnessStore};
use minavrf::{AuditError, EpochAssembler, QuerySource, SLOTS_PER_EPOCH};
use serde_json::{json, Value};
use std::path::Path;

pub const EPOCH: u32 = 10;
pub const PRODUCER: &str = "B62qproducer";
pub const OTHER: &str = "B62qsomeoneelse";
pub const DELEGATOR_A: &str = "B62qdelegatorA";
pub const DELEGATOR_B: &str = "B62qdelegatorB";
pub const LEDGER_HASH: &str = "jxTestLedger";

pub fn global(slot: u64) -> u64 {
    u64::from(EPOCH) * SLOTS_PER_EPOCH + slot
}

/// Base58check VRF output with the given 32-byte body
pub fn encode_vrf(body: [u8; 32]) -> String {
    let mut payload = vec![0x15, 0x20, 0x00];
    payload.extend_from_slice(&body);
    bs58::encode(payload).with_check().into_string()
}

/// (winning, losing) VRF outputs under the first-byte tie-break
pub fn vrf_pair() -> (String, String) {
    let candidates: Vec<(String, u8)> = (0u8..=255)
        .map(|i| {
            let encoded = encode_vrf([i; 32]);
            let first = digest::decode(&encoded).unwrap().as_bytes()[0];
            (encoded, first)
        })
        .collect();
    let high = candidates.iter().max_by_key(|(_, b)| *b).unwrap();
    let low = candidates.iter().min_by_key(|(_, b)| *b).unwrap();
    assert!(high.1 > low.1);
    (high.0.clone(), low.0.clone())
}

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2023-06-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Raw indexer block at an epoch-relative slot
pub fn block(slot: u64, height: u64, creator: &str, vrf: &str, latency: TimeDelta) -> RawBlock {
    let produced = base_time() + TimeDelta::minutes(3 * slot as i64);
    let received = produced + latency;
    serde_json::from_value(json!({
        "blockHeight": height,
        "canonical": true,
        "creator": creator,
        "dateTime": produced.to_rfc3339(),
        "receivedTime": received.to_rfc3339(),
        "protocolState": {
            "consensusState": {
                "epoch": EPOCH,
                "slot": slot,
                "slotSinceGenesis": global(slot).to_string(),
                "lastVrfOutput": vrf,
                "stakingEpochData": {
                    "ledger": { "hash": LEDGER_HASH, "totalCurrency": "900000000000000000" }
                }
            }
        }
    }))
    .unwrap()
}

pub fn stakes() -> Vec<RawStake> {
    serde_json::from_value(json!([
        { "public_key": DELEGATOR_A, "balance": 1000.0, "delegate": PRODUCER, "timing": null },
        { "public_key": DELEGATOR_B, "balance": 500.0, "delegate": PRODUCER,
          "timing": { "timed_weighting": 0.5 } }
    ]))
    .unwrap()
}

pub fn witness_line(slot: u64, delegator_index: u64, vrf: &str, threshold_met: bool) -> String {
    json!({
        "publicKey": PRODUCER,
        "message": {
            "globalSlot": global(slot).to_string(),
            "epochSeed": "2vaRh7FQ5wSzmpFReF9gcRKjv48CcJvHs25aqb3SSZiPgHQBy5Dt",
            "delegatorIndex": delegator_index
        },
        "vrfOutput": vrf,
        "thresholdMet": threshold_met
    })
    .to_string()
}

/// Writes the ledger snapshot and witness stream into `root`
pub fn write_fixture_files(root: &Path, witness_lines: &[String]) {
    let ledger: Value = json!([
        { "pk": OTHER, "delegate": OTHER, "balance": "1" },
        { "pk": DELEGATOR_A, "delegate": PRODUCER, "balance": "1000" },
        { "pk": DELEGATOR_B, "delegate": PRODUCER, "balance": "500" }
    ]);
    let ledger_dir = root.join("ledgers");
    std::fs::create_dir_all(&ledger_dir).unwrap();
    std::fs::write(
        ledger_dir.join(format!("{}.json", LEDGER_HASH)),
        ledger.to_string(),
    )
    .unwrap();

    let witness_dir = root.join("witnesses").join(PRODUCER);
    std::fs::create_dir_all(&witness_dir).unwrap();
    // Concatenated objects, no separators between some of them
    std::fs::write(
        witness_dir.join(format!("check-epoch-{}", EPOCH)),
        witness_lines.join(""),
    )
    .unwrap();
}

/// In-memory query source
#[derive(Default)]
pub struct MockSource {
    pub canonical: Vec<RawBlock>,
    pub own: Vec<RawBlock>,
    pub stakes: Vec<RawStake>,
    pub fail: bool,
}

impl QuerySource for MockSource {
    async fn epoch_blocks(
        &self,
        epoch: u32,
        creator: Option<&str>,
    ) -> minavrf::Result<Vec<RawBlock>> {
        if self.fail {
            return Err(AuditError::SourceUnavailable("indexer down".to_string()));
        }
        assert_eq!(epoch, EPOCH);
        Ok(match creator {
            Some(pk) => {
                assert_eq!(pk, PRODUCER);
                self.own.clone()
            }
            None => self.canonical.clone(),
        })
    }

    async fn stakes(&self, delegate: &str, ledger_hash: &str) -> minavrf::Result<Vec<RawStake>> {
        assert_eq!(delegate, PRODUCER);
        assert_eq!(ledger_hash, LEDGER_HASH);
        Ok(self.stakes.clone())
    }
}

pub fn assembler(source: MockSource, root: &Path) -> EpochAssembler<MockSource> {
    EpochAssembler::new(
        source,
        LedgerStore::new(root.join("ledgers"), None, reqwest::Client::new()),
        WitnessStore::new(root.join("witnesses")),
    )
}
