//! VRF digest and classification benchmarks
//!
//! Classification runs over a synthetic epoch where every slot is eligible.

use chrono::TimeDelta;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minavrf::digest::{compare, decode};
use minavrf::{classify, ClassifierContext, SlotLookups, SlotRow, SLOTS_PER_EPOCH};
use std::time::Duration;

const EPOCH: u32 = 40;

fn encode_vrf(seed: u8) -> String {
    let mut payload = vec![0x15, 0x20, 0x00];
    payload.extend_from_slice(&[seed; 32]);
    bs58::encode(payload).with_check().into_string()
}

fn bench_decode_compare(c: &mut Criterion) {
    let ours = encode_vrf(1);
    let theirs = encode_vrf(2);

    c.bench_function("vrf_decode", |b| b.iter(|| decode(black_box(&ours))));

    c.bench_function("vrf_decode_compare", |b| {
        b.iter(|| {
            let a = decode(black_box(&ours)).unwrap();
            let w = decode(black_box(&theirs)).unwrap();
            compare(&a, &w)
        })
    });
}

/// Every slot has a canonical block and an own candidate at the same height
fn epoch_fixture() -> (SlotLookups, Vec<SlotRow>) {
    let start = u64::from(EPOCH) * SLOTS_PER_EPOCH;
    let mut lookups = SlotLookups::default();
    let mut rows = Vec::with_capacity(SLOTS_PER_EPOCH as usize);

    for slot in 0..SLOTS_PER_EPOCH {
        let global_slot = start + slot;
        let vrf = encode_vrf((slot % 251) as u8);
        lookups.winner_vrf.insert(global_slot, vrf.clone());
        lookups.witness_vrf.insert(global_slot, encode_vrf((slot % 241) as u8));
        lookups.winner_height.insert(global_slot, slot);
        lookups.own_height.insert(global_slot, slot);

        rows.push(SlotRow {
            epoch: EPOCH,
            slot,
            global_slot,
            block: Some(slot),
            winner_exists: true,
            saw_my_producer: true,
            bp_won: false,
            block_time: vec![TimeDelta::seconds((slot % 400) as i64)],
            received_time: None,
            winner_pk: "B62qdelegator".to_string(),
            super_charged: slot % 2 == 0,
        });
    }

    (lookups, rows)
}

fn bench_classify_epoch(c: &mut Criterion) {
    let (lookups, rows) = epoch_fixture();
    let ctx = ClassifierContext {
        lookups: &lookups,
        max_global_slot: u64::from(EPOCH) * SLOTS_PER_EPOCH + SLOTS_PER_EPOCH - 1,
        last_slot: SLOTS_PER_EPOCH - 1,
        late_threshold: Duration::from_secs(180),
        slot_duration: Duration::from_secs(180),
    };

    c.bench_function("classify_full_epoch", |b| {
        b.iter(|| {
            rows.iter()
                .cloned()
                .map(|row| classify(row, &ctx))
                .filter(|r| r.is_ok())
                .count()
        })
    });
}

criterion_group!(benches, bench_decode_compare, bench_classify_epoch);
criterion_main!(benches);
