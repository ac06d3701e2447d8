//! VRF output digests and the slot tie-break comparison
//!
//! A VRF output travels as a base58check string. Its comparison form is the
//! blake2b-256 hash of the 32 bytes that follow the 3-byte version/type tag.

use crate::error::{AuditError, Result};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Serialize, Serializer};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// Leading bytes of the decoded payload that carry the version/type tag
const VRF_TAG_LEN: usize = 3;
/// Length of the raw VRF output following the tag
const VRF_OUTPUT_LEN: usize = 32;

/// 32-byte comparison form of a VRF output
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VrfDigest([u8; 32]);

impl VrfDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for VrfDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VrfDigest({})", self.to_hex())
    }
}

impl Serialize for VrfDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Decode a base58check VRF output into its digest
pub fn decode(vrf_output: &str) -> Result<VrfDigest> {
    let payload = bs58::decode(vrf_output)
        .with_check(None)
        .into_vec()
        .map_err(|e| AuditError::Decode {
            output: vrf_output.to_string(),
            reason: e.to_string(),
        })?;

    let end = VRF_TAG_LEN + VRF_OUTPUT_LEN;
    if payload.len() < end {
        return Err(AuditError::Decode {
            output: vrf_output.to_string(),
            reason: format!("payload is {} bytes, need at least {}", payload.len(), end),
        });
    }

    let mut hasher = Blake2b256::new();
    hasher.update(&payload[VRF_TAG_LEN..end]);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(VrfDigest(digest))
}

/// Returns true when `ours` would have beaten `winner` in the slot tie-break.
///
/// Only the most significant byte is consulted: a strictly greater first byte
/// wins, anything else (including an equal first byte) loses. This mirrors the
/// rule the producer tooling has always applied, not a full lexicographic
/// comparison of the digests.
pub fn compare(ours: &VrfDigest, winner: &VrfDigest) -> bool {
    match ours.0.iter().zip(winner.0.iter()).next() {
        Some((x, y)) => x > y,
        None => false,
    }
}
