//! GraphQL query text for the indexer

use crate::config::SLOTS_PER_EPOCH;

const BLOCK_FIELDS: &str = "blockHeight
    canonical
    creator
    dateTime
    receivedTime
    protocolState {
      consensusState {
        epoch
        slot
        slotSinceGenesis
        lastVrfOutput
        stakingEpochData {
          ledger {
            hash
            totalCurrency
          }
        }
      }
    }";

/// Upper bound on stakers returned for one delegate
const STAKERS_LIMIT: u64 = 100_000;

/// Quote a value as a GraphQL string literal (JSON escaping is compatible)
fn literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Blocks of one epoch, ascending by height.
///
/// Without `creator` the query is restricted to canonical blocks. With a
/// creator it returns every block that key produced, including orphans.
pub fn epoch_blocks_query(epoch: u32, creator: Option<&str>) -> String {
    let filter = match creator {
        Some(pk) => format!(
            "{{creator: {}, protocolState: {{consensusState: {{epoch: {}}}}}}}",
            literal(pk),
            epoch
        ),
        None => format!(
            "{{canonical: true, protocolState: {{consensusState: {{epoch: {}}}}}}}",
            epoch
        ),
    };

    format!(
        "query EpochBlocks {{\n  blocks(query: {}, sortBy: BLOCKHEIGHT_ASC, limit: {}) {{\n    {}\n  }}\n}}",
        filter, SLOTS_PER_EPOCH, BLOCK_FIELDS
    )
}

/// Stakers delegating to `delegate` in ledger `ledger_hash`
pub fn stakers_query(delegate: &str, ledger_hash: &str) -> String {
    format!(
        "query Stakers {{\n  stakes(query: {{delegate: {}, ledgerHash: {}}}, limit: {}) {{\n    public_key\n    balance\n    delegate\n    timing {{\n      timed_weighting\n    }}\n  }}\n}}",
        literal(delegate),
        literal(ledger_hash),
        STAKERS_LIMIT
    )
}
