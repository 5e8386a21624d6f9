//! Immutable summary records for blocks and transactions.

use serde::{Deserialize, Serialize};

/// A block as shown in a live block view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    /// Block height.
    pub height: u64,
    /// Block identifier (lowercase hex).
    pub block_id: String,
    /// Number of transactions in the block.
    pub tx_count: usize,
    /// Block time as reported by the node (RFC 3339).
    pub time: String,
    /// Proposer address (lowercase hex), when known.
    pub proposer: Option<String>,
}

/// A transaction as shown in a live transaction view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSummary {
    /// Transaction hash (lowercase hex).
    pub hash: String,
    /// Height of the block containing the transaction.
    pub height: u64,
    /// Execution result code; zero means success.
    pub status_code: u32,
    /// Block time, or the receive time for streamed transactions (RFC 3339).
    pub time: String,
}

impl TxSummary {
    /// Whether the transaction executed successfully.
    pub fn is_success(&self) -> bool {
        self.status_code == 0
    }
}

/// Normalize a hex hash so values from the node's JSON-RPC (uppercase) and
/// the indexer API (lowercase, sometimes `0x`-prefixed) compare equal.
pub fn normalize_hash(hash: &str) -> String {
    let trimmed = hash
        .strip_prefix("0x")
        .or_else(|| hash.strip_prefix("0X"))
        .unwrap_or(hash);
    trimmed.to_ascii_lowercase()
}
