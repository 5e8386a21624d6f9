//! Gateway data types: configuration and the raw shapes returned by the
//! indexer API and the RPC node.

use comet_primitives::serde_util::{opt_u64_lenient, u64_lenient};
use comet_primitives::{normalize_hash, BlockSummary};
use serde::{Deserialize, Serialize};

/// Configuration for a [`GatewayClient`](crate::GatewayClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the CometBFT RPC node (serves `/validators`).
    pub rpc_url: String,
    /// Base URL of the indexer API (serves blocks, transactions and
    /// validator metrics).
    pub api_url: String,
    /// Optional token sent via the `token` header on indexer requests.
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:26657".to_string(),
            api_url: "http://localhost:3000".to_string(),
            token: None,
        }
    }
}

/// Envelope used by the indexer's list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    /// The page of items.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Block header fields returned by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeaderRaw {
    /// Chain identifier.
    #[serde(default)]
    pub chain_id: Option<String>,
    /// Block height.
    #[serde(deserialize_with = "u64_lenient")]
    pub height: u64,
    /// Block time (RFC 3339).
    #[serde(default)]
    pub time: String,
    /// Proposer address (hex).
    #[serde(default)]
    pub proposer_address: Option<String>,
    /// Application hash after the block.
    #[serde(default)]
    pub app_hash: Option<String>,
}

/// A transaction reference inside a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxHashRaw {
    /// Transaction hash.
    #[serde(default)]
    pub hash_id: String,
    /// Execution result code.
    #[serde(default)]
    pub return_code: Option<u32>,
}

/// A block returned by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRaw {
    /// Block identifier (hash).
    #[serde(default)]
    pub block_id: String,
    /// Block header.
    pub header: BlockHeaderRaw,
    /// Transactions included in the block.
    #[serde(default)]
    pub tx_hashes: Vec<TxHashRaw>,
}

impl BlockRaw {
    /// Convert into the summary row used by live views.
    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            height: self.header.height,
            block_id: normalize_hash(&self.block_id),
            tx_count: self.tx_hashes.len(),
            time: self.header.time.clone(),
            proposer: self
                .header
                .proposer_address
                .as_deref()
                .map(normalize_hash),
        }
    }
}

/// A transaction returned by the indexer.
///
/// Fee and gas values are passed through as the indexer reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRaw {
    /// Transaction hash.
    #[serde(default)]
    pub hash: String,
    /// Identifier of the containing block.
    #[serde(default)]
    pub block_id: String,
    /// Transaction kind as labelled by the indexer.
    #[serde(default)]
    pub tx_type: Option<String>,
    /// Execution result code, when the indexer reports one.
    #[serde(default)]
    pub return_code: Option<u32>,
    /// Fee per gas unit.
    #[serde(default)]
    pub fee_amount_per_gas_unit: Option<String>,
    /// Gas requested by the transaction.
    #[serde(default, deserialize_with = "opt_u64_lenient")]
    pub gas_wanted: Option<u64>,
    /// Gas consumed by the transaction.
    #[serde(default, deserialize_with = "opt_u64_lenient")]
    pub gas_used: Option<u64>,
    /// Decoded transaction payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl TxRaw {
    /// Fee per gas unit, `"0"` when the indexer leaves it out.
    pub fn fee_or_zero(&self) -> &str {
        self.fee_amount_per_gas_unit.as_deref().unwrap_or("0")
    }

    /// Gas wanted, zero when absent.
    pub fn gas_wanted_or_zero(&self) -> u64 {
        self.gas_wanted.unwrap_or_default()
    }

    /// Gas used, zero when absent.
    pub fn gas_used_or_zero(&self) -> u64 {
        self.gas_used.unwrap_or_default()
    }
}

/// A validator entry from the RPC node's `/validators` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorRaw {
    /// Validator address (hex).
    pub address: String,
    /// Voting power.
    #[serde(deserialize_with = "u64_lenient")]
    pub voting_power: u64,
    /// Commission rate, when the node reports one.
    #[serde(default)]
    pub commission: Option<String>,
}

/// One page of the validator set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorPage {
    /// Validators on this page.
    #[serde(default)]
    pub validators: Vec<ValidatorRaw>,
    /// Total validators in the set.
    #[serde(default, deserialize_with = "opt_u64_lenient")]
    pub total: Option<u64>,
}

/// JSON-RPC envelope used by the RPC node.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcEnvelope<T> {
    pub result: T,
}

/// Response of the validator uptime endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UptimeRaw {
    pub uptime: f64,
}
