//! Decoding of pushed node events into domain events.
//!
//! The node wraps every event in `{"data": {"type": .., "value": ..}}`; the
//! `type` tag selects the variant and each variant has its own field set.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{SecondsFormat, Utc};
use comet_primitives::serde_util::u64_lenient;
use comet_primitives::{normalize_hash, BlockSummary, TxSummary};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::EventDecodeError;
use crate::types::Channel;

/// A decoded event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// A block was committed.
    NewBlock(BlockSummary),
    /// A transaction was executed.
    Tx(TxSummary),
}

impl ChainEvent {
    /// The channel this event is published on.
    pub fn channel(&self) -> Channel {
        match self {
            Self::NewBlock(_) => Channel::NewBlock,
            Self::Tx(_) => Channel::NewTx,
        }
    }
}

#[derive(Deserialize)]
struct EventResult {
    data: EventData,
    #[serde(default)]
    events: HashMap<String, Vec<String>>,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "value")]
enum EventData {
    #[serde(rename = "tendermint/event/NewBlock")]
    NewBlock(NewBlockValue),
    #[serde(rename = "tendermint/event/Tx")]
    Tx(TxValue),
}

#[derive(Deserialize)]
struct NewBlockValue {
    block: RawBlock,
    #[serde(default)]
    block_id: Option<RawBlockId>,
}

#[derive(Deserialize)]
struct RawBlock {
    header: RawHeader,
    #[serde(default)]
    data: RawBlockData,
    #[serde(default)]
    last_commit: Option<RawCommit>,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(deserialize_with = "u64_lenient")]
    height: u64,
    #[serde(default)]
    time: String,
    #[serde(default)]
    proposer_address: String,
    #[serde(default)]
    app_hash: String,
}

#[derive(Deserialize, Default)]
struct RawBlockData {
    #[serde(default)]
    txs: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawCommit {
    block_id: RawBlockId,
}

#[derive(Deserialize)]
struct RawBlockId {
    #[serde(default)]
    hash: String,
}

#[derive(Deserialize)]
struct TxValue {
    #[serde(rename = "TxResult")]
    tx_result: RawTxResult,
}

#[derive(Deserialize)]
struct RawTxResult {
    #[serde(deserialize_with = "u64_lenient")]
    height: u64,
    #[serde(default)]
    tx: String,
    #[serde(default)]
    result: RawExecResult,
}

#[derive(Deserialize, Default)]
struct RawExecResult {
    #[serde(default)]
    code: u32,
}

/// Decode the `result` of a subscription frame.
///
/// Returns `Ok(None)` for the empty acknowledgement the node sends in reply
/// to `subscribe`.
pub fn decode_event(result: &Value) -> Result<Option<ChainEvent>, EventDecodeError> {
    if result.get("data").is_none() {
        return Ok(None);
    }
    let raw = EventResult::deserialize(result)?;

    let event = match raw.data {
        EventData::NewBlock(value) => ChainEvent::NewBlock(block_summary(value)),
        EventData::Tx(value) => {
            let hash = tx_hash(&raw.events, &value.tx_result.tx)?;
            ChainEvent::Tx(TxSummary {
                hash,
                height: value.tx_result.height,
                status_code: value.tx_result.result.code,
                time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            })
        }
    };
    Ok(Some(event))
}

fn block_summary(value: NewBlockValue) -> BlockSummary {
    let NewBlockValue { block, block_id } = value;
    let id = block_id
        .map(|b| b.hash)
        .filter(|h| !h.is_empty())
        .or_else(|| {
            block
                .last_commit
                .map(|c| c.block_id.hash)
                .filter(|h| !h.is_empty())
        })
        .unwrap_or(block.header.app_hash);

    BlockSummary {
        height: block.header.height,
        block_id: normalize_hash(&id),
        tx_count: block.data.txs.map_or(0, |txs| txs.len()),
        time: block.header.time,
        proposer: Some(block.header.proposer_address)
            .filter(|p| !p.is_empty())
            .map(|p| normalize_hash(&p)),
    }
}

fn tx_hash(events: &HashMap<String, Vec<String>>, tx: &str) -> Result<String, EventDecodeError> {
    if let Some(hash) = events.get("tx.hash").and_then(|v| v.first()) {
        return Ok(normalize_hash(hash));
    }
    let bytes = BASE64
        .decode(tx)
        .map_err(|_| EventDecodeError::MissingTxHash)?;
    if bytes.is_empty() {
        return Err(EventDecodeError::MissingTxHash);
    }
    Ok(hex::encode(Sha256::digest(&bytes)))
}
