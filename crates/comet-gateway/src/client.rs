//! Gateway HTTP client for blocks, transactions and validator metrics.
//!
//! Every public query returns `Option`: transport, status and decode
//! failures are logged here and surface as `None`, so callers treat an
//! absent value as "not available yet" instead of handling errors.

use comet_primitives::serde_util::count_from_value;
use comet_primitives::{normalize_hash, BlockSummary, TxSummary};
use futures::future::join_all;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Endpoint, GatewayError};
use crate::types::{
    BlockRaw, GatewayConfig, Paged, RpcEnvelope, TxRaw, UptimeRaw, ValidatorPage,
};

/// Keys under which the commit-signature endpoint may report its count.
const SIGNATURE_COUNT_KEYS: &[&str] = &["count", "commit_signatures", "total", "signatures"];

/// HTTP client for the indexer API and the RPC node.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// Client configuration.
    config: GatewayConfig,
    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl GatewayClient {
    /// Create a new gateway client with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::new();
        Self { config, client }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// List blocks, most recent first.
    pub async fn blocks(&self, page: u32, page_size: u32) -> Option<Vec<BlockRaw>> {
        let path = format!("block?page={}&page_size={}", page, page_size);
        self.api::<Paged<BlockRaw>>(&path).await.map(|p| p.data)
    }

    /// Get a block by height.
    pub async fn block_by_height(&self, height: u64) -> Option<BlockRaw> {
        self.api(&format!("block/height/{}", height)).await
    }

    /// Get a block by hash.
    pub async fn block_by_hash(&self, hash: &str) -> Option<BlockRaw> {
        self.api(&format!("block/hash/{}", hash)).await
    }

    /// Get the latest block.
    pub async fn latest_block(&self) -> Option<BlockRaw> {
        self.api("block/last").await
    }

    /// Height of the latest block.
    pub async fn latest_height(&self) -> Option<u64> {
        self.latest_block().await.map(|b| b.header.height)
    }

    /// List transactions, most recent first.
    pub async fn transactions(&self, page: u32, page_size: u32) -> Option<Vec<TxRaw>> {
        let path = format!("tx?page={}&page_size={}", page, page_size);
        self.api::<Paged<TxRaw>>(&path).await.map(|p| p.data)
    }

    /// Get a transaction by hash.
    pub async fn transaction(&self, hash: &str) -> Option<TxRaw> {
        self.api(&format!("tx/{}", hash)).await
    }

    /// List one page of the validator set from the RPC node.
    pub async fn validators(&self, page: u32, per_page: u32) -> Option<ValidatorPage> {
        let url = format!(
            "{}/validators?page={}&per_page={}",
            self.config.rpc_url, page, per_page
        );
        self.fetch::<RpcEnvelope<ValidatorPage>>(Endpoint::Rpc, &url)
            .await
            .map(|e| e.result)
    }

    /// Fraction of blocks in `[start, end]` signed by the validator, in `0..=1`.
    pub async fn validator_uptime(&self, address: &str, start: u64, end: u64) -> Option<f64> {
        let path = format!("validator/{}/uptime?start={}&end={}", address, start, end);
        let raw: UptimeRaw = self.api(&path).await?;
        if !(0.0..=1.0).contains(&raw.uptime) {
            warn!(address, uptime = raw.uptime, "uptime outside 0..=1, ignoring");
            return None;
        }
        Some(raw.uptime)
    }

    /// Number of commit signatures recorded for the validator.
    pub async fn validator_commit_signatures(&self, address: &str) -> Option<u64> {
        let path = format!("validator/{}/commit_signatures", address);
        let value: serde_json::Value = self.api(&path).await?;
        let count = count_from_value(&value, SIGNATURE_COUNT_KEYS);
        if count.is_none() {
            warn!(address, body = %value, "unrecognised commit signature payload");
        }
        count
    }

    /// The most recent blocks as summary rows.
    pub async fn recent_blocks(&self, limit: u32) -> Option<Vec<BlockSummary>> {
        let blocks = self.blocks(1, limit).await?;
        Some(blocks.iter().map(BlockRaw::summary).collect())
    }

    /// The most recent transactions as summary rows.
    ///
    /// The indexer's transaction listing carries no height or time, so each
    /// transaction's block is looked up concurrently. Transactions whose
    /// block cannot be fetched are left out.
    pub async fn recent_transactions(&self, limit: u32) -> Option<Vec<TxSummary>> {
        let txs = self.transactions(1, limit).await?;
        let lookups = txs.iter().map(|tx| self.block_by_hash(&tx.block_id));
        let blocks = join_all(lookups).await;

        let rows = txs
            .iter()
            .zip(blocks)
            .filter_map(|(tx, block)| match block {
                Some(block) => Some(TxSummary {
                    hash: normalize_hash(&tx.hash),
                    height: block.header.height,
                    status_code: tx.return_code.unwrap_or_default(),
                    time: block.header.time,
                }),
                None => {
                    debug!(hash = %tx.hash, block_id = %tx.block_id, "dropping tx without block");
                    None
                }
            })
            .collect();
        Some(rows)
    }

    /// GET a path on the indexer API.
    async fn api<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = format!("{}/{}", self.config.api_url.trim_end_matches('/'), path);
        self.fetch(Endpoint::Indexer, &url).await
    }

    /// Perform a request, logging any failure and mapping it to `None`.
    async fn fetch<T: DeserializeOwned>(&self, endpoint: Endpoint, url: &str) -> Option<T> {
        match self.request(endpoint, url).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(url, %endpoint, error = %e, "gateway request failed");
                None
            }
        }
    }

    /// GET `url` and decode the body. The indexer token, if configured, is
    /// only ever sent to the indexer.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        url: &str,
    ) -> Result<T, GatewayError> {
        let transport = |source| GatewayError::Unreachable { endpoint, source };

        let mut req = self.client.get(url);
        if let (Endpoint::Indexer, Some(token)) = (endpoint, self.token_header()) {
            req = req.header("token", token);
        }

        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound { endpoint });
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint,
                status_code: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let body = resp.text().await.map_err(transport)?;
        serde_json::from_str(&body).map_err(|source| GatewayError::Decode { endpoint, source })
    }

    fn token_header(&self) -> Option<HeaderValue> {
        let token = self.config.token.as_deref()?;
        match HeaderValue::from_str(token) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("configured token is not a valid header value, not sending it");
                None
            }
        }
    }
}
