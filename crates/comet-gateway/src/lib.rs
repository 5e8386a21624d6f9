#![deny(missing_docs)]

//! # comet-gateway
//!
//! Stateless query gateway for a CometBFT chain: blocks and transactions
//! from the indexer API, the validator set from the RPC node, and
//! per-validator uptime and commit-signature metrics.
//!
//! Failures never propagate. Each query logs what went wrong and returns
//! `None`, which callers treat as a first-class "absent" value.
//!
//! # Example
//!
//! ```no_run
//! use comet_gateway::{GatewayClient, GatewayConfig};
//!
//! # async fn example() {
//! let client = GatewayClient::new(GatewayConfig {
//!     api_url: "https://indexer.example.com".to_string(),
//!     ..Default::default()
//! });
//!
//! if let Some(blocks) = client.recent_blocks(20).await {
//!     println!("newest height: {:?}", blocks.first().map(|b| b.height));
//! }
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::GatewayClient;
pub use error::{Endpoint, GatewayError};
pub use types::{BlockHeaderRaw, BlockRaw, GatewayConfig, TxHashRaw, TxRaw, ValidatorPage, ValidatorRaw};
