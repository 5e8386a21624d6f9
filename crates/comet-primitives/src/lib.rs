//! Comet Explorer - Chain summary types and decoding helpers.
//!
//! This crate provides the value records shared by the gateway, stream and
//! window crates:
//! - [`BlockSummary`] and [`TxSummary`], the rows of a live view
//! - Lenient decoders for node JSON, where heights and counts arrive either
//!   as numbers or as decimal strings

pub mod serde_util;
pub mod summary;

pub use summary::{normalize_hash, BlockSummary, TxSummary};
