#![deny(missing_docs)]

//! Live chain explorer core for CometBFT networks.
//!
//! Re-exports the component crates and adds [`Explorer`], a context object
//! that owns one gateway client and one node connection for a consumer.

pub use comet_gateway as gateway;
pub use comet_primitives as primitives;
pub use comet_stream as stream;
pub use comet_validators as validators;
pub use comet_window as window;

pub mod config;
pub mod explorer;

#[cfg(test)]
mod tests;

pub use config::ExplorerConfig;
pub use explorer::Explorer;
