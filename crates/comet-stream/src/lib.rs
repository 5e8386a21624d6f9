#![deny(missing_docs)]

//! # comet-stream
//!
//! Persistent WebSocket connection to a CometBFT node with multiplexed
//! event subscriptions.
//!
//! - [`probe`] checks reachability within a timeout.
//! - [`connect`] performs the handshake plus a `status` liveness check.
//! - [`Connection::subscribe`] opens a live [`Subscription`] on a
//!   [`Channel`]; any number of subscriptions may share a channel and each
//!   sees the identical ordered sequence of [`ChainEvent`]s.
//! - A transport error on a channel tears down every subscription on that
//!   channel and is logged; it is never raised into caller code.
//!
//! # Example
//!
//! ```no_run
//! use comet_stream::{connect, Channel, ChainEvent};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = connect("https://rpc.example.com").await?;
//! let mut blocks = conn.subscribe(Channel::NewBlock).await?;
//!
//! while let Some(ChainEvent::NewBlock(block)) = blocks.next().await {
//!     println!("block {} with {} txs", block.height, block.tx_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod event;
pub mod multiplexer;
pub mod types;


pub use connection::{connect, probe, Connection, ConnectionManager};
pub use error::{ConnectStage, ConnectionError, EventDecodeError, SubscribeError, TransportError};
pub use event::{decode_event, ChainEvent};
pub use multiplexer::{Subscription, SubscriptionHandle};
pub use types::{
    websocket_url, Channel, ConnectionState, NodeStatus, StreamConfig, SubscriptionStatus,
    DEFAULT_PROBE_TIMEOUT,
};
