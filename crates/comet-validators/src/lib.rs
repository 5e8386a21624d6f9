#![deny(missing_docs)]

//! # comet-validators
//!
//! Loads one page of the validator set and fills in per-validator metrics
//! (uptime and commit signatures) concurrently.
//!
//! A page load publishes a skeleton right away, then updates each record's
//! fields in place as their fetches settle. A failed fetch marks only that
//! field as [`Metric::Failed`]. Starting a new load supersedes the previous
//! one: its remaining results are discarded and it never reports loaded.
//!
//! # Example
//!
//! ```no_run
//! use comet_gateway::{GatewayClient, GatewayConfig};
//! use comet_validators::{LoadOutcome, ValidatorAggregator};
//!
//! # async fn example() {
//! let aggregator = ValidatorAggregator::new(GatewayClient::new(GatewayConfig::default()));
//! let view = aggregator.watch();
//!
//! if aggregator.load_page(1, 20).await == LoadOutcome::Loaded {
//!     for v in &view.borrow().records {
//!         println!("{} uptime {:?}", v.address, v.uptime_percent());
//!     }
//! }
//! # }
//! ```

pub mod aggregator;
pub mod source;
pub mod types;


pub use aggregator::ValidatorAggregator;
pub use source::ValidatorSource;
pub use types::{LoadOutcome, LoadStatus, Metric, PageView, ValidatorRecord};
