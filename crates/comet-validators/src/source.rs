//! Where validator listings and metrics come from.

use std::future::Future;

use comet_gateway::{GatewayClient, ValidatorPage};

/// Queries the aggregator needs. Every method resolves `None` when the value
/// is unavailable; none of them fail.
pub trait ValidatorSource: Send + Sync {
    /// One page of the validator set.
    fn validators(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Option<ValidatorPage>> + Send;

    /// Latest committed height, the upper bound of the uptime range.
    fn latest_height(&self) -> impl Future<Output = Option<u64>> + Send;

    /// Fraction of blocks in `[start, end]` the validator signed.
    fn uptime(&self, address: &str, start: u64, end: u64)
        -> impl Future<Output = Option<f64>> + Send;

    /// Number of commit signatures recorded for the validator.
    fn commit_signatures(&self, address: &str) -> impl Future<Output = Option<u64>> + Send;
}

impl ValidatorSource for GatewayClient {
    fn validators(
        &self,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Option<ValidatorPage>> + Send {
        GatewayClient::validators(self, page, per_page)
    }

    fn latest_height(&self) -> impl Future<Output = Option<u64>> + Send {
        GatewayClient::latest_height(self)
    }

    fn uptime(
        &self,
        address: &str,
        start: u64,
        end: u64,
    ) -> impl Future<Output = Option<f64>> + Send {
        self.validator_uptime(address, start, end)
    }

    fn commit_signatures(&self, address: &str) -> impl Future<Output = Option<u64>> + Send {
        self.validator_commit_signatures(address)
    }
}
