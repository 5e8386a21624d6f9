//! Explorer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use comet_gateway::GatewayConfig;
use comet_stream::StreamConfig;

/// Node RPC endpoint, used for both queries and the event stream.
pub const ENV_RPC_URL: &str = "COMET_RPC_URL";
/// Indexer API endpoint.
pub const ENV_API_URL: &str = "COMET_API_URL";
/// Indexer API token.
pub const ENV_API_TOKEN: &str = "COMET_API_TOKEN";
/// Probe timeout in milliseconds.
pub const ENV_PROBE_TIMEOUT_MS: &str = "COMET_PROBE_TIMEOUT_MS";

/// Configuration for an [`Explorer`](crate::Explorer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Query gateway endpoints.
    pub gateway: GatewayConfig,
    /// Streaming connection settings.
    pub stream: StreamConfig,
}

impl ExplorerConfig {
    /// Defaults overridden by the `COMET_*` environment variables.
    ///
    /// Only variables that are set and non-empty override; the RPC URL
    /// applies to both the gateway and the stream.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var(ENV_RPC_URL) {
            config.gateway.rpc_url = url.clone();
            config.stream.address = url;
        }
        if let Some(url) = var(ENV_API_URL) {
            config.gateway.api_url = url;
        }
        if let Some(token) = var(ENV_API_TOKEN) {
            config.gateway.token = Some(token);
        }
        if let Some(raw) = var(ENV_PROBE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.stream.probe_timeout = Duration::from_millis(ms),
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid {}", ENV_PROBE_TIMEOUT_MS),
            }
        }
        config
    }
}
