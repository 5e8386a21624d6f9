//! Error types for gateway requests.

use std::fmt;

/// Which upstream a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The indexer API (blocks, transactions, validator metrics).
    Indexer,
    /// The CometBFT RPC node (validator set).
    Rpc,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexer => f.write_str("indexer"),
            Self::Rpc => f.write_str("rpc node"),
        }
    }
}

/// A failed gateway request, tagged with the upstream that failed.
///
/// Never returned from the public query methods; those log the error and
/// resolve to `None`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request could not be sent or its body not read.
    #[error("{endpoint} unreachable: {source}")]
    Unreachable {
        /// Upstream that was queried.
        endpoint: Endpoint,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The upstream has no such resource.
    #[error("{endpoint} has no such resource")]
    NotFound {
        /// Upstream that was queried.
        endpoint: Endpoint,
    },

    /// The upstream answered with a non-success status.
    #[error("{endpoint} answered {status_code}: {body}")]
    Status {
        /// Upstream that was queried.
        endpoint: Endpoint,
        /// HTTP status code.
        status_code: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The body did not have the expected shape.
    #[error("{endpoint} sent an unexpected body: {source}")]
    Decode {
        /// Upstream that was queried.
        endpoint: Endpoint,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    /// Upstream the failed request went to.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Unreachable { endpoint, .. }
            | Self::NotFound { endpoint }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => *endpoint,
        }
    }
}
