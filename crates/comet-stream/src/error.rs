//! Error types for streaming connections and subscriptions.

use std::fmt;

use tokio_tungstenite::tungstenite;

/// Failures of the underlying WebSocket / JSON-RPC transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// WebSocket protocol or I/O failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error ({code}): {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the node.
        message: String,
    },

    /// The connection was closed.
    #[error("connection closed")]
    Closed,

    /// A frame or result could not be encoded or decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Stage of [`connect`](crate::connect) that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// Opening the WebSocket.
    Handshake,
    /// The `status` liveness check after the handshake.
    Status,
}

impl fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake => f.write_str("handshake"),
            Self::Status => f.write_str("status check"),
        }
    }
}

/// Connecting to a node failed.
#[derive(Debug, thiserror::Error)]
#[error("connection to {address} failed during {stage}: {source}")]
pub struct ConnectionError {
    /// Address that was dialled.
    pub address: String,
    /// Stage that failed.
    pub stage: ConnectStage,
    /// Underlying cause.
    #[source]
    pub source: TransportError,
}

impl ConnectionError {
    pub(crate) fn new(address: &str, stage: ConnectStage, source: TransportError) -> Self {
        Self {
            address: address.to_string(),
            stage,
            source,
        }
    }
}

/// Opening a subscription failed.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// The connection is not in the `Connected` state.
    #[error("connection is not open")]
    NotConnected,
}

/// A pushed event could not be turned into a [`ChainEvent`](crate::ChainEvent).
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    /// The payload does not match any known event shape.
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A tx event carried neither a `tx.hash` attribute nor decodable bytes.
    #[error("tx event without hash")]
    MissingTxHash,
}
