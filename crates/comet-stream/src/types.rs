//! Stream configuration, channel and state types.

use std::fmt;
use std::time::Duration;

use comet_primitives::serde_util::u64_lenient;
use serde::{Deserialize, Serialize};

/// Default bound on [`probe`](crate::probe).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Node RPC address; `http(s)://` is rewritten to `ws(s)://`.
    pub address: String,
    /// Upper bound for a connection probe.
    #[serde(with = "millis")]
    pub probe_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:26657".to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// A live event channel on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Newly committed blocks.
    NewBlock,
    /// Newly executed transactions.
    NewTx,
}

impl Channel {
    /// Event query used for the node's `subscribe` method.
    pub fn query(&self) -> &'static str {
        match self {
            Self::NewBlock => "tm.event='NewBlock'",
            Self::NewTx => "tm.event='Tx'",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewBlock => f.write_str("new-block"),
            Self::NewTx => f.write_str("new-tx"),
        }
    }
}

/// Lifecycle of a node connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection is open.
    #[default]
    Disconnected,
    /// Handshake or status check in progress.
    Connecting,
    /// Open and healthy.
    Connected,
    /// The last connection attempt failed.
    Failed,
}

/// Whether a subscription still delivers events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Events are being delivered.
    Active,
    /// Unsubscribed or torn down after a transport error.
    TornDown,
}

/// Result of the liveness check performed by `connect`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatus {
    /// Network (chain) identifier.
    pub network: String,
    /// Latest block height known to the node.
    pub latest_block_height: u64,
}

#[derive(Deserialize)]
pub(crate) struct StatusRaw {
    node_info: NodeInfoRaw,
    sync_info: SyncInfoRaw,
}

#[derive(Deserialize)]
struct NodeInfoRaw {
    #[serde(default)]
    network: String,
}

#[derive(Deserialize)]
struct SyncInfoRaw {
    #[serde(deserialize_with = "u64_lenient")]
    latest_block_height: u64,
}

impl From<StatusRaw> for NodeStatus {
    fn from(raw: StatusRaw) -> Self {
        Self {
            network: raw.node_info.network,
            latest_block_height: raw.sync_info.latest_block_height,
        }
    }
}

/// Turn a node RPC address into its WebSocket endpoint.
///
/// `http://` becomes `ws://`, `https://` becomes `wss://`, bare hosts get
/// `ws://`, and `/websocket` is appended once.
pub fn websocket_url(address: &str) -> String {
    let trimmed = address.trim();
    let base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        format!("ws://{trimmed}")
    };

    if base.ends_with("/websocket") {
        base
    } else if base.ends_with('/') {
        format!("{base}websocket")
    } else {
        format!("{base}/websocket")
    }
}
