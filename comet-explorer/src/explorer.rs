//! The consumer-owned explorer context.

use tokio::sync::watch;
use tracing::info;

use comet_gateway::{BlockRaw, GatewayClient, TxRaw};
use comet_primitives::{BlockSummary, TxSummary};
use comet_stream::{Channel, Connection, ConnectionError, ConnectionManager, ConnectionState, SubscribeError};
use comet_validators::ValidatorAggregator;
use comet_window::{LiveWindow, MAX_ROWS};

use crate::config::ExplorerConfig;

/// One consumer's view of a chain: a query gateway plus at most one live
/// node connection.
///
/// Nothing here is global. Create an `Explorer` per consumer and close it
/// when done; dropping it closes the connection too.
#[derive(Debug)]
pub struct Explorer {
    gateway: GatewayClient,
    connection: ConnectionManager,
}

impl Explorer {
    /// Create an explorer; no connection is opened yet.
    pub fn new(config: ExplorerConfig) -> Self {
        Self {
            gateway: GatewayClient::new(config.gateway),
            connection: ConnectionManager::new(config.stream),
        }
    }

    /// Create an explorer configured from the environment.
    pub fn from_env() -> Self {
        Self::new(ExplorerConfig::from_env())
    }

    /// The query gateway.
    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Watch connection state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.watch_state()
    }

    /// Check whether the node is reachable, within the configured timeout.
    pub async fn probe(&self) -> bool {
        self.connection.probe().await
    }

    /// Open the node connection, replacing any previous one.
    pub async fn connect(&mut self) -> Result<&Connection, ConnectionError> {
        let conn = self.connection.connect().await?;
        info!(
            address = conn.address(),
            network = %conn.node_status().network,
            "explorer connected"
        );
        Ok(conn)
    }

    /// The open connection, if any.
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.connection()
    }

    /// Close the node connection. Live windows stop once their
    /// subscriptions are torn down.
    pub async fn close(&mut self) {
        self.connection.close().await;
    }

    /// A live window of the most recent blocks.
    pub async fn live_blocks(&self) -> Result<LiveWindow<BlockSummary>, SubscribeError> {
        let conn = self.connection().ok_or(SubscribeError::NotConnected)?;
        let subscription = conn.subscribe(Channel::NewBlock).await?;
        let gateway = self.gateway.clone();
        Ok(LiveWindow::follow(
            async move { gateway.recent_blocks(MAX_ROWS as u32).await },
            subscription,
        ))
    }

    /// A live window of the most recent transactions.
    pub async fn live_transactions(&self) -> Result<LiveWindow<TxSummary>, SubscribeError> {
        let conn = self.connection().ok_or(SubscribeError::NotConnected)?;
        let subscription = conn.subscribe(Channel::NewTx).await?;
        let gateway = self.gateway.clone();
        Ok(LiveWindow::follow(
            async move { gateway.recent_transactions(MAX_ROWS as u32).await },
            subscription,
        ))
    }

    /// A validator aggregator reading from this explorer's gateway.
    pub fn validators(&self) -> ValidatorAggregator<GatewayClient> {
        ValidatorAggregator::new(self.gateway.clone())
    }

    /// Look up a block by height.
    pub async fn block(&self, height: u64) -> Option<BlockRaw> {
        self.gateway.block_by_height(height).await
    }

    /// Look up a block by hash.
    pub async fn block_by_hash(&self, hash: &str) -> Option<BlockRaw> {
        self.gateway.block_by_hash(hash).await
    }

    /// Look up a transaction by hash.
    pub async fn transaction(&self, hash: &str) -> Option<TxRaw> {
        self.gateway.transaction(hash).await
    }
}
