//! Connection lifecycle: probing, connecting and closing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ConnectStage, ConnectionError, SubscribeError, TransportError};
use crate::event::ChainEvent;
use crate::multiplexer::{Command, Driver, Listener, Subscription, SubscriptionHandle};
use crate::types::{
    websocket_url, Channel, ConnectionState, NodeStatus, StatusRaw, StreamConfig, SubscriptionStatus,
};

/// Check whether a node accepts WebSocket connections.
///
/// Opens a transient connection and closes it again; resolves `false` on
/// failure or when `timeout` elapses. The transient socket is released on
/// every path.
pub async fn probe(address: &str, timeout: Duration) -> bool {
    let url = websocket_url(address);
    let attempt = async {
        let (mut ws, _) = connect_async(url.as_str()).await?;
        let _ = ws.close(None).await;
        Ok::<_, TransportError>(())
    };

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(())) => {
            debug!(%url, "probe succeeded");
            true
        }
        Ok(Err(e)) => {
            debug!(%url, error = %e, "probe failed");
            false
        }
        Err(_) => {
            debug!(%url, ?timeout, "probe timed out");
            false
        }
    }
}

/// Connect to a node and run its liveness check.
pub async fn connect(address: &str) -> Result<Connection, ConnectionError> {
    let state = Arc::new(watch::Sender::new(ConnectionState::Connecting));
    let result = Connection::establish(address, Arc::clone(&state)).await;
    if result.is_err() {
        state.send_replace(ConnectionState::Failed);
    }
    result
}

/// An open connection to a node.
///
/// Dropping the connection shuts it down; [`close`](Connection::close) does
/// the same and waits for the shutdown to finish.
#[derive(Debug)]
pub struct Connection {
    address: String,
    status: NodeStatus,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
    driver: Option<JoinHandle<()>>,
    next_listener: AtomicU64,
}

impl Connection {
    async fn establish(
        address: &str,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Result<Self, ConnectionError> {
        state.send_replace(ConnectionState::Connecting);
        let url = websocket_url(address);

        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ConnectionError::new(address, ConnectStage::Handshake, e.into()))?;

        let (commands, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let driver = Driver::new(ws, rx, shutdown.clone(), Arc::clone(&state));

        let mut conn = Connection {
            address: address.to_string(),
            status: NodeStatus::default(),
            commands,
            state: state.subscribe(),
            shutdown,
            driver: Some(tokio::spawn(driver.run())),
            next_listener: AtomicU64::new(0),
        };

        let status = conn
            .request("status", json!({}))
            .await
            .and_then(|v| Ok(NodeStatus::from(serde_json::from_value::<StatusRaw>(v)?)));
        match status {
            Ok(status) => conn.status = status,
            Err(e) => {
                conn.close().await;
                return Err(ConnectionError::new(address, ConnectStage::Status, e));
            }
        }

        state.send_replace(ConnectionState::Connected);
        info!(
            %url,
            network = %conn.status.network,
            height = conn.status.latest_block_height,
            "connected to node"
        );
        Ok(conn)
    }

    /// The address this connection was opened with.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Health-check result captured at connect time.
    pub fn node_status(&self) -> &NodeStatus {
        &self.status
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch state transitions, e.g. to notice a transport failure.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Subscribe to a channel.
    ///
    /// Every subscription on the same channel sees the same events in the
    /// same order.
    pub async fn subscribe(&self, channel: Channel) -> Result<Subscription, SubscribeError> {
        if !self.is_connected() {
            return Err(SubscribeError::NotConnected);
        }

        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let torn_down = Arc::new(AtomicBool::new(false));
        let (events, rx) = mpsc::unbounded_channel();
        let (reply, registered) = oneshot::channel();

        self.commands
            .send(Command::Subscribe {
                channel,
                listener: Listener {
                    id,
                    events,
                    torn_down: Arc::clone(&torn_down),
                },
                reply,
            })
            .map_err(|_| SubscribeError::NotConnected)?;
        registered.await.map_err(|_| SubscribeError::NotConnected)?;

        let handle = SubscriptionHandle::new(id, channel, torn_down, self.commands.clone());
        Ok(Subscription::new(handle, rx))
    }

    /// Subscribe to a channel and invoke `on_event` for each event, in
    /// arrival order, on a spawned task.
    ///
    /// No callback runs once the subscription is torn down.
    pub async fn subscribe_with<F>(
        &self,
        channel: Channel,
        mut on_event: F,
    ) -> Result<SubscriptionHandle, SubscribeError>
    where
        F: FnMut(ChainEvent) + Send + 'static,
    {
        let mut subscription = self.subscribe(channel).await?;
        let handle = subscription.handle();
        let watcher = handle.clone();
        tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                if watcher.status() != SubscriptionStatus::Active {
                    break;
                }
                on_event(event);
            }
        });
        Ok(handle)
    }

    /// Close the connection, tearing down all subscriptions.
    pub async fn close(mut self) {
        let _ = self.commands.send(Command::Close);
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!(error = %e, "connection driver ended abnormally");
            }
        }
    }

    async fn request(&self, method: &'static str, params: Value) -> Result<Value, TransportError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Request {
                method,
                params,
                reply,
            })
            .map_err(|_| TransportError::Closed)?;
        response.await.map_err(|_| TransportError::Closed)?
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Owns at most one connection for a consumer and tracks its state.
#[derive(Debug)]
pub struct ConnectionManager {
    config: StreamConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    connection: Option<Connection>,
}

impl ConnectionManager {
    /// Create a manager; no connection is opened yet.
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            state: Arc::new(watch::Sender::new(ConnectionState::Disconnected)),
            connection: None,
        }
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Probe the configured address with the configured timeout.
    pub async fn probe(&self) -> bool {
        probe(&self.config.address, self.config.probe_timeout).await
    }

    /// Open the connection, closing any previous one first.
    pub async fn connect(&mut self) -> Result<&Connection, ConnectionError> {
        if let Some(old) = self.connection.take() {
            old.close().await;
        }

        match Connection::establish(&self.config.address, Arc::clone(&self.state)).await {
            Ok(conn) => Ok(&*self.connection.insert(conn)),
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.state.send_replace(ConnectionState::Failed);
                Err(e)
            }
        }
    }

    /// The open connection, if any.
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    /// Close the connection, if one is open.
    pub async fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.close().await;
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}
