//! Event subscription multiplexer.
//!
//! One driver task owns the WebSocket. It writes JSON-RPC requests, routes
//! replies to waiting callers and fans each pushed event out to every
//! listener of its channel. A channel holds a single node-side subscription
//! no matter how many listeners it has; listeners each get their own
//! unbounded queue, so a slow listener never holds back another.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::error::TransportError;
use crate::event::{decode_event, ChainEvent};
use crate::types::{Channel, ConnectionState, SubscriptionStatus};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type Reply = oneshot::Sender<Result<Value, TransportError>>;

/// Requests from connection and subscription handles to the driver.
pub(crate) enum Command {
    Request {
        method: &'static str,
        params: Value,
        reply: Reply,
    },
    Subscribe {
        channel: Channel,
        listener: Listener,
        reply: oneshot::Sender<()>,
    },
    Unsubscribe {
        channel: Channel,
        id: u64,
    },
    Close,
}

pub(crate) struct Listener {
    pub(crate) id: u64,
    pub(crate) events: mpsc::UnboundedSender<ChainEvent>,
    pub(crate) torn_down: Arc<AtomicBool>,
}

impl Listener {
    fn tear_down(self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }
}

struct ChannelState {
    rpc_id: u64,
    listeners: Vec<Listener>,
}

#[derive(Deserialize)]
struct RpcFrame {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl From<RpcErrorObject> for TransportError {
    fn from(e: RpcErrorObject) -> Self {
        let message = match e.data {
            Some(data) if !data.is_empty() => format!("{}: {}", e.message, data),
            _ => e.message,
        };
        TransportError::Rpc {
            code: e.code,
            message,
        }
    }
}

pub(crate) struct Driver {
    ws: WsStream,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
    next_id: u64,
    pending: HashMap<u64, Reply>,
    channels: HashMap<Channel, ChannelState>,
}

impl Driver {
    pub(crate) fn new(
        ws: WsStream,
        commands: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Self {
        Self {
            ws,
            commands,
            shutdown,
            state,
            next_id: 0,
            pending: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    /// Run until closed or until the transport fails.
    pub(crate) async fn run(mut self) {
        let failure = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break None,
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Close) | None => break None,
                    Some(cmd) => {
                        if let Err(e) = self.handle_command(cmd).await {
                            break Some(e);
                        }
                    }
                },
                frame = self.ws.next() => match frame {
                    Some(Ok(msg)) => {
                        if let Err(e) = self.handle_frame(msg).await {
                            break Some(e);
                        }
                    }
                    Some(Err(e)) => break Some(e.into()),
                    None => break Some(TransportError::Closed),
                },
            }
        };

        match failure {
            Some(e) => {
                error!(error = %e, "node connection lost");
                self.tear_down_all(&e);
            }
            None => {
                let _ = self.ws.close(None).await;
                debug!("node connection closed");
                self.tear_down_all(&TransportError::Closed);
            }
        }

        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(TransportError::Closed));
        }
        self.state.send_if_modified(|s| {
            if *s == ConnectionState::Connected {
                *s = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
    }

    async fn handle_command(&mut self, cmd: Command) -> Result<(), TransportError> {
        match cmd {
            Command::Request {
                method,
                params,
                reply,
            } => {
                let id = self.allocate_id();
                self.pending.insert(id, reply);
                self.send_rpc(id, method, params).await?;
            }
            Command::Subscribe {
                channel,
                listener,
                reply,
            } => {
                if let Some(state) = self.channels.get_mut(&channel) {
                    state.listeners.push(listener);
                } else {
                    let id = self.allocate_id();
                    self.channels.insert(
                        channel,
                        ChannelState {
                            rpc_id: id,
                            listeners: vec![listener],
                        },
                    );
                    self.send_rpc(id, "subscribe", json!({ "query": channel.query() }))
                        .await?;
                    debug!(%channel, rpc_id = id, "subscribed");
                }
                let _ = reply.send(());
            }
            Command::Unsubscribe { channel, id } => {
                if let Some(state) = self.channels.get_mut(&channel) {
                    state.listeners.retain(|l| l.id != id);
                }
                self.release_if_idle(channel).await?;
            }
            Command::Close => {}
        }
        Ok(())
    }

    async fn handle_frame(&mut self, msg: Message) -> Result<(), TransportError> {
        match msg {
            Message::Text(text) => self.handle_text(&text).await,
            Message::Close(frame) => {
                debug!(?frame, "node sent close frame");
                Err(TransportError::Closed)
            }
            _ => Ok(()),
        }
    }

    async fn handle_text(&mut self, text: &str) -> Result<(), TransportError> {
        let frame: RpcFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "ignoring malformed frame");
                return Ok(());
            }
        };
        let Some(id) = frame.id.as_u64() else {
            trace!("ignoring frame without numeric id");
            return Ok(());
        };

        if let Some(reply) = self.pending.remove(&id) {
            let outcome = match frame.error {
                Some(err) => Err(err.into()),
                None => Ok(frame.result.unwrap_or(Value::Null)),
            };
            let _ = reply.send(outcome);
            return Ok(());
        }

        let Some(channel) = self.channel_for(id) else {
            trace!(id, "ignoring frame for unknown id");
            return Ok(());
        };

        if let Some(err) = frame.error {
            self.tear_down(channel, &err.into());
            return Ok(());
        }

        let Some(result) = frame.result else {
            return Ok(());
        };
        match decode_event(&result) {
            Ok(Some(event)) if event.channel() == channel => self.dispatch(channel, event).await?,
            Ok(Some(event)) => {
                warn!(%channel, got = %event.channel(), "event on unexpected channel")
            }
            Ok(None) => trace!(%channel, "subscription acknowledged"),
            Err(e) => warn!(%channel, error = %e, "skipping undecodable event"),
        }
        Ok(())
    }

    /// Deliver an event to every listener of a channel, in arrival order.
    async fn dispatch(&mut self, channel: Channel, event: ChainEvent) -> Result<(), TransportError> {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.listeners.retain(|l| {
                !l.torn_down.load(Ordering::SeqCst) && l.events.send(event.clone()).is_ok()
            });
        }
        self.release_if_idle(channel).await
    }

    /// Drop the node-side subscription once a channel has no listeners.
    async fn release_if_idle(&mut self, channel: Channel) -> Result<(), TransportError> {
        let idle = self
            .channels
            .get(&channel)
            .is_some_and(|s| s.listeners.is_empty());
        if !idle {
            return Ok(());
        }
        self.channels.remove(&channel);
        let id = self.allocate_id();
        debug!(%channel, "last listener left, unsubscribing");
        self.send_rpc(id, "unsubscribe", json!({ "query": channel.query() }))
            .await
    }

    /// Tear down every listener of one channel after a channel-scoped error.
    fn tear_down(&mut self, channel: Channel, reason: &TransportError) {
        if let Some(state) = self.channels.remove(&channel) {
            error!(
                %channel,
                listeners = state.listeners.len(),
                error = %reason,
                "subscription channel torn down"
            );
            state.listeners.into_iter().for_each(Listener::tear_down);
        }
    }

    fn tear_down_all(&mut self, reason: &TransportError) {
        let channels: Vec<Channel> = self.channels.keys().copied().collect();
        for channel in channels {
            self.tear_down(channel, reason);
        }
    }

    fn channel_for(&self, rpc_id: u64) -> Option<Channel> {
        self.channels
            .iter()
            .find(|(_, s)| s.rpc_id == rpc_id)
            .map(|(c, _)| *c)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn send_rpc(&mut self, id: u64, method: &str, params: Value) -> Result<(), TransportError> {
        let body = serde_json::to_string(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))?;
        self.ws.send(Message::Text(body.into())).await?;
        Ok(())
    }
}

/// Control side of a subscription; cheap to clone.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    channel: Channel,
    torn_down: Arc<AtomicBool>,
    commands: mpsc::UnboundedSender<Command>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: u64,
        channel: Channel,
        torn_down: Arc<AtomicBool>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            id,
            channel,
            torn_down,
            commands,
        }
    }

    /// The channel this subscription listens on.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Current status.
    pub fn status(&self) -> SubscriptionStatus {
        if self.torn_down.load(Ordering::SeqCst) {
            SubscriptionStatus::TornDown
        } else {
            SubscriptionStatus::Active
        }
    }

    /// Stop receiving events. Calling this more than once has no effect.
    pub fn unsubscribe(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            let _ = self.commands.send(Command::Unsubscribe {
                channel: self.channel,
                id: self.id,
            });
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { method, .. } => write!(f, "Request({method})"),
            Self::Subscribe { channel, .. } => write!(f, "Subscribe({channel})"),
            Self::Unsubscribe { channel, id } => write!(f, "Unsubscribe({channel}, {id})"),
            Self::Close => f.write_str("Close"),
        }
    }
}

/// A live, ordered sequence of events from one channel.
///
/// Ends when the subscription is torn down, either by [`unsubscribe`] or by
/// a transport error. Events queued before the teardown are still yielded.
/// Dropping the subscription unsubscribes it.
///
/// [`unsubscribe`]: SubscriptionHandle::unsubscribe
#[derive(Debug)]
pub struct Subscription {
    handle: SubscriptionHandle,
    events: mpsc::UnboundedReceiver<ChainEvent>,
}

impl Subscription {
    pub(crate) fn new(handle: SubscriptionHandle, events: mpsc::UnboundedReceiver<ChainEvent>) -> Self {
        Self { handle, events }
    }

    /// A handle that can unsubscribe or inspect this subscription.
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// The channel this subscription listens on.
    pub fn channel(&self) -> Channel {
        self.handle.channel
    }

    /// Current status.
    pub fn status(&self) -> SubscriptionStatus {
        self.handle.status()
    }

    /// Stop receiving events. Calling this more than once has no effect.
    pub fn unsubscribe(&self) {
        self.handle.unsubscribe();
    }
}

impl Stream for Subscription {
    type Item = ChainEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChainEvent>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}
