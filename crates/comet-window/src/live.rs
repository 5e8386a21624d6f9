//! A rolling window kept current by a background task.

use std::future::Future;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use comet_stream::Subscription;

use crate::window::{RollingWindow, WindowEntry};

/// A [`RollingWindow`] seeded from a snapshot and advanced by live events.
///
/// The feed runs on a spawned task and publishes every accepted change
/// through a `watch` channel. Dropping the `LiveWindow` stops the task.
#[derive(Debug)]
pub struct LiveWindow<T> {
    view: watch::Receiver<RollingWindow<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveWindow<T>
where
    T: WindowEntry + Send + Sync + 'static,
{
    /// Follow a subscription, seeding the window from `snapshot`.
    ///
    /// Open the subscription before calling this: events that arrive while
    /// the snapshot is in flight stay queued on it and are absorbed once the
    /// window is seeded, so nothing falls into the gap between the two.
    pub fn follow<F>(snapshot: F, subscription: Subscription) -> Self
    where
        F: Future<Output = Option<Vec<T>>> + Send + 'static,
    {
        let events = subscription.filter_map(|event| async move { T::from_event(event) });
        Self::spawn(snapshot, Box::pin(events))
    }

    /// Drive a window from any ordered stream of entries.
    pub fn spawn<F, S>(snapshot: F, events: S) -> Self
    where
        F: Future<Output = Option<Vec<T>>> + Send + 'static,
        S: Stream<Item = T> + Send + Unpin + 'static,
    {
        let (publisher, view) = watch::channel(RollingWindow::new());
        let task = tokio::spawn(run(snapshot, events, publisher));
        Self { view, task }
    }

    /// The current window.
    pub fn current(&self) -> RollingWindow<T> {
        self.view.borrow().clone()
    }

    /// Receiver that is notified on every accepted change.
    pub fn watch(&self) -> watch::Receiver<RollingWindow<T>> {
        self.view.clone()
    }

    /// Whether the feed has ended, e.g. because its subscription was torn down.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Drop for LiveWindow<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T, F, S>(snapshot: F, mut events: S, publisher: watch::Sender<RollingWindow<T>>)
where
    T: WindowEntry,
    F: Future<Output = Option<Vec<T>>>,
    S: Stream<Item = T> + Unpin,
{
    match snapshot.await {
        Some(rows) => {
            let window = RollingWindow::from_snapshot(rows);
            debug!(rows = window.len(), head = ?window.head().map(|e| e.height()), "window seeded");
            publisher.send_replace(window);
        }
        None => warn!("snapshot unavailable, starting from an empty window"),
    }

    while let Some(entry) = events.next().await {
        let height = entry.height();
        if !publisher.send_if_modified(|window| window.absorb(entry)) {
            trace!(height, "dropped stale or repeated event");
        }
    }
    debug!("live feed ended");
}
