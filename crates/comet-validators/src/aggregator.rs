//! Page loads with concurrent metric fetches and supersede-on-new-request.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::ValidatorSource;
use crate::types::{LoadOutcome, LoadStatus, Metric, PageView, ValidatorRecord};

/// A settled metric fetch, addressed by record index.
enum Settled {
    Uptime(usize, Metric<f64>),
    Signatures(usize, Metric<u64>),
}

impl Settled {
    fn apply(self, records: &mut [ValidatorRecord]) -> bool {
        match self {
            Settled::Uptime(index, metric) => match records.get_mut(index) {
                Some(record) => {
                    record.uptime = metric;
                    true
                }
                None => false,
            },
            Settled::Signatures(index, metric) => match records.get_mut(index) {
                Some(record) => {
                    record.commit_signatures = metric;
                    true
                }
                None => false,
            },
        }
    }
}

type Fetch<'a> = Pin<Box<dyn Future<Output = Settled> + Send + 'a>>;

/// Loads validator pages and publishes them through a `watch` channel.
///
/// At most one load is live at a time. Starting a load cancels the previous
/// one and bumps the view's generation; writes are applied only while the
/// view still carries the writer's generation, so a superseded load can
/// never touch the newer page.
#[derive(Debug)]
pub struct ValidatorAggregator<S> {
    source: S,
    view: watch::Sender<PageView>,
    active: Mutex<Option<CancellationToken>>,
    generation: AtomicU64,
}

impl<S: ValidatorSource> ValidatorAggregator<S> {
    /// Create an aggregator reading from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            view: watch::Sender::new(PageView::default()),
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// The source this aggregator reads from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Subscribe to the published page view.
    pub fn watch(&self) -> watch::Receiver<PageView> {
        self.view.subscribe()
    }

    /// Snapshot of the current page view.
    pub fn current(&self) -> PageView {
        self.view.borrow().clone()
    }

    /// Load one page, superseding any load still in flight.
    ///
    /// The skeleton is published as soon as the listing arrives; each metric
    /// is then written into its own record as it settles. Resolves once every
    /// metric has settled, or early if a newer load supersedes this one.
    pub async fn load_page(&self, page: u32, per_page: u32) -> LoadOutcome {
        let (token, generation) = self.supersede(page, per_page);

        let outcome = tokio::select! {
            _ = token.cancelled() => LoadOutcome::Superseded,
            outcome = self.run(generation, page, per_page) => outcome,
        };

        if outcome == LoadOutcome::Superseded {
            debug!(page, per_page, generation, "validator page load superseded");
        }
        outcome
    }

    /// Cancel the previous load and claim a new generation for this one.
    fn supersede(&self, page: u32, per_page: u32) -> (CancellationToken, u64) {
        let token = CancellationToken::new();
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = active.replace(token.clone()) {
            previous.cancel();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.view
            .send_replace(PageView::loading(generation, page, per_page));
        (token, generation)
    }

    async fn run(&self, generation: u64, page: u32, per_page: u32) -> LoadOutcome {
        let (listing, latest) = tokio::join!(
            self.source.validators(page, per_page),
            self.source.latest_height()
        );

        let Some(listing) = listing else {
            warn!(page, per_page, "validator listing unavailable");
            return if self.update(generation, |view| {
                view.status = LoadStatus::Unavailable;
                true
            }) {
                LoadOutcome::Unavailable
            } else {
                LoadOutcome::Superseded
            };
        };
        if latest.is_none() {
            warn!(page, "latest height unavailable, uptime cannot be requested");
        }

        let records: Vec<ValidatorRecord> = listing
            .validators
            .into_iter()
            .map(ValidatorRecord::skeleton)
            .collect();
        let addresses: Vec<String> = records.iter().map(|r| r.address.clone()).collect();
        let total = listing.total.unwrap_or(records.len() as u64);

        if !self.update(generation, |view| {
            view.total = total;
            view.records = records;
            true
        }) {
            return LoadOutcome::Superseded;
        }

        let mut fetches: FuturesUnordered<Fetch<'_>> = FuturesUnordered::new();
        for (index, address) in addresses.iter().enumerate() {
            fetches.push(Box::pin(self.fetch_uptime(index, address, latest)));
            fetches.push(Box::pin(async move {
                let count = self.source.commit_signatures(address).await;
                Settled::Signatures(index, Metric::settle(count))
            }));
        }

        while let Some(settled) = fetches.next().await {
            if !self.update(generation, |view| settled.apply(&mut view.records))
                && !self.is_current(generation)
            {
                return LoadOutcome::Superseded;
            }
        }

        if self.update(generation, |view| {
            view.status = LoadStatus::Loaded;
            true
        }) {
            info!(page, per_page, validators = addresses.len(), "validator page loaded");
            LoadOutcome::Loaded
        } else {
            LoadOutcome::Superseded
        }
    }

    async fn fetch_uptime(&self, index: usize, address: &str, latest: Option<u64>) -> Settled {
        let uptime = match latest {
            Some(end) => Metric::settle(self.source.uptime(address, 0, end).await),
            None => Metric::Failed,
        };
        Settled::Uptime(index, uptime)
    }

    /// Apply `f` to the view if it still belongs to `generation`.
    fn update(&self, generation: u64, f: impl FnOnce(&mut PageView) -> bool) -> bool {
        self.view
            .send_if_modified(|view| view.generation == generation && f(view))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.view.borrow().generation == generation
    }
}
