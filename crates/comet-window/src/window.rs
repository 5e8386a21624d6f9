//! The bounded, newest-first rolling window and its acceptance rules.

use std::collections::{HashSet, VecDeque};

use comet_primitives::{BlockSummary, TxSummary};
use comet_stream::ChainEvent;

/// Capacity of every rolling window.
pub const MAX_ROWS: usize = 20;

/// An entry that can live in a [`RollingWindow`].
pub trait WindowEntry: Clone {
    /// Whether an entry is refused when its hash is anywhere in the window,
    /// not just at the head. Block ids streamed without their own hash fall
    /// back to the parent's id or the app hash, so blocks stay height-only.
    const UNIQUE_HASH: bool;

    /// Height the entry belongs to.
    fn height(&self) -> u64;

    /// Identifying hash (block id or tx hash).
    fn hash(&self) -> &str;

    /// Whether `self` may be placed in front of `head`.
    fn follows(&self, head: &Self) -> bool;

    /// Extract an entry of this kind from a streamed event.
    fn from_event(event: ChainEvent) -> Option<Self>;
}

impl WindowEntry for BlockSummary {
    const UNIQUE_HASH: bool = false;

    fn height(&self) -> u64 {
        self.height
    }

    fn hash(&self) -> &str {
        &self.block_id
    }

    fn follows(&self, head: &Self) -> bool {
        self.height > head.height
    }

    fn from_event(event: ChainEvent) -> Option<Self> {
        match event {
            ChainEvent::NewBlock(block) => Some(block),
            ChainEvent::Tx(_) => None,
        }
    }
}

impl WindowEntry for TxSummary {
    const UNIQUE_HASH: bool = true;

    fn height(&self) -> u64 {
        self.height
    }

    fn hash(&self) -> &str {
        &self.hash
    }

    // Several txs share a height, so equal heights are fine as long as the
    // hash differs from the head.
    fn follows(&self, head: &Self) -> bool {
        self.height >= head.height && self.hash != head.hash
    }

    fn from_event(event: ChainEvent) -> Option<Self> {
        match event {
            ChainEvent::Tx(tx) => Some(tx),
            ChainEvent::NewBlock(_) => None,
        }
    }
}

/// At most [`MAX_ROWS`] entries, newest first.
///
/// Blocks are strictly descending by height; transactions are non-increasing
/// by height with no repeated hash.
///
/// The window only ever grows at the front; entries pushed past the tail
/// are gone for good and can only come back through a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow<T> {
    rows: VecDeque<T>,
}

impl<T> Default for RollingWindow<T> {
    fn default() -> Self {
        Self {
            rows: VecDeque::with_capacity(MAX_ROWS),
        }
    }
}

impl<T: WindowEntry> RollingWindow<T> {
    /// An empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial window from a snapshot page.
    ///
    /// The page is expected most-recent-first but is re-sorted by height;
    /// entries that would break the ordering rules (repeated heights for
    /// blocks, repeated hashes for transactions) are skipped, and the result
    /// is truncated to [`MAX_ROWS`].
    pub fn from_snapshot(snapshot: impl IntoIterator<Item = T>) -> Self {
        let mut entries: Vec<T> = snapshot.into_iter().collect();
        entries.sort_by(|a, b| b.height().cmp(&a.height()));

        let mut seen = HashSet::new();
        let mut window = Self::new();
        for entry in entries {
            if window.rows.len() == MAX_ROWS {
                break;
            }
            let fits = window.rows.back().map_or(true, |prev| prev.follows(&entry));
            if fits && (!T::UNIQUE_HASH || seen.insert(entry.hash().to_string())) {
                window.rows.push_back(entry);
            }
        }
        window
    }

    /// Offer an event to the window.
    ///
    /// Accepted entries are prepended and the tail is trimmed back to
    /// [`MAX_ROWS`]. Returns whether the entry was accepted; rejection is the
    /// normal outcome for stale or repeated events.
    pub fn absorb(&mut self, entry: T) -> bool {
        let fits = self.rows.front().map_or(true, |head| entry.follows(head));
        if !fits || (T::UNIQUE_HASH && self.contains(entry.hash())) {
            return false;
        }
        self.rows.push_front(entry);
        self.rows.truncate(MAX_ROWS);
        true
    }

    /// Newest entry.
    pub fn head(&self) -> Option<&T> {
        self.rows.front()
    }

    /// Whether an entry with this hash is in the window.
    pub fn contains(&self, hash: &str) -> bool {
        self.rows.iter().any(|e| e.hash() == hash)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }

    /// Heights, newest first.
    pub fn heights(&self) -> Vec<u64> {
        self.rows.iter().map(WindowEntry::height).collect()
    }

    /// Copy the entries out, newest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.rows.iter().cloned().collect()
    }
}
