use arc_swap::ArcSwap;
use reqtrail_core::entry::LogEntry;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// Default buffer capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded, insertion-ordered buffer of the most recent log entries.
///
/// The buffer is an immutable deque published through `ArcSwap`. An insert
/// builds the next deque (evicting at most the oldest entry) and swaps it in;
/// a snapshot loads the current one. Readers never wait on writers, and the
/// length never exceeds `capacity`.
pub struct EntryStore {
    entries: ArcSwap<VecDeque<Arc<LogEntry>>>,
    capacity: usize,
}

impl EntryStore {
    /// Create a store holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: ArcSwap::from_pointee(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Append an entry, evicting the oldest one if the buffer is full.
    pub fn insert(&self, entry: LogEntry) {
        let entry = Arc::new(entry);
        let capacity = self.capacity;
        // `rcu` retries on contention; the closure only reads `current`.
        let previous = self.entries.rcu(|current| {
            let mut next = VecDeque::clone(current);
            if next.len() >= capacity {
                next.pop_front();
            }
            next.push_back(entry.clone());
            next
        });
        if previous.len() >= capacity {
            if let Some(evicted) = previous.front() {
                trace!(id = evicted.id, "Evicted oldest log entry");
            }
        }
    }

    /// Point-in-time copy of up to `limit` entries, oldest first.
    /// `None` returns everything.
    pub fn snapshot(&self, limit: Option<usize>) -> Vec<Arc<LogEntry>> {
        let entries = self.entries.load_full();
        entries
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
