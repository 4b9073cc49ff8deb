use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

/// Largest capacity a buffer accepts
pub const MAX_CAPACITY: usize = 1_000_000;

/// Storage reserved up front; the rest grows on demand
const INITIAL_RESERVE: usize = 1024;

/// Thread-safe ring buffer holding the most recent stream messages
#[derive(Clone)]
pub struct HistoryBuffer<T> {
    /// Internal storage, oldest first
    entries: Arc<RwLock<VecDeque<T>>>,

    /// Maximum capacity
    capacity: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    /// Create a new buffer with the given capacity
    ///
    /// A capacity of zero is clamped to one, anything above
    /// [`MAX_CAPACITY`] is clamped down to it.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            tracing::warn!("history buffer capacity of 0 is invalid, using 1");
            1
        } else if capacity > MAX_CAPACITY {
            tracing::warn!(
                requested = capacity,
                "history buffer capacity too large, using {MAX_CAPACITY}"
            );
            MAX_CAPACITY
        } else {
            capacity
        };

        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(
                capacity.min(INITIAL_RESERVE),
            ))),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest ones if over capacity
    pub fn push(&self, entry: T) {
        let mut entries = self.entries.write();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Ordered copy of the contents (for rendering)
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().iter().cloned().collect()
    }

    /// Most recently appended entry
    pub fn latest(&self) -> Option<T> {
        self.entries.read().back().cloned()
    }

    /// Get the last N entries
    pub fn tail(&self, n: usize) -> Vec<T> {
        let entries = self.entries.read();
        let start = entries.len().saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }

    /// Entries matching a predicate, in order
    pub fn filtered<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.entries
            .read()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
