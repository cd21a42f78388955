// Bounded per-stream history (FIFO ring, oldest evicted first)

use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of entries kept per domain.
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// Fixed-capacity, insertion-ordered ring owned by a single sampler.
///
/// `snapshot()` copies the entries out, so a published snapshot is never
/// affected by later pushes.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries oldest-to-newest.
    pub fn snapshot(&self) -> Arc<[T]> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_clamped() {
        let mut h = HistoryBuffer::new(0);
        h.push(1);
        h.push(2);
        assert_eq!(h.capacity(), 1);
        assert_eq!(&*h.snapshot(), &[2]);
    }

    #[test]
    fn snapshot_is_detached_from_later_pushes() {
        let mut h = HistoryBuffer::new(3);
        h.push("a");
        let snap = h.snapshot();
        h.push("b");
        assert_eq!(snap.len(), 1);
        assert_eq!(h.latest(), Some(&"b"));
    }
}
