//! Bounded FIFO history of recent observations.

use std::collections::VecDeque;

/// Append-only rolling buffer; once full, the oldest entry is evicted.
#[derive(Debug, Clone)]
pub struct RollingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingBuffer<T> {
    /// Create a buffer holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> RollingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_latest() {
        let mut buf = RollingBuffer::new(3);
        assert!(buf.is_empty());
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.latest(), Some(&2));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut buf = RollingBuffer::new(3);
        for i in 1..=5 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.to_vec(), vec![3, 4, 5]);
        assert_eq!(buf.latest(), Some(&5));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buf = RollingBuffer::new(0);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.to_vec(), vec![2]);
    }

    #[test]
    fn test_clear() {
        let mut buf = RollingBuffer::new(2);
        buf.push(1);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.latest(), None);
    }
}
