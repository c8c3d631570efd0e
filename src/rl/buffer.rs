//! Bounded experience replay.

use std::collections::VecDeque;

use rand::seq::index;
use rand::RngCore;

/// FIFO buffer of past transitions with uniform sampling.
///
/// Never holds more than `capacity` records; inserting into a full buffer
/// evicts the oldest record.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T> {
    capacity: usize,
    records: VecDeque<T>,
}

impl<T> ReplayBuffer<T> {
    /// Creates an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends `record`, returning the evicted oldest record if full.
    pub fn push(&mut self, record: T) -> Option<T> {
        let evicted = if self.records.len() == self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    /// Draws `batch` distinct records uniformly at random, or `None` while
    /// fewer than `batch` are stored.
    pub fn sample(&self, batch: usize, rng: &mut dyn RngCore) -> Option<Vec<&T>> {
        if batch == 0 || self.records.len() < batch {
            return None;
        }
        let picked = index::sample(rng, self.records.len(), batch);
        Some(picked.iter().map(|i| &self.records[i]).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn evicts_oldest_when_full() {
        let mut buf = ReplayBuffer::new(3);
        for i in 0..3 {
            assert_eq!(buf.push(i), None);
        }
        assert_eq!(buf.push(3), Some(0));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut buf = ReplayBuffer::new(10);
        for i in 0..1000 {
            buf.push(i);
            assert!(buf.len() <= buf.capacity());
        }
    }

    #[test]
    fn sample_requires_full_batch() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut buf = ReplayBuffer::new(100);
        for i in 0..4 {
            buf.push(i);
        }
        assert!(buf.sample(5, &mut rng).is_none());
        let batch = buf.sample(4, &mut rng).unwrap();
        let mut seen: Vec<i32> = batch.into_iter().copied().collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut buf = ReplayBuffer::new(0);
        buf.push("a");
        assert_eq!(buf.push("b"), Some("a"));
        assert_eq!(buf.len(), 1);
    }
}
