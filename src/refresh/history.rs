//! Bounded sample history.
//!
//! Keeps the last `capacity` successful snapshots of a source so time-series
//! views can be drawn without re-fetching.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::RwLock;

/// A snapshot together with the time it was stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample<T> {
    pub captured_at: DateTime<Utc>,
    pub value: T,
}

/// Ring buffer of samples, oldest evicted first.
pub struct SampleHistory<T> {
    entries: RwLock<VecDeque<Sample<T>>>,
    capacity: usize,
}

impl<T: Clone> SampleHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Adds a sample, evicting the oldest if at capacity.
    pub fn push(&self, value: T) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(Sample {
            captured_at: Utc::now(),
            value,
        });
    }

    /// Returns all samples in chronological order (oldest first)
    pub fn get_all(&self) -> Vec<Sample<T>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<Sample<T>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .back()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_history() {
        let history: SampleHistory<u32> = SampleHistory::new(20);
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 20);
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_ring_buffer_eviction_fifo() {
        let history = SampleHistory::new(20);
        for i in 0..25u32 {
            history.push(i);
        }

        assert_eq!(history.len(), 20);
        let samples = history.get_all();
        assert_eq!(samples[0].value, 5);
        assert_eq!(samples[19].value, 24);
        assert_eq!(history.latest().map(|s| s.value), Some(24));
    }

    #[test]
    fn test_samples_in_push_order() {
        let history = SampleHistory::new(5);
        for i in (0..3u32).rev() {
            history.push(i);
        }
        let values: Vec<u32> = history.get_all().into_iter().map(|s| s.value).collect();
        assert_eq!(values, vec![2, 1, 0]);
        let samples = history.get_all();
        assert!(samples[0].captured_at <= samples[2].captured_at);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let history = SampleHistory::new(0);
        history.push("x");
        assert!(history.is_empty());
    }
}
