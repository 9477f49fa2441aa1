use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed-length ring buffer of recent values, oldest first.
///
/// Starts full of the initial value so consumers never see a short history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueHistory<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> ValueHistory<T> {
    pub fn new(capacity: usize, initial: T) -> Self {
        Self {
            values: std::iter::repeat(initial).take(capacity).collect(),
            capacity,
        }
    }

    pub fn push_back(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn latest(&self) -> Option<T> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_starts_full() {
        let h = ValueHistory::new(3, 7i64);
        assert_eq!(h.len(), 3);
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![7, 7, 7]);
    }

    #[test]
    fn test_history_drops_oldest() {
        let mut h = ValueHistory::new(3, 0i64);
        for v in 1..=5 {
            h.push_back(v);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(h.latest(), Some(5));
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut h = ValueHistory::new(0, 0i64);
        h.push_back(1);
        assert!(h.is_empty());
        assert_eq!(h.latest(), None);
    }
}
