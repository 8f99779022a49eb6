use std::collections::{HashSet, VecDeque};
use tidepool_common::types::TxKey;

/// Bounded FIFO set of recently seen transaction fingerprints.
///
/// A hit lets CheckTx fail fast without touching the application. The cache
/// is pessimistic: eviction is strictly oldest-first, so a fingerprint that
/// falls out may be validated again later, which is acceptable. A capacity
/// of zero disables the cache entirely.
#[derive(Debug)]
pub struct TxCache {
    capacity: usize,
    keys: HashSet<TxKey>,
    order: VecDeque<TxKey>,
}

impl TxCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            keys: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Returns true iff the fingerprint is currently cached.
    pub fn seen(&self, key: &TxKey) -> bool {
        self.keys.contains(key)
    }

    /// Inserts a fingerprint, evicting the oldest one when the cache is at
    /// capacity. A no-op when the cache is disabled or the key is present.
    pub fn remember(&mut self, key: TxKey) {
        if self.capacity == 0 || !self.keys.insert(key) {
            return;
        }
        self.order.push_back(key);
        while self.keys.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
    }

    /// Drops a fingerprint if present.
    pub fn forget(&mut self, key: &TxKey) {
        if self.keys.remove(key) {
            if self.order.front() == Some(key) {
                self.order.pop_front();
            } else {
                self.order.retain(|k| k != key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn reset(&mut self) {
        self.keys.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidepool_common::types::Tx;

    fn key(byte: u8) -> TxKey {
        Tx::new(vec![byte]).key()
    }

    #[test]
    fn test_remember_and_seen() {
        let mut cache = TxCache::new(2);
        assert!(!cache.seen(&key(1)));

        cache.remember(key(1));
        assert!(cache.seen(&key(1)));
        assert_eq!(cache.len(), 1);

        // idempotent
        cache.remember(key(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut cache = TxCache::new(2);
        cache.remember(key(1));
        cache.remember(key(2));
        cache.remember(key(3)); // evicts 1

        assert!(!cache.seen(&key(1)));
        assert!(cache.seen(&key(2)));
        assert!(cache.seen(&key(3)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut cache = TxCache::new(0);
        cache.remember(key(1));
        assert!(!cache.seen(&key(1)));
        assert!(!cache.enabled());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_forget() {
        let mut cache = TxCache::new(3);
        cache.remember(key(1));
        cache.remember(key(2));
        cache.forget(&key(1));

        assert!(!cache.seen(&key(1)));
        assert!(cache.seen(&key(2)));

        // forgotten keys can be remembered again
        cache.remember(key(1));
        assert!(cache.seen(&key(1)));
    }

    #[test]
    fn test_reset() {
        let mut cache = TxCache::new(3);
        cache.remember(key(1));
        cache.remember(key(2));
        cache.reset();
        assert!(cache.is_empty());
        assert!(!cache.seen(&key(1)));
    }
}
