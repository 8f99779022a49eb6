use std::cmp::Ordering;
use std::collections::BTreeSet;
use tidepool_common::types::TxKey;

/// One node per unique admitted transaction, ordered for reaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityNode {
    pub priority: i64,
    pub sequence: u64,
    pub key: TxKey,
}

/// Higher priority first; among equal priorities the earlier admission
/// (lower sequence) wins. Sequences are unique, so the order is total.
impl Ord for PriorityNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for PriorityNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered index over unique entries for block proposal. Insert and remove
/// are O(log n); traversal yields reap order.
#[derive(Debug, Default)]
pub struct PriorityIndex {
    nodes: BTreeSet<PriorityNode>,
}

impl PriorityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, priority: i64, sequence: u64, key: TxKey) {
        self.nodes.insert(PriorityNode {
            priority,
            sequence,
            key,
        });
    }

    pub fn remove(&mut self, priority: i64, sequence: u64, key: TxKey) -> bool {
        self.nodes.remove(&PriorityNode {
            priority,
            sequence,
            key,
        })
    }

    /// Iterates in reap order: priority descending, sequence ascending.
    pub fn iter(&self) -> impl Iterator<Item = &PriorityNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn reset(&mut self) {
        self.nodes.clear();
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
    fn test_orders_by_priority_desc() {
        let mut index = PriorityIndex::new();
        index.insert(1, 0, key(1));
        index.insert(3, 1, key(2));
        index.insert(2, 2, key(3));

        let priorities: Vec<i64> = index.iter().map(|n| n.priority).collect();
        assert_eq!(priorities, vec![3, 2, 1]);
    }

    #[test]
    fn test_equal_priority_breaks_ties_by_sequence() {
        let mut index = PriorityIndex::new();
        index.insert(5, 7, key(1));
        index.insert(5, 3, key(2));
        index.insert(5, 5, key(3));

        let sequences: Vec<u64> = index.iter().map(|n| n.sequence).collect();
        assert_eq!(sequences, vec![3, 5, 7]);
    }

    #[test]
    fn test_negative_priorities_sort_last() {
        let mut index = PriorityIndex::new();
        index.insert(-4, 0, key(1));
        index.insert(0, 1, key(2));
        index.insert(9, 2, key(3));

        let priorities: Vec<i64> = index.iter().map(|n| n.priority).collect();
        assert_eq!(priorities, vec![9, 0, -4]);
    }

    #[test]
    fn test_remove() {
        let mut index = PriorityIndex::new();
        index.insert(1, 0, key(1));
        index.insert(2, 1, key(2));

        assert!(index.remove(1, 0, key(1)));
        assert!(!index.remove(1, 0, key(1)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.iter().next().unwrap().key, key(2));
    }
}
