use std::collections::VecDeque;
use tidepool_common::types::{PeerId, TxKey};

/// One record per arrival event. A transaction delivered by N peers
/// contributes N nodes; the index is deliberately not a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GossipNode {
    pub key: TxKey,
    pub peer: PeerId,
    pub arrival: u64,
}

/// Append-only FIFO sequence driving transaction re-broadcast.
///
/// Entry removal takes out a single node (the one created at admission);
/// nodes contributed by later duplicate arrivals linger until a traversal
/// prunes them against the store. Re-broadcast filters exclude the peers
/// that already delivered a transaction.
#[derive(Debug, Default)]
pub struct GossipIndex {
    nodes: VecDeque<GossipNode>,
    next_arrival: u64,
}

impl GossipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node for an arrival event and returns its arrival sequence.
    pub fn push(&mut self, key: TxKey, peer: PeerId) -> u64 {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.nodes.push_back(GossipNode { key, peer, arrival });
        arrival
    }

    /// Removes the oldest node recorded for `key`, if any.
    pub fn remove_oldest(&mut self, key: &TxKey) -> bool {
        if let Some(pos) = self.nodes.iter().position(|n| n.key == *key) {
            self.nodes.remove(pos);
            true
        } else {
            false
        }
    }

    /// Drops every node whose transaction no longer satisfies `alive`.
    pub fn prune<F>(&mut self, alive: F)
    where
        F: Fn(&TxKey) -> bool,
    {
        self.nodes.retain(|n| alive(&n.key));
    }

    pub fn iter(&self) -> impl Iterator<Item = &GossipNode> {
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
        self.next_arrival = 0;
    }
}
