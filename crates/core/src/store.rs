use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tidepool_common::types::{PeerId, Tx, TxKey};

/// One admitted transaction with its admission metadata.
///
/// Entries are created by a successful validator callback, mutated only to
/// record additional delivering peers, and destroyed by the commit
/// reconciler or an explicit eviction.
#[derive(Debug, Clone)]
pub struct MempoolTx {
    pub tx: Tx,
    pub key: TxKey,
    /// Gas the application reported for this transaction
    pub gas_wanted: i64,
    /// Application-assigned priority; higher is reaped first
    pub priority: i64,
    /// Sender identifier reported by the application, if any
    pub sender: String,
    /// Block height at which the transaction was admitted
    pub height: i64,
    /// Global admission sequence number, the tie-breaker for equal priority
    pub sequence: u64,
    /// Peers that have delivered this transaction, for gossip suppression
    pub peers: HashSet<PeerId>,
    /// Wall-clock admission time
    pub inserted_at: chrono::DateTime<chrono::Utc>,
}

impl MempoolTx {
    pub fn size_bytes(&self) -> usize {
        self.tx.len()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InsertError {
    #[error("transaction {0} is already stored")]
    Duplicate(TxKey),

    #[error("store is full: {size} transactions ({bytes} bytes)")]
    Full { size: usize, bytes: u64 },
}

/// The authoritative set of admitted transactions, keyed by fingerprint.
///
/// Capacity is enforced here at insertion time against the raw byte length
/// of the transaction; the store never trusts sizes reported elsewhere.
#[derive(Debug)]
pub struct TxStore {
    max_size: usize,
    max_bytes: u64,
    entries: HashMap<TxKey, MempoolTx>,
    total_bytes: u64,
}

impl TxStore {
    pub fn new(max_size: usize, max_bytes: u64) -> Self {
        Self {
            max_size,
            max_bytes,
            entries: HashMap::new(),
            total_bytes: 0,
        }
    }

    /// True when one more transaction of `incoming_bytes` would not fit.
    pub fn would_exceed(&self, incoming_bytes: usize) -> bool {
        self.entries.len() >= self.max_size
            || self.total_bytes + incoming_bytes as u64 > self.max_bytes
    }

    pub fn insert(&mut self, entry: MempoolTx) -> Result<(), InsertError> {
        if self.entries.contains_key(&entry.key) {
            return Err(InsertError::Duplicate(entry.key));
        }
        if self.would_exceed(entry.size_bytes()) {
            return Err(InsertError::Full {
                size: self.entries.len(),
                bytes: self.total_bytes,
            });
        }
        self.total_bytes += entry.size_bytes() as u64;
        self.entries.insert(entry.key, entry);
        Ok(())
    }

    pub fn contains(&self, key: &TxKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &TxKey) -> Option<&MempoolTx> {
        self.entries.get(key)
    }

    /// Records that `peer` has delivered the transaction. Returns false if
    /// the entry is gone.
    pub fn add_peer(&mut self, key: &TxKey, peer: PeerId) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.peers.insert(peer);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &TxKey) -> Option<MempoolTx> {
        let entry = self.entries.remove(key)?;
        self.total_bytes -= entry.size_bytes() as u64;
        Some(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MempoolTx> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8, sequence: u64) -> MempoolTx {
        let tx = Tx::new(vec![byte]);
        MempoolTx {
            key: tx.key(),
            tx,
            gas_wanted: 1,
            priority: 0,
            sender: String::new(),
            height: 1,
            sequence,
            peers: HashSet::new(),
            inserted_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_insert_lookup_remove() {
        let mut store = TxStore::new(10, 1024);
        let e = entry(1, 0);
        let key = e.key;

        store.insert(e).unwrap();
        assert!(store.contains(&key));
        assert_eq!(store.len(), 1);
        assert_eq!(store.size_bytes(), 1);

        let removed = store.remove(&key).unwrap();
        assert_eq!(removed.key, key);
        assert!(!store.contains(&key));
        assert_eq!(store.size_bytes(), 0);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut store = TxStore::new(10, 1024);
        store.insert(entry(1, 0)).unwrap();
        let err = store.insert(entry(1, 1)).unwrap_err();
        assert!(matches!(err, InsertError::Duplicate(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_full_by_count() {
        let mut store = TxStore::new(2, 1024);
        store.insert(entry(1, 0)).unwrap();
        store.insert(entry(2, 1)).unwrap();
        let err = store.insert(entry(3, 2)).unwrap_err();
        assert!(matches!(err, InsertError::Full { size: 2, .. }));
    }

    #[test]
    fn test_full_by_bytes() {
        let mut store = TxStore::new(10, 2);
        store.insert(entry(1, 0)).unwrap();
        store.insert(entry(2, 1)).unwrap();
        assert!(store.would_exceed(1));
        let err = store.insert(entry(3, 2)).unwrap_err();
        assert!(matches!(err, InsertError::Full { .. }));
    }

    #[test]
    fn test_add_peer() {
        let mut store = TxStore::new(10, 1024);
        let e = entry(1, 0);
        let key = e.key;
        store.insert(e).unwrap();

        assert!(store.add_peer(&key, PeerId(3)));
        assert!(store.get(&key).unwrap().peers.contains(&PeerId(3)));
        assert!(!store.add_peer(&Tx::new(vec![9]).key(), PeerId(3)));
    }
}
