//! The admission coordinator: accepts candidate transactions, drives the
//! asynchronous application check, serves proposers, and reconciles on
//! block commit.

use crate::app::{Application, CheckTxResponse, DeliverTxResponse};
use crate::cache::TxCache;
use crate::config::MempoolConfig;
use crate::gossip::GossipIndex;
use crate::metrics::METRICS;
use crate::priority::PriorityIndex;
use crate::store::{InsertError, MempoolTx, TxStore};
use crate::validator::Validator;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tidepool_common::error::MempoolError;
use tidepool_common::types::{PeerId, Tx, TxInfo, TxKey};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Invoked with the application's response once an asynchronous check
/// finishes. Not called when the transaction never reaches the validator
/// (duplicates, synchronous rejections).
pub type CheckTxCallback = Box<dyn FnOnce(&CheckTxResponse) + Send + 'static>;

/// Caller-supplied filter applied before a transaction reaches the
/// application.
pub type PreCheckFn = Arc<dyn Fn(&Tx) -> Result<(), String> + Send + Sync>;

/// Caller-supplied filter applied to entries surviving a block commit.
pub type PostCheckFn = Arc<dyn Fn(&Tx, &CheckTxResponse) -> Result<(), String> + Send + Sync>;

/// Everything the coordinator lock guards. The store, cache, and both
/// indexes are only ever touched through this struct, which is what keeps
/// them mutually consistent.
struct PoolState {
    store: TxStore,
    cache: TxCache,
    gossip: GossipIndex,
    priority: PriorityIndex,
    pre_check: Option<PreCheckFn>,
    post_check: Option<PostCheckFn>,
}

impl PoolState {
    /// Removes an entry together with its priority node and the gossip node
    /// recorded at admission. Later duplicate-arrival gossip nodes stay
    /// behind and are pruned on the next re-broadcast traversal.
    fn remove_entry(&mut self, key: &TxKey) -> Option<MempoolTx> {
        let entry = self.store.remove(key)?;
        self.priority.remove(entry.priority, entry.sequence, entry.key);
        self.gossip.remove_oldest(key);
        Some(entry)
    }

    fn publish_gauges(&self) {
        METRICS.set_pool_gauges(
            self.store.len() as u64,
            self.store.size_bytes(),
            self.gossip.len() as u64,
        );
    }

    fn reset(&mut self) {
        self.store.reset();
        self.cache.reset();
        self.gossip.reset();
        self.priority.reset();
    }
}

/// A bounded, prioritized transaction mempool.
///
/// `check_tx` runs concurrently from many producers; `reap_max_bytes_max_gas`
/// serves the proposer under the shared guard; `update` holds the exclusive
/// guard for the whole reconciliation, so every admission completed before
/// an update is observed by it and every admission started after sees the
/// committed removals.
pub struct TxMempool {
    config: MempoolConfig,
    validator: Validator,
    state: RwLock<PoolState>,
    /// Admission sequence: unique and monotonic, not gap-free. Resets only
    /// on flush.
    sequence: AtomicU64,
    height: AtomicI64,
}

impl TxMempool {
    pub fn new(config: MempoolConfig, app: Arc<dyn Application>, height: i64) -> Self {
        let validator = Validator::new(app, Duration::from_millis(config.check_timeout_ms));
        let state = PoolState {
            store: TxStore::new(config.size, config.max_txs_bytes),
            cache: TxCache::new(config.cache_size),
            gossip: GossipIndex::new(),
            priority: PriorityIndex::new(),
            pre_check: None,
            post_check: None,
        };
        METRICS.reset();
        Self {
            config,
            validator,
            state: RwLock::new(state),
            sequence: AtomicU64::new(0),
            height: AtomicI64::new(height),
        }
    }

    pub fn with_pre_check(mut self, f: PreCheckFn) -> Self {
        self.state.get_mut().pre_check = Some(f);
        self
    }

    pub fn with_post_check(mut self, f: PostCheckFn) -> Self {
        self.state.get_mut().post_check = Some(f);
        self
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    /// Block height the mempool currently believes in.
    pub fn height(&self) -> i64 {
        self.height.load(Ordering::Relaxed)
    }

    pub async fn size(&self) -> usize {
        self.state.read().await.store.len()
    }

    pub async fn size_bytes(&self) -> u64 {
        self.state.read().await.store.size_bytes()
    }

    pub async fn gossip_len(&self) -> usize {
        self.state.read().await.gossip.len()
    }

    pub async fn contains(&self, key: &TxKey) -> bool {
        self.state.read().await.store.contains(key)
    }

    /// Admits a candidate transaction.
    ///
    /// The synchronous phase performs size, pre-check, capacity, and
    /// duplicate screening; validation itself is enqueued and this call
    /// returns as soon as the validator is dispatched. Producers are
    /// expected to throttle on `MempoolError::Full`. The application's verdict is
    /// delivered through `callback` on a later tick.
    pub async fn check_tx(
        self: &Arc<Self>,
        tx: Tx,
        callback: Option<CheckTxCallback>,
        info: TxInfo,
        token: Option<CancellationToken>,
    ) -> Result<(), MempoolError> {
        METRICS.sent.fetch_add(1, Ordering::Relaxed);

        if tx.len() > self.config.max_tx_bytes {
            METRICS.fail_too_large.fetch_add(1, Ordering::Relaxed);
            return Err(MempoolError::TxTooLarge {
                max: self.config.max_tx_bytes,
                actual: tx.len(),
            });
        }

        let key = tx.key();
        {
            let mut state = self.state.write().await;

            if let Some(pre_check) = state.pre_check.clone() {
                if let Err(reason) = pre_check(&tx) {
                    METRICS.fail_pre_check.fetch_add(1, Ordering::Relaxed);
                    return Err(MempoolError::PreCheck(reason));
                }
            }

            if state.store.contains(&key) {
                // Known transaction arriving from one more peer: record the
                // arrival for gossip accounting, skip validation.
                state.store.add_peer(&key, info.sender);
                if self.config.broadcast {
                    state.gossip.push(key, info.sender);
                }
                state.publish_gauges();
                debug!("Tx {} already admitted, noted peer {}", key, info.sender);
                return Ok(());
            }

            if state.store.would_exceed(tx.len()) {
                METRICS.fail_is_full.fetch_add(1, Ordering::Relaxed);
                return Err(MempoolError::Full {
                    size: state.store.len(),
                    bytes: state.store.size_bytes(),
                });
            }

            if state.cache.seen(&key) {
                METRICS.fail_in_cache.fetch_add(1, Ordering::Relaxed);
                return Err(MempoolError::AlreadySeen(key));
            }
            state.cache.remember(key);
        }

        if let Some(token) = &token {
            if token.is_cancelled() {
                // Roll back the cache claim; the owner of this fingerprint
                // never dispatched.
                self.state.write().await.cache.forget(&key);
                return Err(MempoolError::Cancelled);
            }
        }

        let mempool = Arc::clone(self);
        tokio::spawn(async move {
            let result = mempool.validator.check(&tx).await;
            match result {
                Ok(response) => {
                    mempool.finalize_check_tx(tx, key, response, info, callback).await;
                }
                Err(err) => {
                    warn!("Application bridge failed for tx {}: {}", key, err);
                    METRICS.app_fail.fetch_add(1, Ordering::Relaxed);
                    let mut state = mempool.state.write().await;
                    if !mempool.config.keep_invalid_txs_in_cache {
                        state.cache.forget(&key);
                    }
                    drop(state);
                    if let Some(cb) = callback {
                        cb(&CheckTxResponse::reject(1, err.to_string()));
                    }
                }
            }
        });
        Ok(())
    }

    /// Continuation of `check_tx`: turns an application response into an
    /// admitted entry, or reverses the cache claim.
    async fn finalize_check_tx(
        &self,
        tx: Tx,
        key: TxKey,
        response: CheckTxResponse,
        info: TxInfo,
        callback: Option<CheckTxCallback>,
    ) {
        let mut state = self.state.write().await;

        if state.store.contains(&key) {
            // Lost the race against a concurrent check of the same bytes
            // (only possible with the cache disabled). Count the arrival.
            state.store.add_peer(&key, info.sender);
            if self.config.broadcast {
                state.gossip.push(key, info.sender);
            }
        } else if !response.is_ok() {
            METRICS.app_fail.fetch_add(1, Ordering::Relaxed);
            if !self.config.keep_invalid_txs_in_cache {
                state.cache.forget(&key);
            }
            debug!(
                "Application rejected tx {}: code={} log={}",
                key, response.code, response.log
            );
        } else if state.store.would_exceed(tx.len()) {
            // Concurrent admissions filled the pool after this transaction
            // passed the synchronous capacity check.
            METRICS.fail_is_full.fetch_add(1, Ordering::Relaxed);
            // Let the transaction retry once capacity frees up.
            state.cache.forget(&key);
            debug!(
                "Mempool full ({} txs, {} bytes), dropping tx {}",
                state.store.len(),
                state.store.size_bytes(),
                key
            );
        } else {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let entry = MempoolTx {
                key,
                gas_wanted: response.gas_wanted.max(0),
                priority: response.priority,
                sender: response.sender.clone(),
                height: self.height.load(Ordering::Relaxed),
                sequence,
                peers: HashSet::from([info.sender]),
                inserted_at: chrono::Utc::now(),
                tx,
            };
            match state.store.insert(entry) {
                Ok(()) => {
                    state.priority.insert(response.priority, sequence, key);
                    if self.config.broadcast {
                        state.gossip.push(key, info.sender);
                    }
                    METRICS.success.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Admitted tx {} priority={} sequence={}",
                        key, response.priority, sequence
                    );
                }
                Err(InsertError::Duplicate(_)) | Err(InsertError::Full { .. }) => {
                    // `contains` and `would_exceed` ran under this same
                    // guard, so neither arm is reachable; keep the cache
                    // honest anyway.
                    state.cache.forget(&key);
                }
            }
        }

        state.publish_gauges();
        drop(state);

        if let Some(cb) = callback {
            cb(&response);
        }
    }

    /// Collects transactions for a block proposal in priority order
    /// (priority descending, admission sequence ascending) while the
    /// cumulative byte and gas budgets hold. -1 disables a budget.
    /// Non-destructive; removal happens only in `update`.
    pub async fn reap_max_bytes_max_gas(&self, max_bytes: i64, max_gas: i64) -> Vec<Tx> {
        let state = self.state.read().await;
        let mut total_bytes: i64 = 0;
        let mut total_gas: i64 = 0;
        let mut txs = Vec::new();

        for node in state.priority.iter() {
            let entry = match state.store.get(&node.key) {
                Some(entry) => entry,
                None => continue,
            };
            let bytes = entry.size_bytes() as i64;
            if max_bytes > -1 && total_bytes + bytes > max_bytes {
                break;
            }
            if max_gas > -1 && total_gas + entry.gas_wanted > max_gas {
                break;
            }
            total_bytes += bytes;
            total_gas += entry.gas_wanted;
            txs.push(entry.tx.clone());
        }
        txs
    }

    /// Reconciles the pool after a block commit. Runs under the exclusive
    /// guard: committed and invalidated entries are dropped, the optional
    /// post-check filters the survivors, and with `recheck` enabled every
    /// survivor goes through the application again. Returns an error only
    /// if the application bridge itself fails.
    pub async fn update(
        &self,
        height: i64,
        txs: &[Tx],
        responses: &[DeliverTxResponse],
        pre_check: Option<PreCheckFn>,
        post_check: Option<PostCheckFn>,
    ) -> Result<(), MempoolError> {
        debug_assert_eq!(txs.len(), responses.len());
        let mut state = self.state.write().await;

        if pre_check.is_some() {
            state.pre_check = pre_check;
        }
        if post_check.is_some() {
            state.post_check = post_check;
        }

        for (tx, response) in txs.iter().zip(responses.iter()) {
            let key = tx.key();
            if response.is_ok() {
                // Keep committed fingerprints cached so gossip stragglers
                // cannot re-admit them.
                state.cache.remember(key);
            } else if !self.config.keep_invalid_txs_in_cache {
                state.cache.forget(&key);
            }
            if state.remove_entry(&key).is_some() {
                debug!("Removed committed tx {}", key);
            }
        }

        if let Some(post_check) = state.post_check.clone() {
            let mut rejected = Vec::new();
            for entry in state.store.iter() {
                let response = CheckTxResponse {
                    gas_wanted: entry.gas_wanted,
                    priority: entry.priority,
                    sender: entry.sender.clone(),
                    ..Default::default()
                };
                if let Err(reason) = post_check(&entry.tx, &response) {
                    debug!("Post-check rejected tx {}: {}", entry.key, reason);
                    rejected.push(entry.key);
                }
            }
            for key in rejected {
                if !self.config.keep_invalid_txs_in_cache {
                    state.cache.forget(&key);
                }
                state.remove_entry(&key);
            }
        }

        if self.config.recheck && !state.store.is_empty() {
            let survivors: Vec<(TxKey, Tx)> = state
                .store
                .iter()
                .map(|entry| (entry.key, entry.tx.clone()))
                .collect();
            for (key, tx) in survivors {
                let response = self.validator.check(&tx).await?;
                if !response.is_ok() {
                    debug!("Recheck rejected tx {}: code={}", key, response.code);
                    if !self.config.keep_invalid_txs_in_cache {
                        state.cache.forget(&key);
                    }
                    state.remove_entry(&key);
                }
            }
        }

        self.height.store(height, Ordering::Relaxed);
        state.publish_gauges();
        Ok(())
    }

    /// Transactions worth re-broadcasting to `peer`, in arrival order and
    /// deduplicated, excluding everything that peer already delivered. Also
    /// prunes gossip nodes whose entries are gone.
    pub async fn txs_for_peer(&self, peer: PeerId) -> Vec<Tx> {
        let mut state = self.state.write().await;

        let PoolState { store, gossip, .. } = &mut *state;
        gossip.prune(|key| store.contains(key));

        let mut seen = HashSet::new();
        let mut txs = Vec::new();
        for node in state.gossip.iter() {
            if !seen.insert(node.key) {
                continue;
            }
            let entry = match state.store.get(&node.key) {
                Some(entry) => entry,
                None => continue,
            };
            if entry.peers.contains(&peer) {
                continue;
            }
            txs.push(entry.tx.clone());
        }
        state.publish_gauges();
        txs
    }

    /// Drops every transaction, fingerprint, and index node. The admission
    /// sequence restarts from zero; this is the only place it may.
    pub async fn flush(&self) {
        let mut state = self.state.write().await;
        state.reset();
        self.sequence.store(0, Ordering::Relaxed);
        state.publish_gauges();
    }
}
