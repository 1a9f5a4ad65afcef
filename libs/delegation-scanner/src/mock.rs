//! In-memory chain for tests

use crate::client::{BlockSubscription, ChainClient};
use crate::error::ChainError;
use crate::recovery::authorization_digest;
use crate::recovery::tests::sign;
use crate::types::{BlockTransaction, Quantity, RpcBlock, RpcTransaction};
use alloy_primitives::{Address, Bytes, B256, U256};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// Jan 1 2024 00:00:00 UTC
pub(crate) const GENESIS_TIME: u64 = 1_704_067_200;

#[derive(Default)]
pub(crate) struct MockChain {
    latest: AtomicU64,
    blocks: Mutex<HashMap<u64, RpcBlock>>,
    transactions: Mutex<HashMap<B256, RpcTransaction>>,
    codes: Mutex<HashMap<Address, Bytes>>,
    failing_blocks: Mutex<HashSet<u64>>,
    failing_txs: Mutex<HashSet<B256>>,
    fail_latest: AtomicBool,
    subscribable: AtomicBool,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<u64>>>,
    subscribe_gate: Mutex<Option<Arc<Semaphore>>>,
    pending_subscriptions: AtomicUsize,
    block_requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockChain {
    pub(crate) fn new(latest: u64) -> Arc<Self> {
        let chain = Self::default();
        chain.latest.store(latest, Ordering::SeqCst);
        Arc::new(chain)
    }

    pub(crate) fn with_subscriptions(latest: u64) -> Arc<Self> {
        let chain = Self::new(latest);
        chain.subscribable.store(true, Ordering::SeqCst);
        chain
    }

    /// Insert a block holding `transactions` (by hash).
    pub(crate) fn add_block(&self, number: u64, transactions: Vec<RpcTransaction>) {
        let hashes = transactions
            .iter()
            .map(|tx| BlockTransaction::Hash(tx.hash))
            .collect();

        let mut stored = self.transactions.lock();
        for tx in transactions {
            stored.insert(tx.hash, tx);
        }

        self.blocks.lock().insert(
            number,
            RpcBlock {
                number: Quantity(number),
                hash: Some(B256::with_last_byte(number as u8)),
                timestamp: Quantity(GENESIS_TIME + number * 12),
                transactions: hashes,
            },
        );
    }

    pub(crate) fn set_code(&self, address: Address, code: Bytes) {
        self.codes.lock().insert(address, code);
    }

    pub(crate) fn set_latest(&self, number: u64) {
        self.latest.store(number, Ordering::SeqCst);
    }

    pub(crate) fn fail_block(&self, number: u64) {
        self.failing_blocks.lock().insert(number);
    }

    pub(crate) fn fail_transaction(&self, hash: B256) {
        self.failing_txs.lock().insert(hash);
    }

    pub(crate) fn set_fail_latest(&self, fail: bool) {
        self.fail_latest.store(fail, Ordering::SeqCst);
    }

    /// Announce a new head to every live subscription.
    pub(crate) fn push_head(&self, number: u64) {
        self.set_latest(number);
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(number).is_ok());
    }

    /// Make subscribe calls wait until `release_subscriptions`.
    pub(crate) fn hold_subscriptions(&self) {
        *self.subscribe_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub(crate) fn release_subscriptions(&self) {
        if let Some(gate) = self.subscribe_gate.lock().take() {
            gate.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    /// Subscribe calls currently waiting on the gate.
    pub(crate) fn pending_subscriptions(&self) -> usize {
        self.pending_subscriptions.load(Ordering::SeqCst)
    }

    /// Simulate the socket dropping.
    pub(crate) fn drop_subscriptions(&self) {
        self.subscribers.lock().clear();
    }

    pub(crate) fn live_subscriptions(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|subscriber| !subscriber.is_closed())
            .count()
    }

    pub(crate) fn block_requests(&self) -> usize {
        self.block_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChain {
    async fn latest_block_number(&self) -> Result<u64, ChainError> {
        if self.fail_latest.load(Ordering::SeqCst) {
            return Err(ChainError::RpcError("node unreachable".to_string()));
        }
        Ok(self.latest.load(Ordering::SeqCst))
    }

    async fn block_by_number(
        &self,
        number: u64,
        _full_transactions: bool,
    ) -> Result<Option<RpcBlock>, ChainError> {
        self.block_requests.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_blocks.lock().contains(&number) {
            return Err(ChainError::RpcError(format!("block {} unavailable", number)));
        }
        Ok(self.blocks.lock().get(&number).cloned())
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<RpcTransaction>, ChainError> {
        if self.failing_txs.lock().contains(&hash) {
            return Err(ChainError::RpcError(format!("tx {} unavailable", hash)));
        }
        Ok(self.transactions.lock().get(&hash).cloned())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        Ok(self.codes.lock().get(&address).cloned().unwrap_or_default())
    }

    async fn subscribe_new_blocks(
        &self,
        _cancel: CancellationToken,
    ) -> Result<Option<BlockSubscription>, ChainError> {
        if !self.subscribable.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let gate = self.subscribe_gate.lock().clone();
        if let Some(gate) = gate {
            self.pending_subscriptions.fetch_add(1, Ordering::SeqCst);
            let _ = gate.acquire().await;
            self.pending_subscriptions.fetch_sub(1, Ordering::SeqCst);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        Ok(Some(rx))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Authorization entry signed by the dev key, flat `yParity` shape.
pub(crate) fn signed_authorization(chain_id: u64, delegate: Address, nonce: u64) -> serde_json::Value {
    let (r, s, parity) = sign(authorization_digest(U256::from(chain_id), delegate, nonce));
    json!({
        "chainId": format!("0x{:x}", chain_id),
        "address": delegate,
        "nonce": format!("0x{:x}", nonce),
        "r": r,
        "s": s,
        "yParity": if parity { "0x1" } else { "0x0" },
    })
}

pub(crate) fn delegation_tx(
    hash: B256,
    from: Address,
    authorizations: Vec<serde_json::Value>,
) -> RpcTransaction {
    serde_json::from_value(json!({
        "hash": hash,
        "from": from,
        "type": "0x4",
        "authorizationList": authorizations,
    }))
    .unwrap()
}

pub(crate) fn plain_tx(hash: B256, from: Address) -> RpcTransaction {
    serde_json::from_value(json!({
        "hash": hash,
        "from": from,
        "type": "0x2",
    }))
    .unwrap()
}
