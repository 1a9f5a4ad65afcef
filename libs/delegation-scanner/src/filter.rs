//! Block transaction filter
//!
//! Turns a block number into the delegation records it contains. Block-level
//! failures are reported on the error channel and yield an empty result;
//! transaction-level failures only skip the transaction.

use crate::client::ChainClient;
use crate::error::ChainError;
use crate::events::{EventSink, ScannerEvent};
use crate::recovery::resolve_authority;
use crate::types::{
    lowercase_address, lowercase_hash, AuthoritySource, BlockTransaction, DelegationRecord,
    RawAuthorization, RpcTransaction,
};
use alloy_primitives::U256;
use chrono::{DateTime, SecondsFormat};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Inclusive block range covered by `scan_blocks(count, from_block)`.
///
/// Without `from_block` the range ends at `latest`. `None` when `count` is zero.
pub fn scan_range(count: u64, from_block: Option<u64>, latest: u64) -> Option<(u64, u64)> {
    if count == 0 {
        return None;
    }
    match from_block {
        Some(start) => Some((start, start.saturating_add(count - 1))),
        None => Some((latest.saturating_sub(count - 1), latest)),
    }
}

/// ISO-8601 rendering of a unix timestamp, millisecond precision, `Z` suffix.
///
/// Timestamps outside chrono's range render as the unix epoch.
pub fn format_timestamp(unix_secs: u64) -> String {
    i64::try_from(unix_secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct BlockFilter {
    network: String,
    chain_id: u64,
    client: Arc<dyn ChainClient>,
    events: Arc<dyn EventSink<ScannerEvent>>,
    batch_size: usize,
    tx_concurrency: usize,
}

impl BlockFilter {
    pub fn new(
        network: impl Into<String>,
        chain_id: u64,
        client: Arc<dyn ChainClient>,
        events: Arc<dyn EventSink<ScannerEvent>>,
    ) -> Self {
        Self {
            network: network.into(),
            chain_id,
            client,
            events,
            batch_size: 10,
            tx_concurrency: 20,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_tx_concurrency(mut self, tx_concurrency: usize) -> Self {
        self.tx_concurrency = tx_concurrency.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Delegation records of one block. Never fails: a block that cannot be
    /// fetched is reported as an error event and yields nothing.
    pub async fn scan_block(&self, number: u64) -> Vec<DelegationRecord> {
        match self.try_scan_block(number).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(network = %self.network, block = number, error = %e, "Block scan failed");
                self.events.emit(ScannerEvent::Error {
                    error: format!("block {}: {}", number, e),
                });
                Vec::new()
            }
        }
    }

    async fn try_scan_block(&self, number: u64) -> Result<Vec<DelegationRecord>, ChainError> {
        let Some(block) = self.client.block_by_number(number, false).await? else {
            tracing::debug!(network = %self.network, block = number, "Block not found");
            return Ok(Vec::new());
        };
        if block.transactions.is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = format_timestamp(block.timestamp.value());

        let transactions: Vec<Option<RpcTransaction>> = stream::iter(block.transactions)
            .map(|entry| self.fetch_transaction(entry))
            .buffered(self.tx_concurrency)
            .collect()
            .await;

        let records = transactions
            .into_iter()
            .flatten()
            .filter(RpcTransaction::is_delegation_setup)
            .filter_map(|tx| match self.to_record(&tx, number, &timestamp) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        network = %self.network,
                        block = number,
                        tx = %tx.hash,
                        error = %e,
                        "Skipping delegation transaction"
                    );
                    None
                }
            })
            .collect::<Vec<_>>();

        if !records.is_empty() {
            tracing::debug!(network = %self.network, block = number, count = records.len(), "Delegations found");
        }
        Ok(records)
    }

    async fn fetch_transaction(&self, entry: BlockTransaction) -> Option<RpcTransaction> {
        let hash = match entry {
            BlockTransaction::Full(tx) => return Some(*tx),
            BlockTransaction::Hash(hash) => hash,
        };

        match self.client.transaction_by_hash(hash).await {
            Ok(Some(tx)) => Some(tx),
            Ok(None) => {
                tracing::debug!(network = %self.network, tx = %hash, "Transaction not found");
                None
            }
            Err(e) => {
                tracing::warn!(network = %self.network, tx = %hash, error = %e, "Failed to fetch transaction");
                None
            }
        }
    }

    /// Build the record for a delegation setup transaction from its first
    /// authorization entry.
    fn to_record(
        &self,
        tx: &RpcTransaction,
        block_number: u64,
        timestamp: &str,
    ) -> Result<DelegationRecord, ChainError> {
        let authorizations = tx.authorizations();
        let first = authorizations
            .first()
            .ok_or_else(|| ChainError::Decode("empty authorization list".to_string()))?;
        if authorizations.len() > 1 {
            tracing::debug!(
                network = %self.network,
                tx = %tx.hash,
                entries = authorizations.len(),
                "Multiple authorizations, reporting the first"
            );
        }

        let authorization = RawAuthorization::from_json(first)?.normalize();
        let authority = resolve_authority(&authorization, self.chain_id, tx.from);
        if authority.source == AuthoritySource::Sender {
            tracing::warn!(
                network = %self.network,
                tx = %tx.hash,
                "Authority not recoverable, attributing to sender"
            );
        }

        Ok(DelegationRecord {
            tx_hash: lowercase_hash(&tx.hash),
            block_number,
            timestamp: timestamp.to_string(),
            tx_sender: lowercase_address(&tx.from),
            authority: lowercase_address(&authority.address),
            delegated_to: lowercase_address(&authorization.address),
            nonce: authorization.nonce.to_string(),
            chain_id: self.record_chain_id(tx, authorization.chain_id),
            network: self.network.clone(),
            authority_source: authority.source,
        })
    }

    /// Chain id reported on the record. Ids that do not fit a `u64` are
    /// reported as the network's own.
    fn record_chain_id(&self, tx: &RpcTransaction, chain_id: Option<U256>) -> u64 {
        match chain_id.map(u64::try_from) {
            None => self.chain_id,
            Some(Ok(id)) => id,
            Some(Err(_)) => {
                tracing::warn!(
                    network = %self.network,
                    tx = %tx.hash,
                    "Authorization chain id exceeds 64 bits, reporting network chain id"
                );
                self.chain_id
            }
        }
    }

    /// Scan `[start, end]` in concurrent batches of `batch_size` blocks.
    /// Records come back in ascending block order.
    pub async fn scan_range(&self, start: u64, end: u64) -> Vec<DelegationRecord> {
        let mut records = Vec::new();
        if start > end {
            return records;
        }

        let mut batch_start = start;
        loop {
            let batch_end = batch_start
                .saturating_add(self.batch_size as u64 - 1)
                .min(end);

            let batch = join_all((batch_start..=batch_end).map(|n| self.scan_block(n))).await;
            records.extend(batch.into_iter().flatten());

            if batch_end >= end {
                break;
            }
            batch_start = batch_end + 1;
        }

        records
    }

    /// Scan `count` blocks starting at `from_block`, or ending at the latest
    /// block when `from_block` is omitted.
    pub async fn scan_blocks(
        &self,
        count: u64,
        from_block: Option<u64>,
    ) -> Result<Vec<DelegationRecord>, ChainError> {
        let latest = match from_block {
            Some(_) => 0,
            None => self.client.latest_block_number().await?,
        };
        let Some((start, end)) = scan_range(count, from_block, latest) else {
            return Ok(Vec::new());
        };

        tracing::info!(network = %self.network, start, end, "Scanning block range");
        Ok(self.scan_range(start, end).await)
    }
}
