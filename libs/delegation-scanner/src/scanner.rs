//! Per-network scanner
//!
//! Owns one network connection. Range scans can run in any state; `watch()`
//! moves the scanner from Idle to Watching and processes every new block, using
//! the subscription endpoint when one is configured and polling otherwise.
//!
//! Connectivity loss (failed liveness check, dropped subscription) is reported as an
//! error event and does NOT stop the scanner or trigger a reconnect. Whoever
//! owns the scanner decides whether to `stop()` and `watch()` again.

use crate::client::{AlloyChainClient, BlockSubscription, ChainClient};
use crate::config::ScannerSettings;
use crate::error::ChainError;
use crate::events::{EventSink, ScannerEvent};
use crate::filter::BlockFilter;
use crate::networks::NetworkDescriptor;
use crate::types::{
    lowercase_address, DelegationDesignator, DelegationHistoryEntry, DelegationRecord,
};
use alloy_primitives::Address;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Code prefix marking an account as delegated (`0xef0100 || address`)
pub const DELEGATION_DESIGNATOR_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// How long `stop()` waits for background tasks before aborting them
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Implementation address of a delegation designator, if `code` is one.
pub fn parse_designator(code: &[u8]) -> Option<Address> {
    let rest = code.strip_prefix(&DELEGATION_DESIGNATOR_PREFIX)?;
    rest.get(..20).map(Address::from_slice)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerState {
    Idle,
    Watching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    Subscription,
    Polling,
}

/// Point-in-time view of a scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannerStatus {
    pub network: String,
    pub chain_id: u64,
    pub state: ScannerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<WatchMode>,
}

/// Background tasks of one Watching period
struct WatchSession {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

pub struct NetworkScanner {
    descriptor: NetworkDescriptor,
    settings: ScannerSettings,
    client: Arc<dyn ChainClient>,
    filter: Arc<BlockFilter>,
    events: Arc<dyn EventSink<ScannerEvent>>,
    session: tokio::sync::Mutex<Option<WatchSession>>,
    /// `None` while Idle
    mode: RwLock<Option<WatchMode>>,
}

impl NetworkScanner {
    /// Create a scanner over an existing client.
    pub fn new(
        descriptor: NetworkDescriptor,
        client: Arc<dyn ChainClient>,
        settings: ScannerSettings,
        events: Arc<dyn EventSink<ScannerEvent>>,
    ) -> Result<Self, ChainError> {
        descriptor.validate()?;

        let filter = BlockFilter::new(
            descriptor.name.clone(),
            descriptor.chain_id,
            client.clone(),
            events.clone(),
        )
        .with_batch_size(settings.batch_size)
        .with_tx_concurrency(settings.tx_concurrency);

        Ok(Self {
            descriptor,
            settings,
            client,
            filter: Arc::new(filter),
            events,
            session: tokio::sync::Mutex::new(None),
            mode: RwLock::new(None),
        })
    }

    /// Create a scanner talking to the descriptor's endpoints through alloy.
    pub fn connect(
        descriptor: NetworkDescriptor,
        settings: ScannerSettings,
        events: Arc<dyn EventSink<ScannerEvent>>,
    ) -> Result<Self, ChainError> {
        let client = Arc::new(AlloyChainClient::connect(&descriptor)?);
        Self::new(descriptor, client, settings, events)
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn chain_id(&self) -> u64 {
        self.descriptor.chain_id
    }

    pub fn descriptor(&self) -> &NetworkDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> ScannerState {
        match *self.mode.read() {
            Some(_) => ScannerState::Watching,
            None => ScannerState::Idle,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.state() == ScannerState::Watching
    }

    pub fn status(&self) -> ScannerStatus {
        let mode = *self.mode.read();
        ScannerStatus {
            network: self.descriptor.name.clone(),
            chain_id: self.descriptor.chain_id,
            state: if mode.is_some() {
                ScannerState::Watching
            } else {
                ScannerState::Idle
            },
            mode,
        }
    }

    pub async fn scan_block(&self, number: u64) -> Vec<DelegationRecord> {
        self.filter.scan_block(number).await
    }

    pub async fn scan_blocks(
        &self,
        count: u64,
        from_block: Option<u64>,
    ) -> Result<Vec<DelegationRecord>, ChainError> {
        self.filter.scan_blocks(count, from_block).await
    }

    /// Start watching new blocks. No-op when already Watching.
    pub async fn watch(&self) -> Result<(), ChainError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            tracing::debug!(network = %self.name(), "Already watching");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        let subscription = match self.client.subscribe_new_blocks(cancel.child_token()).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(network = %self.name(), error = %e, "Subscription failed, switching to polling");
                self.events.emit(ScannerEvent::Error {
                    error: format!("subscription failed, polling instead: {}", e),
                });
                None
            }
        };

        let mode = match subscription {
            Some(subscription) => {
                tasks.push(tokio::spawn(run_subscription(
                    self.name().to_string(),
                    self.filter.clone(),
                    self.events.clone(),
                    subscription,
                    cancel.clone(),
                )));
                WatchMode::Subscription
            }
            None => {
                let start_block = self.client.latest_block_number().await.map_err(|e| {
                    tracing::error!(network = %self.name(), error = %e, "Cannot start polling");
                    e
                })?;
                tasks.push(tokio::spawn(run_polling(
                    self.name().to_string(),
                    self.client.clone(),
                    self.filter.clone(),
                    self.events.clone(),
                    self.settings.clone(),
                    start_block,
                    cancel.clone(),
                )));
                WatchMode::Polling
            }
        };

        tasks.push(tokio::spawn(run_liveness_check(
            self.name().to_string(),
            self.client.clone(),
            self.events.clone(),
            self.settings.liveness_interval(),
            cancel.clone(),
        )));

        *session = Some(WatchSession { cancel, tasks });
        *self.mode.write() = Some(mode);

        tracing::info!(network = %self.name(), chain_id = self.chain_id(), mode = ?mode, "🚀 Watching for delegations");
        self.events.emit(ScannerEvent::Connected);
        Ok(())
    }

    /// Stop watching and release the subscription. No-op when Idle.
    pub async fn stop(&self) {
        let Some(session) = self.session.lock().await.take() else {
            tracing::debug!(network = %self.name(), "Stop requested while idle");
            return;
        };

        session.cancel.cancel();
        for mut task in session.tasks {
            match timeout(STOP_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => {
                    tracing::warn!(network = %self.name(), error = %e, "Watch task ended abnormally");
                }
                Err(_) => {
                    tracing::warn!(network = %self.name(), "Watch task did not stop in time, aborting");
                    task.abort();
                }
            }
        }

        *self.mode.write() = None;
        tracing::info!(network = %self.name(), "🛑 Stopped watching");
        self.events.emit(ScannerEvent::Disconnected);
    }

    /// Read the account's code and decode a delegation designator, if present.
    pub async fn get_current_delegation(
        &self,
        address: Address,
    ) -> Result<Option<DelegationDesignator>, ChainError> {
        let code = self.client.code_at(address).await?;

        Ok(parse_designator(&code).map(|delegate| DelegationDesignator {
            address: lowercase_address(&address),
            delegated_to: lowercase_address(&delegate),
            network: self.descriptor.name.clone(),
            chain_id: self.descriptor.chain_id,
        }))
    }

    /// Walk backwards from the latest block collecting delegations that
    /// `address` both sent and signed, newest first.
    ///
    /// Stops after `limit` entries or once the lookback window is exhausted.
    pub async fn get_delegation_history(
        &self,
        address: Address,
        limit: usize,
    ) -> Result<Vec<DelegationHistoryEntry>, ChainError> {
        let mut entries = Vec::new();
        if limit == 0 {
            return Ok(entries);
        }

        let latest = self.client.latest_block_number().await?;
        let target = lowercase_address(&address);
        let chunk = self.settings.history_chunk_size.max(1);
        let floor = latest.saturating_sub(self.settings.history_lookback.max(1) - 1);

        tracing::debug!(network = %self.name(), address = %target, latest, floor, limit, "Walking delegation history");

        let mut end = latest;
        loop {
            let start = end.saturating_sub(chunk - 1).max(floor);
            let records = self.filter.scan_range(start, end).await;

            for record in records.into_iter().rev() {
                if record.tx_sender == target && record.authority == target {
                    entries.push(DelegationHistoryEntry::from(record));
                    if entries.len() >= limit {
                        return Ok(entries);
                    }
                }
            }

            if start <= floor {
                break;
            }
            end = start - 1;
        }

        Ok(entries)
    }
}

impl Drop for NetworkScanner {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
        }
    }
}

/// Scan one block and emit one event per record found.
async fn process_block(
    network: &str,
    filter: &BlockFilter,
    events: &Arc<dyn EventSink<ScannerEvent>>,
    block_number: u64,
) {
    for record in filter.scan_block(block_number).await {
        tracing::info!(
            network = %network,
            block = record.block_number,
            tx = %record.tx_hash,
            authority = %record.authority,
            delegated_to = %record.delegated_to,
            source = ?record.authority_source,
            "🔔 Delegation detected"
        );
        events.emit(ScannerEvent::Delegation(record));
    }
}

async fn run_subscription(
    network: String,
    filter: Arc<BlockFilter>,
    events: Arc<dyn EventSink<ScannerEvent>>,
    mut subscription: BlockSubscription,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = subscription.recv() => match next {
                Some(block_number) => {
                    tracing::debug!(network = %network, block = block_number, "New block");
                    process_block(&network, &filter, &events, block_number).await;
                }
                None => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    tracing::warn!(network = %network, "Block subscription closed");
                    events.emit(ScannerEvent::Error {
                        error: ChainError::ConnectionLost("block subscription closed".to_string())
                            .to_string(),
                    });
                    break;
                }
            }
        }
    }
}

async fn run_polling(
    network: String,
    client: Arc<dyn ChainClient>,
    filter: Arc<BlockFilter>,
    events: Arc<dyn EventSink<ScannerEvent>>,
    settings: ScannerSettings,
    start_block: u64,
    cancel: CancellationToken,
) {
    let mut last_seen = start_block;
    let mut poll_interval = interval(settings.poll_interval());
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    poll_interval.tick().await;

    tracing::info!(network = %network, from = start_block, "📊 Polling for new blocks");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = poll_interval.tick() => {
                let latest = match client.latest_block_number().await {
                    Ok(latest) => latest,
                    Err(e) => {
                        tracing::warn!(network = %network, error = %e, "Polling error");
                        continue;
                    }
                };
                if latest <= last_seen {
                    continue;
                }

                let mut next = last_seen + 1;
                let max_catchup = settings.max_catchup_blocks.max(1);
                if latest - last_seen > max_catchup {
                    let resume = latest - max_catchup + 1;
                    tracing::warn!(network = %network, skipped_from = next, skipped_to = resume - 1, "Falling behind, skipping blocks");
                    next = resume;
                }

                for block_number in next..=latest {
                    if cancel.is_cancelled() {
                        return;
                    }
                    process_block(&network, &filter, &events, block_number).await;
                }
                last_seen = latest;
            }
        }
    }
}

async fn run_liveness_check(
    network: String,
    client: Arc<dyn ChainClient>,
    events: Arc<dyn EventSink<ScannerEvent>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut check_interval = interval(period);
    check_interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = check_interval.tick() => {
                match client.latest_block_number().await {
                    Ok(latest) => tracing::trace!(network = %network, latest, "💚 Liveness check"),
                    Err(e) => {
                        tracing::warn!(network = %network, error = %e, "Liveness check failed");
                        events.emit(ScannerEvent::Error {
                            error: format!("liveness check failed: {}", e),
                        });
                    }
                }
            }
        }
    }
}
