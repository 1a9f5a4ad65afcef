//! Multi-network monitor
//!
//! Keeps one `NetworkScanner` per registered network and fans calls out to
//! all of them. Every scanner reports through a `TaggingSink`, so consumers see
//! a single `MonitorEvent` stream with the originating network attached.
//!
//! Networks are keyed by their lowercase name, so `Base` and `base` are the
//! same network.
//!
//! The registry lock is never held across an await: fan-outs snapshot the
//! scanners first, so `remove_network` can run while `start_monitoring` is
//! still waiting on other networks. A scanner removed while it was starting is
//! stopped again once its `watch()` returns.

use crate::client::ChainConnector;
use crate::config::{MonitorConfig, ScannerSettings};
use crate::error::ChainError;
use crate::events::{EventSink, MonitorEvent, TaggingSink};
use crate::networks::{network_key, EndpointOverride, NetworkDescriptor};
use crate::scanner::{NetworkScanner, ScannerStatus};
use crate::types::{DelegationDesignator, DelegationHistoryEntry, DelegationRecord};
use alloy_primitives::Address;
use futures::future::join_all;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct MultiNetworkMonitor {
    settings: ScannerSettings,
    connector: ChainConnector,
    events: Arc<dyn EventSink<MonitorEvent>>,
    scanners: RwLock<HashMap<String, Arc<NetworkScanner>>>,
    monitoring: AtomicBool,
}

impl MultiNetworkMonitor {
    /// Monitor with no networks registered.
    pub fn new(
        settings: ScannerSettings,
        connector: ChainConnector,
        events: Arc<dyn EventSink<MonitorEvent>>,
    ) -> Self {
        Self {
            settings,
            connector,
            events,
            scanners: RwLock::new(HashMap::new()),
            monitoring: AtomicBool::new(false),
        }
    }

    /// Register every network named in `config`.
    ///
    /// A network that cannot be constructed is reported as an error event and
    /// skipped; the rest are still registered.
    pub fn from_config(
        config: &MonitorConfig,
        connector: ChainConnector,
        events: Arc<dyn EventSink<MonitorEvent>>,
    ) -> Self {
        let monitor = Self::new(config.scanner.clone(), connector, events);
        for name in &config.networks {
            let key = network_key(name);
            let endpoint = config
                .endpoints
                .iter()
                .find(|(configured, _)| network_key(configured) == key)
                .map(|(_, endpoint)| endpoint);
            let descriptor = NetworkDescriptor::builtin(&key).map(|d| match endpoint {
                Some(endpoint) => d.with_override(endpoint),
                None => d,
            });
            monitor.register(&key, descriptor);
        }
        tracing::info!(networks = ?monitor.get_networks(), "Monitor configured");
        monitor
    }

    /// Register explicit descriptors, with the same isolation as `from_config`.
    pub fn with_descriptors(
        descriptors: Vec<NetworkDescriptor>,
        settings: ScannerSettings,
        connector: ChainConnector,
        events: Arc<dyn EventSink<MonitorEvent>>,
    ) -> Self {
        let monitor = Self::new(settings, connector, events);
        for descriptor in descriptors {
            let (key, descriptor) = canonical(descriptor);
            monitor.register(&key, Ok(descriptor));
        }
        monitor
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    pub fn scanner(&self, name: &str) -> Option<Arc<NetworkScanner>> {
        self.scanners.read().get(&network_key(name)).cloned()
    }

    /// Add a built-in network, optionally with endpoint overrides.
    ///
    /// Returns false when the name is already registered or the scanner cannot
    /// be built. Starts watching immediately while the monitor is monitoring.
    pub async fn add_network(&self, name: &str, endpoints: Option<EndpointOverride>) -> bool {
        let key = network_key(name);
        if self.scanners.read().contains_key(&key) {
            tracing::warn!(network = %key, "Network already registered");
            return false;
        }

        let descriptor = NetworkDescriptor::builtin(&key).map(|d| match &endpoints {
            Some(endpoint) => d.with_override(endpoint),
            None => d,
        });
        self.add_and_watch(&key, descriptor).await
    }

    /// Add a custom network.
    pub async fn add_descriptor(&self, descriptor: NetworkDescriptor) -> bool {
        let (key, descriptor) = canonical(descriptor);
        if self.scanners.read().contains_key(&key) {
            tracing::warn!(network = %key, "Network already registered");
            return false;
        }
        self.add_and_watch(&key, Ok(descriptor)).await
    }

    /// Stop and discard one network. Returns false when it is not registered.
    pub async fn remove_network(&self, name: &str) -> bool {
        let key = network_key(name);
        let removed = self.scanners.write().remove(&key);
        let Some(scanner) = removed else {
            return false;
        };

        scanner.stop().await;
        tracing::info!(network = %key, "Network removed");
        true
    }

    /// Watch every registered network concurrently.
    ///
    /// Networks that fail to start are reported as error events; the others
    /// keep going.
    pub async fn start_monitoring(&self) {
        self.monitoring.store(true, Ordering::SeqCst);
        let scanners = self.snapshot();
        tracing::info!(count = scanners.len(), "🚀 Starting monitoring");

        let results = join_all(scanners.iter().map(|scanner| async move {
            (scanner.name().to_string(), self.watch_registered(scanner).await)
        }))
        .await;

        for (network, result) in results {
            if let Err(e) = result {
                self.report_error(&network, &e);
            }
        }
    }

    /// Stop every registered network concurrently.
    pub async fn stop_monitoring(&self) {
        self.monitoring.store(false, Ordering::SeqCst);
        let scanners = self.snapshot();

        join_all(scanners.iter().map(|scanner| scanner.stop())).await;
        tracing::info!(count = scanners.len(), "🛑 Monitoring stopped");
    }

    pub async fn scan_block(&self, block_number: u64) -> Vec<DelegationRecord> {
        let scanners = self.snapshot();
        join_all(scanners.iter().map(|scanner| scanner.scan_block(block_number)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    pub async fn scan_blocks(&self, count: u64, from_block: Option<u64>) -> Vec<DelegationRecord> {
        let scanners = self.snapshot();
        let results = join_all(scanners.iter().map(|scanner| async move {
            (scanner.name().to_string(), scanner.scan_blocks(count, from_block).await)
        }))
        .await;

        let mut records = Vec::new();
        for (network, result) in results {
            match result {
                Ok(found) => records.extend(found),
                Err(e) => self.report_error(&network, &e),
            }
        }
        records
    }

    /// History across every network, newest first, at most `limit` entries.
    pub async fn get_delegation_history(
        &self,
        address: Address,
        limit: usize,
    ) -> Vec<DelegationHistoryEntry> {
        let scanners = self.snapshot();
        let results = join_all(scanners.iter().map(|scanner| async move {
            (
                scanner.name().to_string(),
                scanner.get_delegation_history(address, limit).await,
            )
        }))
        .await;

        let mut entries = Vec::new();
        for (network, result) in results {
            match result {
                Ok(found) => entries.extend(found),
                Err(e) => self.report_error(&network, &e),
            }
        }

        entries.sort_by_key(|entry| Reverse(entry.record.block_number));
        entries.truncate(limit);
        entries
    }

    /// Current delegation designator of `address` on every network that has one.
    pub async fn get_current_delegations(&self, address: Address) -> Vec<DelegationDesignator> {
        let scanners = self.snapshot();
        let results = join_all(scanners.iter().map(|scanner| async move {
            (
                scanner.name().to_string(),
                scanner.get_current_delegation(address).await,
            )
        }))
        .await;

        let mut designators = Vec::new();
        for (network, result) in results {
            match result {
                Ok(Some(designator)) => designators.push(designator),
                Ok(None) => {}
                Err(e) => self.report_error(&network, &e),
            }
        }
        designators
    }

    /// Status of every registered network, sorted by name.
    pub fn get_status(&self) -> Vec<ScannerStatus> {
        let mut status: Vec<_> = self.scanners.read().values().map(|s| s.status()).collect();
        status.sort_by(|a, b| a.network.cmp(&b.network));
        status
    }

    /// Registered network names, sorted.
    pub fn get_networks(&self) -> Vec<String> {
        let mut names: Vec<_> = self.scanners.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn snapshot(&self) -> Vec<Arc<NetworkScanner>> {
        self.scanners.read().values().cloned().collect()
    }

    fn is_registered(&self, scanner: &Arc<NetworkScanner>) -> bool {
        self.scanners
            .read()
            .get(scanner.name())
            .is_some_and(|registered| Arc::ptr_eq(registered, scanner))
    }

    /// Watch a scanner unless it has been removed. A scanner removed, or a
    /// monitor stopped, while `watch()` was in flight is stopped again.
    async fn watch_registered(&self, scanner: &Arc<NetworkScanner>) -> Result<(), ChainError> {
        if !self.is_registered(scanner) {
            return Ok(());
        }

        scanner.watch().await?;

        if !self.is_registered(scanner) || !self.is_monitoring() {
            tracing::debug!(network = %scanner.name(), "Network removed while starting, stopping it");
            scanner.stop().await;
        }
        Ok(())
    }

    fn build_scanner(&self, descriptor: NetworkDescriptor) -> Result<NetworkScanner, ChainError> {
        descriptor.validate()?;
        let client = (self.connector)(&descriptor)?;
        let sink = Arc::new(TaggingSink::new(descriptor.name.clone(), self.events.clone()));
        NetworkScanner::new(descriptor, client, self.settings.clone(), sink)
    }

    /// Build and insert a scanner; construction failures become error events.
    fn register(
        &self,
        name: &str,
        descriptor: Result<NetworkDescriptor, ChainError>,
    ) -> Option<Arc<NetworkScanner>> {
        let scanner = match descriptor.and_then(|d| self.build_scanner(d)) {
            Ok(scanner) => Arc::new(scanner),
            Err(e) => {
                self.report_error(name, &e);
                return None;
            }
        };

        {
            let mut scanners = self.scanners.write();
            if !scanners.contains_key(name) {
                scanners.insert(name.to_string(), scanner.clone());
                tracing::info!(network = %name, chain_id = scanner.chain_id(), "Network registered");
                return Some(scanner);
            }
        }

        self.report_error(
            name,
            &ChainError::InvalidConfig(format!("network {} is already registered", name)),
        );
        None
    }

    async fn add_and_watch(
        &self,
        name: &str,
        descriptor: Result<NetworkDescriptor, ChainError>,
    ) -> bool {
        let Some(scanner) = self.register(name, descriptor) else {
            return false;
        };

        if self.is_monitoring() {
            if let Err(e) = self.watch_registered(&scanner).await {
                self.report_error(name, &e);
            }
        }
        true
    }

    fn report_error(&self, network: &str, error: &ChainError) {
        tracing::error!(network = %network, error = %error, "Network error");
        self.events.emit(MonitorEvent::Error {
            network: Some(network.to_string()),
            error: error.to_string(),
        });
    }
}

/// Descriptor renamed to its registry key.
fn canonical(mut descriptor: NetworkDescriptor) -> (String, NetworkDescriptor) {
    let key = network_key(&descriptor.name);
    descriptor.name = key.clone();
    (key, descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChainClient;
    use crate::mock::{delegation_tx, signed_authorization, MockChain};
    use crate::networks::Endpoints;
    use crate::recovery::tests::{beef, DEV_ADDRESS};
    use crate::scanner::ScannerState;
    use alloy_primitives::B256;
    use tokio::sync::mpsc;

    fn connector(chains: &[(&str, Arc<MockChain>)]) -> ChainConnector {
        let chains: HashMap<String, Arc<MockChain>> = chains
            .iter()
            .map(|(name, chain)| (name.to_string(), chain.clone()))
            .collect();

        Arc::new(move |descriptor: &NetworkDescriptor| {
            chains
                .get(&descriptor.name)
                .cloned()
                .map(|chain| chain as Arc<dyn ChainClient>)
                .ok_or_else(|| ChainError::RpcError(format!("no node for {}", descriptor.name)))
        })
    }

    fn monitor(
        names: &[&str],
        chains: &[(&str, Arc<MockChain>)],
    ) -> (MultiNetworkMonitor, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = MonitorConfig {
            networks: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        };
        (
            MultiNetworkMonitor::from_config(&config, connector(chains), Arc::new(tx)),
            rx,
        )
    }

    fn dev() -> Address {
        DEV_ADDRESS.parse().unwrap()
    }

    fn add_self_delegation(chain: &MockChain, chain_id: u64, block: u64) {
        chain.add_block(
            block,
            vec![delegation_tx(
                B256::with_last_byte(block as u8),
                dev(),
                vec![signed_authorization(chain_id, beef(), block)],
            )],
        );
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<MonitorEvent>) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_construction_failure_is_isolated() {
        let (monitor, mut rx) = monitor(
            &["ethereum", "atlantis", "base", "optimism"],
            &[
                ("ethereum", MockChain::new(10)),
                ("base", MockChain::new(10)),
            ],
        );

        assert_eq!(monitor.get_networks(), vec!["base", "ethereum"]);

        let failed: Vec<_> = drain(&mut rx)
            .iter()
            .filter_map(|event| match event {
                MonitorEvent::Error { network, .. } => network.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec!["atlantis", "optimism"]);
    }

    #[tokio::test]
    async fn test_add_duplicate_network_is_rejected() {
        let (monitor, _rx) = monitor(&["ethereum"], &[("ethereum", MockChain::new(10))]);
        let existing = monitor.scanner("ethereum").unwrap();

        assert!(!monitor.add_network("ethereum", None).await);
        assert!(Arc::ptr_eq(&existing, &monitor.scanner("ethereum").unwrap()));
        assert_eq!(monitor.get_networks(), vec!["ethereum"]);
    }

    #[tokio::test]
    async fn test_network_names_are_case_insensitive() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut endpoints = HashMap::new();
        endpoints.insert(
            "base".to_string(),
            EndpointOverride {
                rpc_url: None,
                ws_url: Some("wss://base.node/ws".to_string()),
            },
        );
        let config = MonitorConfig {
            networks: vec!["Base".to_string()],
            endpoints,
            ..Default::default()
        };
        let monitor = MultiNetworkMonitor::from_config(
            &config,
            connector(&[("base", MockChain::new(10))]),
            Arc::new(tx),
        );

        assert!(!monitor.add_network("base", None).await);
        assert!(!monitor.add_network("BASE", None).await);
        assert_eq!(monitor.get_networks(), vec!["base"]);

        let scanner = monitor.scanner("Base").unwrap();
        assert_eq!(
            scanner.descriptor().endpoints.ws_url.as_deref(),
            Some("wss://base.node/ws")
        );

        assert!(monitor.remove_network("BASE").await);
        assert!(monitor.get_networks().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_configured_network_reports_error() {
        let (monitor, mut rx) = monitor(&["base", "Base"], &[("base", MockChain::new(10))]);

        assert_eq!(monitor.get_networks(), vec!["base"]);
        let errors: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                MonitorEvent::Error { network, error } => Some((network, error)),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0.as_deref(), Some("base"));
        assert!(errors[0].1.contains("already registered"));
    }

    #[tokio::test]
    async fn test_duplicate_descriptor_reports_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let devnet = NetworkDescriptor::new("devnet", 31337, Endpoints::http("http://127.0.0.1:8545"));
        let monitor = MultiNetworkMonitor::with_descriptors(
            vec![devnet.clone(), NetworkDescriptor { name: "DevNet".to_string(), ..devnet }],
            ScannerSettings::default(),
            connector(&[("devnet", MockChain::new(1))]),
            Arc::new(tx),
        );

        assert_eq!(monitor.get_networks(), vec!["devnet"]);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, MonitorEvent::Error { network: Some(n), .. } if n == "devnet")));
    }

    #[tokio::test]
    async fn test_remove_while_start_monitoring_is_in_flight() {
        let base = MockChain::with_subscriptions(10);
        base.hold_subscriptions();
        let (monitor, mut rx) = monitor(
            &["ethereum", "base"],
            &[
                ("ethereum", MockChain::with_subscriptions(10)),
                ("base", base.clone()),
            ],
        );
        let monitor = Arc::new(monitor);
        let base_scanner = monitor.scanner("base").unwrap();

        let starting = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.start_monitoring().await }
        });
        while base.pending_subscriptions() == 0 {
            tokio::task::yield_now().await;
        }

        let removing = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.remove_network("base").await }
        });
        while monitor.get_networks().len() > 1 {
            tokio::task::yield_now().await;
        }
        base.release_subscriptions();

        starting.await.unwrap();
        assert!(removing.await.unwrap());

        assert_eq!(monitor.get_networks(), vec!["ethereum"]);
        assert_eq!(monitor.get_status()[0].state, ScannerState::Watching);
        assert_eq!(base_scanner.state(), ScannerState::Idle);
        assert_eq!(base.live_subscriptions(), 0);

        let events = drain(&mut rx);
        let count = |wanted: fn(&MonitorEvent) -> bool| events.iter().filter(|e| wanted(e)).count();
        assert_eq!(
            count(|e| matches!(e, MonitorEvent::Connected { network } if network == "base")),
            count(|e| matches!(e, MonitorEvent::Disconnected { network } if network == "base")),
        );

        monitor.stop_monitoring().await;
    }

    #[tokio::test]
    async fn test_add_network_while_monitoring_starts_watching() {
        let (monitor, mut rx) = monitor(
            &["ethereum"],
            &[
                ("ethereum", MockChain::with_subscriptions(10)),
                ("base", MockChain::with_subscriptions(20)),
            ],
        );

        monitor.start_monitoring().await;
        assert!(monitor.add_network("base", None).await);

        let status = monitor.get_status();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|s| s.state == ScannerState::Watching));
        assert!(drain(&mut rx).contains(&MonitorEvent::Connected {
            network: "base".to_string()
        }));

        monitor.stop_monitoring().await;
    }

    #[tokio::test]
    async fn test_add_network_while_idle_does_not_watch() {
        let (monitor, _rx) = monitor(&[], &[("base", MockChain::new(20))]);

        assert!(monitor.add_network("base", None).await);
        assert_eq!(monitor.get_status()[0].state, ScannerState::Idle);
        assert!(!monitor.add_network("atlantis", None).await);
    }

    #[tokio::test]
    async fn test_remove_network_leaves_siblings_watching() {
        let (monitor, mut rx) = monitor(
            &["ethereum", "base", "gnosis"],
            &[
                ("ethereum", MockChain::with_subscriptions(10)),
                ("base", MockChain::with_subscriptions(10)),
                ("gnosis", MockChain::with_subscriptions(10)),
            ],
        );
        monitor.start_monitoring().await;

        assert!(monitor.remove_network("base").await);
        assert!(!monitor.remove_network("base").await);

        assert_eq!(monitor.get_networks(), vec!["ethereum", "gnosis"]);
        assert!(monitor.get_status().iter().all(|s| s.state == ScannerState::Watching));

        let disconnected: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, MonitorEvent::Disconnected { .. }))
            .collect();
        assert_eq!(
            disconnected,
            vec![MonitorEvent::Disconnected {
                network: "base".to_string()
            }]
        );

        monitor.stop_monitoring().await;
        assert!(monitor.get_status().iter().all(|s| s.state == ScannerState::Idle));
    }

    #[tokio::test]
    async fn test_start_monitoring_tolerates_failures() {
        let broken = MockChain::new(10);
        broken.set_fail_latest(true);
        let (monitor, mut rx) = monitor(
            &["ethereum", "base"],
            &[
                ("ethereum", MockChain::with_subscriptions(10)),
                ("base", broken),
            ],
        );

        monitor.start_monitoring().await;

        let status: HashMap<_, _> = monitor
            .get_status()
            .into_iter()
            .map(|s| (s.network.clone(), s.state))
            .collect();
        assert_eq!(status["ethereum"], ScannerState::Watching);
        assert_eq!(status["base"], ScannerState::Idle);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, MonitorEvent::Error { network: Some(n), .. } if n == "base")));

        monitor.stop_monitoring().await;
    }

    #[tokio::test]
    async fn test_forwarded_delegations_carry_network() {
        let ethereum = MockChain::with_subscriptions(10);
        add_self_delegation(&ethereum, 1, 11);
        let (monitor, mut rx) = monitor(&["ethereum"], &[("ethereum", ethereum.clone())]);

        monitor.start_monitoring().await;
        ethereum.push_head(11);

        loop {
            match rx.recv().await.unwrap() {
                MonitorEvent::Delegation(record) => {
                    assert_eq!(record.network, "ethereum");
                    assert_eq!(record.block_number, 11);
                    break;
                }
                MonitorEvent::Error { error, .. } => panic!("unexpected error: {}", error),
                _ => continue,
            }
        }

        monitor.stop_monitoring().await;
    }

    #[tokio::test]
    async fn test_scan_block_merges_networks() {
        let ethereum = MockChain::new(10);
        let base = MockChain::new(10);
        add_self_delegation(&ethereum, 1, 5);
        add_self_delegation(&base, 8453, 5);
        let (monitor, _rx) = monitor(&["ethereum", "base"], &[("ethereum", ethereum), ("base", base)]);

        let mut networks: Vec<_> = monitor
            .scan_block(5)
            .await
            .into_iter()
            .map(|r| (r.network, r.chain_id))
            .collect();
        networks.sort();
        assert_eq!(
            networks,
            vec![("base".to_string(), 8453), ("ethereum".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_scan_blocks_reports_failing_network() {
        let ethereum = MockChain::new(10);
        add_self_delegation(&ethereum, 1, 9);
        let base = MockChain::new(10);
        base.set_fail_latest(true);
        let (monitor, mut rx) = monitor(&["ethereum", "base"], &[("ethereum", ethereum), ("base", base)]);

        let records = monitor.scan_blocks(5, None).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].network, "ethereum");
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, MonitorEvent::Error { network: Some(n), .. } if n == "base")));
    }

    #[tokio::test]
    async fn test_history_is_merged_newest_first() {
        let ethereum = MockChain::new(100);
        let base = MockChain::new(100);
        for block in [10, 30, 50] {
            add_self_delegation(&ethereum, 1, block);
        }
        for block in [20, 40, 60] {
            add_self_delegation(&base, 8453, block);
        }
        let (monitor, _rx) = monitor(&["ethereum", "base"], &[("ethereum", ethereum), ("base", base)]);

        let history = monitor.get_delegation_history(dev(), 4).await;

        let blocks: Vec<_> = history
            .iter()
            .map(|e| (e.record.block_number, e.record.network.as_str()))
            .collect();
        assert_eq!(
            blocks,
            vec![(60, "base"), (50, "ethereum"), (40, "base"), (30, "ethereum")]
        );
    }

    #[tokio::test]
    async fn test_custom_descriptor() {
        let (monitor, _rx) = monitor(&[], &[("devnet", MockChain::new(1))]);
        let devnet = NetworkDescriptor::new("devnet", 31337, Endpoints::http("http://127.0.0.1:8545"));

        assert!(monitor.add_descriptor(devnet.clone()).await);
        assert!(!monitor.add_descriptor(devnet).await);
        assert_eq!(monitor.get_status()[0].chain_id, 31337);
    }
}
