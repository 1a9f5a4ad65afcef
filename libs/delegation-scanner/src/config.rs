//! Monitor configuration
//!
//! Loaded from a JSON file, then overridden from the environment:
//! `<NETWORK>_RPC_URL` / `<NETWORK>_WS_URL` per network,
//! `DELEGATION_POLL_INTERVAL_MS` and `DELEGATION_BATCH_SIZE` for tunables.

use crate::networks::EndpointOverride;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const POLL_INTERVAL_ENV: &str = "DELEGATION_POLL_INTERVAL_MS";
pub const BATCH_SIZE_ENV: &str = "DELEGATION_BATCH_SIZE";

/// Per-scanner tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Blocks fetched concurrently during range scans
    pub batch_size: usize,
    /// Transaction bodies fetched concurrently per block
    pub tx_concurrency: usize,
    /// Polling interval when no subscription endpoint is available
    pub poll_interval_ms: u64,
    /// Period of the background latest-block check while watching
    pub liveness_interval_secs: u64,
    /// Blocks per step when walking history backwards
    pub history_chunk_size: u64,
    /// Maximum number of blocks a history walk looks back
    pub history_lookback: u64,
    /// Maximum blocks scanned in one polling tick
    pub max_catchup_blocks: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            tx_concurrency: 20,
            poll_interval_ms: 3000,
            liveness_interval_secs: 30,
            history_chunk_size: 100,
            history_lookback: 10_000,
            max_catchup_blocks: 100,
        }
    }
}

impl ScannerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs.max(1))
    }

    /// Apply environment overrides for tunables.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse::<u64>(POLL_INTERVAL_ENV) {
            self.poll_interval_ms = ms;
        }
        if let Some(size) = env_parse::<usize>(BATCH_SIZE_ENV) {
            self.batch_size = size.max(1);
        }
        self
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Built-in network names to monitor
    #[serde(default)]
    pub networks: Vec<String>,
    /// Endpoint overrides keyed by network name
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointOverride>,
    #[serde(default)]
    pub scanner: ScannerSettings,
}

impl MonitorConfig {
    pub async fn load_from_file(path: &Path) -> Result<Self, crate::ChainError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            crate::ChainError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment overrides for every configured network and tunable.
    pub fn with_env_overrides(mut self) -> Self {
        for network in &self.networks {
            let prefix = env_prefix(network);
            let rpc_url = std::env::var(format!("{}_RPC_URL", prefix)).ok();
            let ws_url = std::env::var(format!("{}_WS_URL", prefix)).ok();
            if rpc_url.is_none() && ws_url.is_none() {
                continue;
            }

            let entry = self.endpoints.entry(network.clone()).or_default();
            if rpc_url.is_some() {
                entry.rpc_url = rpc_url;
            }
            if ws_url.is_some() {
                entry.ws_url = ws_url;
            }
            tracing::debug!(network = %network, "Endpoint override from environment");
        }

        self.scanner = self.scanner.with_env_overrides();
        self
    }
}

/// `base-sepolia` -> `BASE_SEPOLIA`
pub fn env_prefix(network: &str) -> String {
    network
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
