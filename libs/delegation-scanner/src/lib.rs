//! Detection of EIP-7702 delegation setup transactions across EVM networks.
//!
//! Provides:
//! - Authority recovery from signed authorization tuples
//! - Per-block filtering of type-4 transactions into delegation records
//! - A per-network scanner that watches new blocks (subscription or polling)
//! - A multi-network monitor fanning calls out to every scanner
//!
//! Connectivity loss is reported as an error event and never stops a scanner
//! or reconnects on its own; restarting is left to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod monitor;
pub mod networks;
pub mod recovery;
pub mod scanner;
pub mod types;

#[cfg(test)]
mod mock;

pub use client::{alloy_connector, AlloyChainClient, BlockSubscription, ChainClient, ChainConnector};
pub use config::{MonitorConfig, ScannerSettings};
pub use error::ChainError;
pub use events::{EventSink, MonitorEvent, NullSink, ScannerEvent, TaggingSink};
pub use filter::BlockFilter;
pub use monitor::MultiNetworkMonitor;
pub use networks::{builtin_names, network_key, EndpointOverride, Endpoints, NetworkDescriptor};
pub use recovery::{recover_authority, resolve_authority, RecoveredAuthority};
pub use scanner::{NetworkScanner, ScannerState, ScannerStatus, WatchMode};
pub use types::*;
