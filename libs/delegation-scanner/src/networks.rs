//! Network descriptors and the built-in network registry

use crate::error::ChainError;
use serde::{Deserialize, Serialize};

/// Connection endpoints of one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// HTTP JSON-RPC endpoint (required)
    pub rpc_url: String,
    /// WebSocket endpoint for new-block subscriptions (optional, polling otherwise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

impl Endpoints {
    pub fn http(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ws_url: None,
        }
    }

    pub fn with_ws(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }
}

/// Partial endpoint override, merged over a network's defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOverride {
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub ws_url: Option<String>,
}

/// Immutable configuration of one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub name: String,
    pub chain_id: u64,
    /// Informational only
    pub explorer_url: String,
    pub endpoints: Endpoints,
}

impl NetworkDescriptor {
    pub fn new(name: impl Into<String>, chain_id: u64, endpoints: Endpoints) -> Self {
        Self {
            name: name.into(),
            chain_id,
            explorer_url: String::new(),
            endpoints,
        }
    }

    /// Look up a built-in network by name (case-insensitive).
    pub fn builtin(name: &str) -> Result<Self, ChainError> {
        let key = network_key(name);
        BUILTIN_NETWORKS
            .iter()
            .find(|n| n.name == key)
            .map(BuiltinNetwork::descriptor)
            .ok_or_else(|| ChainError::UnsupportedNetwork(name.to_string()))
    }

    /// Apply an endpoint override; unset fields keep their current value.
    pub fn with_override(mut self, endpoint: &EndpointOverride) -> Self {
        if let Some(rpc_url) = &endpoint.rpc_url {
            self.endpoints.rpc_url = rpc_url.clone();
        }
        if let Some(ws_url) = &endpoint.ws_url {
            self.endpoints.ws_url = Some(ws_url.clone());
        }
        self
    }

    /// A scanner cannot exist without a request endpoint.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.name.trim().is_empty() {
            return Err(ChainError::InvalidConfig("network name is empty".to_string()));
        }
        let rpc_url = self.endpoints.rpc_url.trim();
        if rpc_url.is_empty() {
            return Err(ChainError::InvalidConfig(format!(
                "network {} has no RPC endpoint",
                self.name
            )));
        }
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ChainError::InvalidConfig(format!(
                "network {}: RPC endpoint must be http(s): {}",
                self.name, rpc_url
            )));
        }
        if let Some(ws_url) = &self.endpoints.ws_url {
            if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
                return Err(ChainError::InvalidConfig(format!(
                    "network {}: subscription endpoint must be ws(s): {}",
                    self.name, ws_url
                )));
            }
        }
        Ok(())
    }
}

struct BuiltinNetwork {
    name: &'static str,
    chain_id: u64,
    explorer_url: &'static str,
    rpc_url: &'static str,
}

impl BuiltinNetwork {
    fn descriptor(&self) -> NetworkDescriptor {
        NetworkDescriptor {
            name: self.name.to_string(),
            chain_id: self.chain_id,
            explorer_url: self.explorer_url.to_string(),
            endpoints: Endpoints::http(self.rpc_url),
        }
    }
}

const BUILTIN_NETWORKS: &[BuiltinNetwork] = &[
    BuiltinNetwork {
        name: "ethereum",
        chain_id: 1,
        explorer_url: "https://etherscan.io",
        rpc_url: "https://eth.llamarpc.com",
    },
    BuiltinNetwork {
        name: "sepolia",
        chain_id: 11_155_111,
        explorer_url: "https://sepolia.etherscan.io",
        rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    },
    BuiltinNetwork {
        name: "holesky",
        chain_id: 17_000,
        explorer_url: "https://holesky.etherscan.io",
        rpc_url: "https://ethereum-holesky-rpc.publicnode.com",
    },
    BuiltinNetwork {
        name: "base",
        chain_id: 8453,
        explorer_url: "https://basescan.org",
        rpc_url: "https://mainnet.base.org",
    },
    BuiltinNetwork {
        name: "optimism",
        chain_id: 10,
        explorer_url: "https://optimistic.etherscan.io",
        rpc_url: "https://mainnet.optimism.io",
    },
    BuiltinNetwork {
        name: "arbitrum",
        chain_id: 42_161,
        explorer_url: "https://arbiscan.io",
        rpc_url: "https://arb1.arbitrum.io/rpc",
    },
    BuiltinNetwork {
        name: "bsc",
        chain_id: 56,
        explorer_url: "https://bscscan.com",
        rpc_url: "https://bsc-dataseed.binance.org",
    },
    BuiltinNetwork {
        name: "gnosis",
        chain_id: 100,
        explorer_url: "https://gnosisscan.io",
        rpc_url: "https://rpc.gnosischain.com",
    },
    BuiltinNetwork {
        name: "polygon",
        chain_id: 137,
        explorer_url: "https://polygonscan.com",
        rpc_url: "https://polygon-rpc.com",
    },
];

/// Registry key of a network name: trimmed, lowercase.
pub fn network_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Names of all built-in networks
pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN_NETWORKS.iter().map(|n| n.name).collect()
}
