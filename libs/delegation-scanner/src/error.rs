//! Error types for chain access and scanning

/// Errors that can occur while talking to a network or scanning it
#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    // Configuration errors (fatal at construction)
    InvalidConfig(String),
    UnsupportedNetwork(String),

    // Fetch errors (recovered by skipping the affected unit)
    RpcError(String),
    Decode(String),

    // Signature recovery errors (recovered by the fallback chain)
    Recovery(String),

    // Connectivity errors (reported, never auto-stop a scanner)
    WebSocketError(String),
    SubscriptionError(String),
    ConnectionLost(String),
}

impl ChainError {
    /// Whether this error means the scanner could not be constructed at all.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ChainError::InvalidConfig(_) | ChainError::UnsupportedNetwork(_)
        )
    }
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            ChainError::UnsupportedNetwork(name) => write!(f, "Unsupported network: {}", name),
            ChainError::RpcError(msg) => write!(f, "RPC error: {}", msg),
            ChainError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ChainError::Recovery(msg) => write!(f, "Signature recovery failed: {}", msg),
            ChainError::WebSocketError(msg) => write!(f, "WebSocket error: {}", msg),
            ChainError::SubscriptionError(msg) => write!(f, "Subscription error: {}", msg),
            ChainError::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<tokio_tungstenite::tungstenite::Error> for ChainError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ChainError::WebSocketError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Decode(err.to_string())
    }
}
