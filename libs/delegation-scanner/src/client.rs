//! Chain access
//!
//! `ChainClient` is the seam between the scanning engine and a node. The
//! alloy-backed implementation speaks JSON-RPC over HTTP for lookups and, when
//! a WebSocket endpoint is configured, subscribes to `newHeads` for live blocks.

use crate::error::ChainError;
use crate::networks::NetworkDescriptor;
use crate::types::{parse_quantity, RpcBlock, RpcTransaction};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy_primitives::{Address, Bytes, B256};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Stream of new block numbers; closes when the subscription ends
pub type BlockSubscription = mpsc::UnboundedReceiver<u64>;

/// Builds a client for a network; lets the monitor add networks at runtime
pub type ChainConnector =
    Arc<dyn Fn(&NetworkDescriptor) -> Result<Arc<dyn ChainClient>, ChainError> + Send + Sync>;

/// Keep-alive ping period on subscription sockets
const WS_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Block, transaction and code lookups plus an optional new-block subscription
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64, ChainError>;

    async fn block_by_number(
        &self,
        number: u64,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, ChainError>;

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<RpcTransaction>, ChainError>;

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    /// Subscribe to new block numbers until `cancel` fires.
    ///
    /// `Ok(None)` means subscriptions are not available and the caller should poll.
    async fn subscribe_new_blocks(
        &self,
        cancel: CancellationToken,
    ) -> Result<Option<BlockSubscription>, ChainError> {
        let _ = cancel;
        Ok(None)
    }
}

/// `ChainClient` over an alloy provider
pub struct AlloyChainClient<P> {
    network: String,
    provider: P,
    ws_url: Option<String>,
}

impl AlloyChainClient<DynProvider> {
    /// Connect over HTTP to the descriptor's request endpoint.
    pub fn connect(descriptor: &NetworkDescriptor) -> Result<Self, ChainError> {
        descriptor.validate()?;

        let provider = ProviderBuilder::new()
            .connect_http(descriptor.endpoints.rpc_url.parse().map_err(|_| {
                ChainError::InvalidConfig(format!(
                    "Invalid RPC URL for {}: {}",
                    descriptor.name, descriptor.endpoints.rpc_url
                ))
            })?)
            .erased();

        Ok(Self::with_provider(descriptor, provider))
    }
}

impl<P> AlloyChainClient<P>
where
    P: Provider + Send + Sync,
{
    pub fn with_provider(descriptor: &NetworkDescriptor, provider: P) -> Self {
        Self {
            network: descriptor.name.clone(),
            provider,
            ws_url: descriptor.endpoints.ws_url.clone(),
        }
    }
}

#[async_trait::async_trait]
impl<P> ChainClient for AlloyChainClient<P>
where
    P: Provider + Send + Sync,
{
    async fn latest_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    async fn block_by_number(
        &self,
        number: u64,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, ChainError> {
        self.provider
            .raw_request::<_, Option<RpcBlock>>(
                "eth_getBlockByNumber".into(),
                (format!("0x{:x}", number), full_transactions),
            )
            .await
            .map_err(|e| ChainError::RpcError(format!("eth_getBlockByNumber({}): {}", number, e)))
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<RpcTransaction>, ChainError> {
        self.provider
            .raw_request::<_, Option<RpcTransaction>>("eth_getTransactionByHash".into(), (hash,))
            .await
            .map_err(|e| ChainError::RpcError(format!("eth_getTransactionByHash({}): {}", hash, e)))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(|e| ChainError::RpcError(format!("eth_getCode({}): {}", address, e)))
    }

    async fn subscribe_new_blocks(
        &self,
        cancel: CancellationToken,
    ) -> Result<Option<BlockSubscription>, ChainError> {
        let Some(ws_url) = self.ws_url.clone() else {
            return Ok(None);
        };

        tracing::info!(network = %self.network, "🔌 Connecting to WebSocket: {}", ws_url);
        let (ws_stream, _) = connect_async(ws_url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let subscribe_msg = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_subscribe",
            "params": ["newHeads"]
        });

        write
            .send(Message::Text(subscribe_msg.to_string().into()))
            .await
            .map_err(|e| ChainError::SubscriptionError(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let network = self.network.clone();

        tokio::spawn(async move {
            let mut ping_interval = interval(WS_PING_INTERVAL);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = write.send(Message::Close(None)).await;
                        tracing::debug!(network = %network, "Subscription cancelled");
                        break;
                    }
                    _ = ping_interval.tick() => {
                        if write.send(Message::Ping(vec![].into())).await.is_err() {
                            tracing::warn!(network = %network, "Failed to send ping");
                            break;
                        }
                    }
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => match parse_new_head(&text) {
                                Ok(Some(block_number)) => {
                                    if tx.send(block_number).is_err() {
                                        break;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    tracing::error!(network = %network, error = %e, "Subscription rejected");
                                    break;
                                }
                            },
                            Some(Ok(Message::Close(_))) => {
                                tracing::info!(network = %network, "WebSocket closed by server");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!(network = %network, "WebSocket error: {:?}", e);
                                break;
                            }
                            None => {
                                tracing::info!(network = %network, "WebSocket stream ended");
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
        });

        Ok(Some(rx))
    }
}

/// Extract the block number from a `newHeads` notification.
///
/// Returns `Ok(None)` for messages that carry no head (e.g. the subscription
/// confirmation) and an error when the node rejected the subscription.
fn parse_new_head(text: &str) -> Result<Option<u64>, ChainError> {
    let message: serde_json::Value = serde_json::from_str(text)?;

    if let Some(error) = message.get("error") {
        return Err(ChainError::SubscriptionError(error.to_string()));
    }

    if let Some(id) = message.get("result").and_then(|r| r.as_str()) {
        tracing::info!("📋 Subscription confirmed: {}", id);
        return Ok(None);
    }

    let Some(number) = message
        .get("params")
        .and_then(|p| p.get("result"))
        .and_then(|r| r.get("number"))
        .and_then(|n| n.as_str())
    else {
        return Ok(None);
    };

    parse_quantity(number)
        .map(Some)
        .map_err(ChainError::Decode)
}

/// Connector producing alloy HTTP clients
pub fn alloy_connector() -> ChainConnector {
    Arc::new(|descriptor: &NetworkDescriptor| {
        let client = AlloyChainClient::connect(descriptor)?;
        Ok(Arc::new(client) as Arc<dyn ChainClient>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::Endpoints;

    #[test]
    fn test_parse_new_head_notification() {
        let text = r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xabc","result":{"number":"0x1b4","hash":"0x00"}}}"#;
        assert_eq!(parse_new_head(text).unwrap(), Some(436));
    }

    #[test]
    fn test_parse_subscription_confirmation() {
        let text = r#"{"jsonrpc":"2.0","id":1,"result":"0x9cef478923ff08bf67fde6c64013158d"}"#;
        assert_eq!(parse_new_head(text).unwrap(), None);
    }

    #[test]
    fn test_parse_subscription_error() {
        let text = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
        assert!(matches!(
            parse_new_head(text),
            Err(ChainError::SubscriptionError(_))
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_new_head("not json"), Err(ChainError::Decode(_))));
    }

    #[test]
    fn test_connect_rejects_missing_endpoint() {
        let descriptor = NetworkDescriptor::new("devnet", 31337, Endpoints::http("  "));
        assert!(matches!(
            AlloyChainClient::connect(&descriptor),
            Err(ChainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_connector_builds_http_client() {
        let descriptor =
            NetworkDescriptor::new("devnet", 31337, Endpoints::http("http://localhost:8545"));
        let connector = alloy_connector();
        assert!(connector(&descriptor).is_ok());
    }
}
