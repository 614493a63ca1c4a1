//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoint (primary + failovers)
//! - Query chain state (nonce, balance, gas price, receipts)
//! - Execute read calls and broadcast signed payloads
//! - Handle timeouts and network errors gracefully

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportResult;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::connector::ChainConnector;
use crate::blockchain::types::{ChainConfig, ChainError, ChainId, ChainResult, ReceiptSummary};
use crate::observability::metrics;

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    config: ChainConfig,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Construction never dials the endpoint; an unreachable node surfaces
    /// as `ChainError::Connection` on first use.
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            ChainError::Connection(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            chain_id = config.chain_id,
            "Blockchain client initialized"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> ChainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> ChainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Run `op` against each provider in turn.
    ///
    /// Only connection failures and timeouts move on to the next provider. A
    /// JSON-RPC error response is the node's answer and is returned as is.
    async fn with_failover<T, F, Fut>(&self, op: &'static str, f: F) -> ChainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = ChainError::Connection("no RPC providers configured".to_string());

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    let err = ChainError::from_transport(e);
                    metrics::record_rpc_error(op);
                    if !err.is_connection() {
                        return Err(err);
                    }
                    tracing::warn!(provider_idx = i, op, error = %err, "RPC connection error, trying next provider");
                    last_error = err;
                }
                Err(_) => {
                    metrics::record_rpc_error(op);
                    tracing::warn!(provider_idx = i, op, "RPC timeout, trying next provider");
                    last_error = ChainError::Timeout(self.timeout_duration);
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl ChainConnector for BlockchainClient {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        self.with_failover("eth_getBalance", |p| async move { p.get_balance(address).await })
            .await
    }

    async fn get_pending_nonce(&self, address: Address) -> ChainResult<u64> {
        self.with_failover("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn get_gas_price(&self) -> ChainResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        self.with_failover("eth_call", |p| {
            let request = TransactionRequest::default().with_to(to).with_input(data.clone());
            async move { p.call(request).await }
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<TxHash> {
        self.with_failover("eth_sendRawTransaction", |p| {
            let raw = raw.clone();
            async move {
                let pending = p.send_raw_transaction(&raw).await?;
                Ok(*pending.tx_hash())
            }
        })
        .await
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> ChainResult<Option<ReceiptSummary>> {
        let receipt = self
            .with_failover("eth_getTransactionReceipt", |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash: r.transaction_hash,
            block_number: r.block_number,
            success: r.status(),
            gas_used: r.gas_used,
        }))
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
