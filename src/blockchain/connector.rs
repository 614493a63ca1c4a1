//! Chain Connector seam.
//!
//! Everything above this trait talks to the chain only through it, so the
//! submitter and the registry can run against an in-memory chain in tests.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::types::{ChainError, ChainResult, PendingTransaction, ReceiptSummary};

/// Primitive operations against an Ethereum-compatible RPC endpoint.
#[async_trait]
pub trait ChainConnector: Send + Sync {
    /// Chain ID the connector is configured for.
    fn chain_id(&self) -> u64;

    async fn get_balance(&self, address: Address) -> ChainResult<U256>;

    /// Transaction count including pending transactions.
    async fn get_pending_nonce(&self, address: Address) -> ChainResult<u64>;

    /// Node gas price in wei.
    async fn get_gas_price(&self) -> ChainResult<u128>;

    async fn get_block_number(&self) -> ChainResult<u64>;

    /// `eth_call` against `to` with ABI-encoded `data`.
    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes>;

    /// Broadcast an already-signed payload.
    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<TxHash>;

    async fn get_receipt(&self, tx_hash: TxHash) -> ChainResult<Option<ReceiptSummary>>;

    /// Broadcast a signed transaction.
    ///
    /// A node reporting the payload as already known has accepted this exact
    /// transaction earlier, so its precomputed hash is returned.
    async fn broadcast(&self, pending: &PendingTransaction) -> ChainResult<TxHash> {
        match self.send_raw_transaction(pending.raw.clone()).await {
            Ok(hash) => Ok(hash),
            Err(ChainError::Rpc(message)) if is_already_known(&message) => {
                tracing::debug!(tx_hash = %pending.hash, "Transaction already known to node");
                Ok(pending.hash)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll for a receipt until one appears or `wait` elapses.
    ///
    /// Transient polling errors are logged and polling continues; only the
    /// deadline ends the wait without a receipt.
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        wait: Duration,
        poll_interval: Duration,
    ) -> ChainResult<ReceiptSummary> {
        let result = timeout(wait, async {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.get_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed")
                    }
                }
            }
        })
        .await;

        result.map_err(|_| ChainError::Timeout(wait))
    }
}

/// Node messages meaning the exact payload is already in the mempool.
fn is_already_known(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already known")
        || message.contains("known transaction")
        || message.contains("already imported")
}
