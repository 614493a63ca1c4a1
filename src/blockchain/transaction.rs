//! Transaction building, signing, broadcast and confirmation.
//!
//! # Responsibilities
//! - Pick a nonce per sender without collisions or gaps
//! - Build parameters (chain id, nonce, gas limit, gas price) and sign locally
//! - Broadcast, re-sending the same payload after connection failures and
//!   re-signing with a fresh nonce only after an explicit stale-nonce rejection
//! - Wait for the receipt with a bounded timeout
//!
//! # Concurrency
//! Nonce acquisition through broadcast runs under a per-sender async mutex.
//! The receipt wait happens after the lock is released, so concurrent writes
//! queue only for the broadcast and confirm in parallel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::blockchain::connector::ChainConnector;
use crate::blockchain::types::{
    ChainConfig, ChainError, ChainResult, PendingTransaction, SubmissionOutcome, TxParams,
    UnsignedCall,
};
use crate::blockchain::wallet::Wallet;
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::{is_ambiguous_broadcast, is_retryable_broadcast, is_stale_nonce};

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// How the submitter prices and confirms transactions.
#[derive(Debug, Clone)]
pub struct TxPolicy {
    pub gas_limit: u64,
    /// Fixed gas price in wei; `None` asks the node.
    pub fixed_gas_price: Option<u128>,
    pub gas_price_multiplier: f64,
    pub max_gas_price_gwei: u64,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub max_broadcast_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl TxPolicy {
    pub fn from_config(chain: &ChainConfig, retries: &RetryConfig) -> Self {
        Self {
            gas_limit: chain.gas_limit,
            fixed_gas_price: chain.gas_price_gwei.map(|g| g as u128 * WEI_PER_GWEI),
            gas_price_multiplier: chain.gas_price_multiplier,
            max_gas_price_gwei: chain.max_gas_price_gwei,
            confirmation_timeout: Duration::from_secs(chain.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(chain.receipt_poll_interval_ms),
            max_broadcast_attempts: chain.max_broadcast_attempts.max(1),
            backoff_base_ms: retries.base_delay_ms,
            backoff_max_ms: retries.max_delay_ms,
        }
    }
}

/// Per-sender nonce bookkeeping, guarded by the sender's mutex.
#[derive(Debug, Default)]
struct SenderState {
    /// Nonce after the last successful broadcast from this process.
    next_nonce: Option<u64>,
}

/// Converts unsigned calls into confirmed on-chain effects.
#[derive(Clone)]
pub struct TxSubmitter {
    chain: Arc<dyn ChainConnector>,
    wallet: Wallet,
    policy: TxPolicy,
    senders: Arc<DashMap<Address, Arc<Mutex<SenderState>>>>,
}

impl TxSubmitter {
    pub fn new(chain: Arc<dyn ChainConnector>, wallet: Wallet, policy: TxPolicy) -> Self {
        Self {
            chain,
            wallet,
            policy,
            senders: Arc::new(DashMap::new()),
        }
    }

    /// Address transactions are sent from.
    pub fn sender(&self) -> Address {
        self.wallet.address()
    }

    /// Sign, broadcast and wait for `call`.
    ///
    /// A receipt wait that times out yields `SubmissionOutcome::Unconfirmed`,
    /// never an error: the transaction was broadcast and may still be mined.
    pub async fn submit(&self, call: UnsignedCall) -> ChainResult<SubmissionOutcome> {
        let started = Instant::now();
        let pending = self.broadcast(&call).await?;

        tracing::info!(
            function = %call.function,
            tx_hash = %pending.hash,
            nonce = pending.params.nonce,
            "Transaction broadcast"
        );

        let outcome = match self
            .chain
            .wait_for_receipt(pending.hash, self.policy.confirmation_timeout, self.policy.poll_interval)
            .await
        {
            Ok(receipt) => SubmissionOutcome::Confirmed(receipt),
            Err(e) => {
                tracing::warn!(
                    function = %call.function,
                    tx_hash = %pending.hash,
                    error = %e,
                    "No receipt within confirmation timeout"
                );
                SubmissionOutcome::Unconfirmed { tx_hash: pending.hash }
            }
        };

        metrics::record_transaction(outcome.label(), started);
        tracing::info!(
            function = %call.function,
            tx_hash = %outcome.tx_hash(),
            outcome = outcome.label(),
            "Transaction finished"
        );
        Ok(outcome)
    }

    /// Nonce, parameters, signature and broadcast, serialized per sender.
    ///
    /// A connection failure or timeout re-sends the same signed payload. Only
    /// an explicit stale-nonce rejection of a payload that never reached the
    /// node is re-signed with a fresh nonce, so one call lands at most once.
    async fn broadcast(&self, call: &UnsignedCall) -> ChainResult<PendingTransaction> {
        let sender = self.wallet.address();
        let lock = self
            .senders
            .entry(sender)
            .or_insert_with(|| Arc::new(Mutex::new(SenderState::default())))
            .clone();
        let mut state = lock.lock().await;

        let params = self.prepare(sender, &state).await?;
        let mut pending = self.wallet.sign_call(call, params).await?;
        // Set once a send of the current payload ended without a verdict.
        let mut maybe_delivered = false;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let error = match self.chain.broadcast(&pending).await {
                Ok(hash) => {
                    if hash != pending.hash {
                        tracing::warn!(expected = %pending.hash, returned = %hash, "Node returned unexpected transaction hash");
                    }
                    state.next_nonce = Some(pending.params.nonce + 1);
                    return Ok(pending);
                }
                Err(e) => e,
            };

            if maybe_delivered && is_stale_nonce(&error) {
                // The slot may be held by this very payload; the receipt wait decides.
                tracing::warn!(
                    function = %call.function,
                    tx_hash = %pending.hash,
                    nonce = pending.params.nonce,
                    error = %error,
                    "Nonce taken after an unanswered send, treating transaction as broadcast"
                );
                state.next_nonce = Some(pending.params.nonce + 1);
                return Ok(pending);
            }

            maybe_delivered |= is_ambiguous_broadcast(&error);

            if attempt >= self.policy.max_broadcast_attempts || !is_retryable_broadcast(&error) {
                state.next_nonce = None;
                if maybe_delivered {
                    tracing::warn!(
                        function = %call.function,
                        tx_hash = %pending.hash,
                        attempt,
                        error = %error,
                        "Broadcast unanswered, transaction may still be pending"
                    );
                    return Ok(pending);
                }
                return Err(error);
            }

            let delay = calculate_backoff(attempt, self.policy.backoff_base_ms, self.policy.backoff_max_ms);
            if maybe_delivered {
                tracing::warn!(
                    function = %call.function,
                    attempt,
                    nonce = pending.params.nonce,
                    delay = ?delay,
                    error = %error,
                    "Broadcast unanswered, re-sending signed transaction"
                );
                tokio::time::sleep(delay).await;
            } else {
                // Rejected outright: the node never held this payload.
                state.next_nonce = None;
                tracing::warn!(
                    function = %call.function,
                    attempt,
                    nonce = pending.params.nonce,
                    delay = ?delay,
                    error = %error,
                    "Broadcast rejected, retrying with fresh nonce"
                );
                tokio::time::sleep(delay).await;
                let params = self.prepare(sender, &state).await?;
                pending = self.wallet.sign_call(call, params).await?;
            }
        }
    }

    /// Nonce and gas parameters. Any failure here is a `Preparation` error.
    async fn prepare(&self, sender: Address, state: &SenderState) -> ChainResult<TxParams> {
        let chain_nonce = self
            .chain
            .get_pending_nonce(sender)
            .await
            .map_err(|e| ChainError::Preparation(format!("nonce lookup failed: {}", e)))?;

        // A lagging node can report a pending count below what this process
        // already broadcast; the local counter wins in that case.
        let nonce = match state.next_nonce {
            Some(local) if local > chain_nonce => {
                tracing::debug!(chain_nonce, local_nonce = local, "Node pending nonce behind local counter");
                local
            }
            _ => chain_nonce,
        };

        Ok(TxParams {
            chain_id: self.wallet.chain_id(),
            nonce,
            gas_limit: self.policy.gas_limit,
            gas_price: self.gas_price().await?,
        })
    }

    async fn gas_price(&self) -> ChainResult<u128> {
        if let Some(price) = self.policy.fixed_gas_price {
            return Ok(price);
        }

        let node_price = self
            .chain
            .get_gas_price()
            .await
            .map_err(|e| ChainError::Preparation(format!("gas price lookup failed: {}", e)))?;

        let adjusted = (node_price as f64 * self.policy.gas_price_multiplier) as u128;
        let adjusted_gwei = adjusted / WEI_PER_GWEI;
        if adjusted_gwei > self.policy.max_gas_price_gwei as u128 {
            return Err(ChainError::GasPriceTooHigh {
                current_gwei: adjusted_gwei as u64,
                max_gwei: self.policy.max_gas_price_gwei,
            });
        }
        Ok(adjusted)
    }
}

impl std::fmt::Debug for TxSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSubmitter")
            .field("sender", &self.wallet.address())
            .field("policy", &self.policy)
            .finish()
    }
}
