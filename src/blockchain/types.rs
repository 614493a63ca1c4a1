//! Chain-specific types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash};
use alloy::transports::{RpcError, TransportError};
use serde::Serialize;
use thiserror::Error;

pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The RPC endpoint could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The endpoint answered with a JSON-RPC error (nonce too low, insufficient funds, ...).
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request or receipt wait timed out.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Nonce or gas parameters could not be determined.
    #[error("transaction preparation failed: {0}")]
    Preparation(String),

    /// Gas price exceeded maximum allowed.
    #[error("gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Invalid private key, missing signer, or signing failure. Never retried.
    #[error("signing error: {0}")]
    Signing(String),

    /// Chain configuration mismatch.
    #[error("chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl ChainError {
    /// Classify an alloy transport error by whether the endpoint answered.
    pub fn from_transport(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => ChainError::Rpc(payload.to_string()),
            RpcError::Transport(kind) => ChainError::Connection(kind.to_string()),
            other => ChainError::Rpc(other.to_string()),
        }
    }

    /// Whether a different endpoint, or a later attempt, might succeed.
    pub fn is_connection(&self) -> bool {
        matches!(self, ChainError::Connection(_) | ChainError::Timeout(_))
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Receipt fields the gateway cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// False when the transaction was mined but reverted.
    pub success: bool,
    pub gas_used: u64,
}

/// An encoded contract invocation that has not been signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedCall {
    /// Contract address.
    pub to: Address,
    /// Function name, kept for logging.
    pub function: String,
    /// ABI-encoded calldata including the selector.
    pub data: Bytes,
}

/// Parameters of one signing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
}

/// A signed transaction owned by the submitter for one submit-and-confirm cycle.
#[derive(Clone)]
pub struct PendingTransaction {
    pub params: TxParams,
    /// EIP-2718 encoded signed payload.
    pub raw: Bytes,
    pub hash: TxHash,
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("params", &self.params)
            .field("hash", &self.hash)
            .field("raw_len", &self.raw.len())
            .finish()
    }
}

/// Final state of a submitted transaction as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Mined. `receipt.success` tells whether it executed or reverted.
    Confirmed(ReceiptSummary),
    /// Broadcast, but no receipt within the confirmation timeout. It may still land.
    Unconfirmed { tx_hash: TxHash },
}

impl SubmissionOutcome {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            SubmissionOutcome::Confirmed(receipt) => receipt.tx_hash,
            SubmissionOutcome::Unconfirmed { tx_hash } => *tx_hash,
        }
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Confirmed(r) if r.success => "confirmed",
            SubmissionOutcome::Confirmed(_) => "reverted",
            SubmissionOutcome::Unconfirmed { .. } => "unconfirmed",
        }
    }
}
