//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment variable (private key)   config (RPC URL, chain id, gas)
//!     → wallet.rs (key loading, signing)    → client.rs (RPC with failover + timeouts)
//!                     ↘                    ↙
//!                 transaction.rs (nonce, sign, broadcast, confirm)
//! ```
//!
//! `connector.rs` holds the `ChainConnector` trait that `client.rs`
//! implements; nothing above this module depends on alloy providers directly.
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or signed payloads
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod connector;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use connector::ChainConnector;
pub use transaction::{TxPolicy, TxSubmitter};
pub use types::{
    ChainError, ChainId, ChainResult, PendingTransaction, ReceiptSummary, SubmissionOutcome,
    TxParams, UnsignedCall,
};
pub use wallet::Wallet;
