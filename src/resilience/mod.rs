//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Broadcast of a signed transaction:
//!     → retries.rs (is this failure worth another attempt?)
//!     → backoff.rs (how long to wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Every RPC call has a deadline (enforced in the blockchain client)
//! - Only connection failures and stale-nonce rejections are retried
//! - An unanswered send is retried with the same signed payload, never re-signed
//! - Signing and validation failures are never retried
//! - Jittered backoff prevents synchronized retries

pub mod backoff;
pub mod retries;
