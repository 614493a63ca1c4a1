//! Retry classification for transaction broadcast.
//!
//! # Design Decisions
//! - A connection failure or timeout may have reached the node. The retry
//!   re-sends the same signed payload, so a node that already accepted it
//!   answers "already known" instead of storing the write twice
//! - "nonce too low" and underpriced replacement mean another transaction
//!   holds the slot. Re-signing with a fresh nonce resolves it, unless an
//!   earlier send of this payload may be the one holding it
//! - Everything else the node says (insufficient funds, reverts in gas
//!   estimation, malformed payload) is final

use crate::blockchain::types::ChainError;

const STALE_NONCE_MARKERS: &[&str] = &[
    "nonce too low",
    "replacement transaction underpriced",
    "transaction underpriced",
];

/// Whether a failed broadcast should be attempted again.
pub fn is_retryable_broadcast(err: &ChainError) -> bool {
    is_ambiguous_broadcast(err) || is_stale_nonce(err)
}

/// The payload may or may not have reached the node.
pub fn is_ambiguous_broadcast(err: &ChainError) -> bool {
    matches!(err, ChainError::Connection(_) | ChainError::Timeout(_))
}

/// The node rejected the payload because its nonce slot is taken.
pub fn is_stale_nonce(err: &ChainError) -> bool {
    match err {
        ChainError::Rpc(message) => {
            let message = message.to_ascii_lowercase();
            STALE_NONCE_MARKERS.iter().any(|m| message.contains(m))
        }
        _ => false,
    }
}
