//! Content hash bound into each project record.
//!
//! The digest covers the link string itself, not the content behind it.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `link`, without a `0x` prefix.
pub fn content_hash(link: &str) -> String {
    hex::encode(Sha256::digest(link.as_bytes()))
}
