//! Contract binding subsystem.
//!
//! # Data Flow
//! ```text
//! ABI file (loaded once at startup)
//!     → abi.rs (layout detection, JsonAbi)
//!     → binding.rs (address + ABI)
//!         read(fn, args)    → eth_call via ChainConnector → decoded values
//!         prepare(fn, args) → UnsignedCall → TxSubmitter
//! ```
//!
//! # Design Decisions
//! - A missing or malformed ABI never stops startup; the binding reports
//!   `Unavailable` to every caller instead
//! - Types are resolved structurally, so struct names in `internalType` do not matter

pub mod abi;
pub mod binding;
pub mod types;

pub use binding::ContractBinding;
pub use types::{ContractError, ContractResult};
