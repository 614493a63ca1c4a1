//! Registry domain subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → operations.rs (validate, encode, submit or read)
//!         writes → reachability.rs (verify_user only) → TxSubmitter
//!         reads  → ContractBinding::read → types.rs (tuple → Project)
//!         client reads → builders.rs (known-builder list, per-builder scan)
//! ```
//!
//! # Design Decisions
//! - Validation failures never cause network I/O
//! - A failed profile link check is a negative result, not an error
//! - The client scan skips unreadable builders and reports them

pub mod builders;
pub mod error;
pub mod hashing;
pub mod operations;
pub mod reachability;
pub mod types;

pub use builders::{BuilderIndex, JsonFileBuilderIndex};
pub use error::{RegistryError, RegistryResult};
pub use operations::Registry;
pub use reachability::{HttpLinkChecker, LinkChecker};
pub use types::{
    ClientScan, Project, ProjectWithOrigin, SkippedBuilder, SubmitProjectRequest, SubmitReviewRequest,
    VerifyOutcome, VerifyUserRequest, WriteOutcome,
};
