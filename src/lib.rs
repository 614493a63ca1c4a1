//! CredChain registry gateway library.
//!
//! Builds, signs and submits registry transactions (projects, reviews, user
//! verification) and reads project records back from the contract.

pub mod blockchain;
pub mod config;
pub mod contract;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::{build_router, AppState, GatewayServer};
pub use lifecycle::Shutdown;
pub use registry::Registry;
