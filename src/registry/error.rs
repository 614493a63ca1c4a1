//! Registry error taxonomy.
//!
//! Errors keep the layer they came from so callers can tell bad input from
//! a chain rejection from an unreachable chain.

use thiserror::Error;

use crate::blockchain::types::ChainError;
use crate::contract::types::ContractError;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required request field is absent or empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but malformed (bad address, out-of-range rating, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The known-builder list could not be read.
    #[error("builder index unavailable: {0}")]
    BuilderIndex(String),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    /// True when the caller's input is at fault and nothing was attempted.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            RegistryError::MissingField(_)
                | RegistryError::InvalidArgument(_)
                | RegistryError::Contract(ContractError::InvalidArgument(_))
        )
    }

    /// Component the failure originated in.
    pub fn origin(&self) -> &'static str {
        match self {
            RegistryError::MissingField(_) | RegistryError::InvalidArgument(_) => "input",
            RegistryError::BuilderIndex(_) => "builders",
            RegistryError::Contract(ContractError::InvalidArgument(_)) => "input",
            RegistryError::Contract(ContractError::Chain(_)) | RegistryError::Chain(_) => "chain",
            RegistryError::Contract(_) => "contract",
        }
    }
}
