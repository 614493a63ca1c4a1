//! Contract binding errors.

use thiserror::Error;

use crate::blockchain::types::ChainError;

/// Errors raised by the contract binding.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The interface definition failed to load at startup.
    #[error("contract unavailable: {0}")]
    Unavailable(String),

    /// The ABI has no function with this name and arity.
    #[error("unknown contract function '{0}'")]
    UnknownFunction(String),

    /// Arguments do not fit the declared parameter types.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Call result did not match the declared outputs.
    #[error("could not decode result of '{function}': {reason}")]
    Decode { function: String, reason: String },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type ContractResult<T> = Result<T, ContractError>;
