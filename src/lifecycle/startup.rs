//! Startup orchestration.
//!
//! Subsystems initialize in dependency order: chain client, contract binding,
//! signer and submitter, then the registry. A missing ABI or signer degrades
//! the gateway instead of stopping it; a signer that does not match the
//! configured sender address is fatal.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use thiserror::Error;

use crate::blockchain::{BlockchainClient, ChainConnector, ChainError, TxPolicy, TxSubmitter, Wallet};
use crate::config::GatewayConfig;
use crate::contract::ContractBinding;
use crate::http::AppState;
use crate::registry::{HttpLinkChecker, JsonFileBuilderIndex, Registry};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("expected_sender '{0}' is not an address")]
    InvalidExpectedSender(String),

    #[error("signer address {actual} does not match expected_sender {expected}")]
    SignerMismatch { expected: Address, actual: Address },

    #[error("cannot build profile link client: {0}")]
    LinkChecker(#[from] reqwest::Error),
}

/// Build the shared application state from validated configuration.
pub async fn initialize(config: &GatewayConfig) -> Result<AppState, StartupError> {
    let client = BlockchainClient::new(config.chain.clone())?;
    if let Err(e) = client.verify_chain_id().await {
        tracing::warn!(error = %e, "Could not confirm chain id; continuing with configured value");
    }
    let chain: Arc<dyn ChainConnector> = Arc::new(client);

    let binding = ContractBinding::from_config(&config.contract, chain.clone());

    let submitter = match Wallet::from_env(config.chain.chain_id)? {
        Some(wallet) => {
            check_expected_sender(config.chain.expected_sender.as_deref(), wallet.address())?;
            let policy = TxPolicy::from_config(&config.chain, &config.retries);
            Some(TxSubmitter::new(chain.clone(), wallet, policy))
        }
        None => {
            tracing::warn!("No signer key configured; write operations are disabled");
            None
        }
    };

    let links = HttpLinkChecker::new(Duration::from_secs(config.verification.reachability_timeout_secs))?;
    let registry = Registry::new(
        binding,
        submitter,
        Arc::new(JsonFileBuilderIndex::new(&config.builders.path)),
        Arc::new(links),
        config.builders.scan_concurrency,
    );

    tracing::info!(
        contract_loaded = registry.binding().is_available(),
        signer = ?registry.signer(),
        builders_path = %config.builders.path,
        "Registry initialized"
    );

    Ok(AppState {
        registry: Arc::new(registry),
        chain,
    })
}

fn check_expected_sender(expected: Option<&str>, actual: Address) -> Result<(), StartupError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let expected: Address = expected
        .trim()
        .parse()
        .map_err(|_| StartupError::InvalidExpectedSender(expected.to_string()))?;
    if expected != actual {
        return Err(StartupError::SignerMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_sender() {
        let actual = Address::repeat_byte(0x11);
        assert!(check_expected_sender(None, actual).is_ok());
        assert!(check_expected_sender(Some("0x1111111111111111111111111111111111111111"), actual).is_ok());
        assert!(matches!(
            check_expected_sender(Some("0x2222222222222222222222222222222222222222"), actual),
            Err(StartupError::SignerMismatch { .. })
        ));
        assert!(matches!(
            check_expected_sender(Some("me"), actual),
            Err(StartupError::InvalidExpectedSender(_))
        ));
    }
}
