//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//! - Signing happens in-process; only the signed payload leaves

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{ChainError, ChainResult, PendingTransaction, TxParams, UnsignedCall};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "CREDCHAIN_SIGNER_PRIVATE_KEY";

/// Process-wide signer, immutable once loaded.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> ChainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let mut signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Signing(format!("Invalid private key format: {}", e)))?;
        signer.set_chain_id(Some(chain_id));

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self { signer, chain_id })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `CREDCHAIN_SIGNER_PRIVATE_KEY`. An unset or empty variable is
    /// `Ok(None)`; a malformed key is an error.
    pub fn from_env(chain_id: u64) -> ChainResult<Option<Self>> {
        match std::env::var(PRIVATE_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => Self::from_private_key(&key, chain_id).map(Some),
            _ => Ok(None),
        }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Build and sign a legacy transaction invoking `call`.
    ///
    /// The returned payload is EIP-2718 encoded and ready for
    /// `eth_sendRawTransaction`; its hash is known before broadcast.
    pub async fn sign_call(
        &self,
        call: &UnsignedCall,
        params: TxParams,
    ) -> ChainResult<PendingTransaction> {
        if params.chain_id != self.chain_id {
            return Err(ChainError::ChainMismatch {
                expected: self.chain_id,
                actual: params.chain_id,
            });
        }

        let tx = TxLegacy {
            chain_id: Some(params.chain_id),
            nonce: params.nonce,
            gas_price: params.gas_price,
            gas_limit: params.gas_limit,
            to: TxKind::Call(call.to),
            value: U256::ZERO,
            input: call.data.clone(),
        };

        let signature = self
            .signer
            .sign_hash(&tx.signature_hash())
            .await
            .map_err(|e| ChainError::Signing(format!("Signing failed: {}", e)))?;

        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let envelope = TxEnvelope::Legacy(signed);

        Ok(PendingTransaction {
            params,
            raw: Bytes::from(envelope.encoded_2718()),
            hash,
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
