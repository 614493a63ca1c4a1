//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, gas limit > 0)
//! - Validate addresses and URLs before any subsystem starts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use alloy::primitives::Address;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }
    let write_budget = write_budget_secs(config);
    if config.listener.write_timeout_secs <= write_budget {
        errors.push(ValidationError::new(
            "listener.write_timeout_secs",
            format!(
                "{}s does not outlast a write's worst case of {}s (broadcast retries, link check, confirmation wait)",
                config.listener.write_timeout_secs, write_budget
            ),
        ));
    }

    let chain = &config.chain;
    match url::Url::parse(&chain.rpc_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => errors.push(ValidationError::new(
            "chain.rpc_url",
            format!("'{}' is not an http(s) URL", chain.rpc_url),
        )),
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be > 0"));
    }
    if chain.gas_limit == 0 {
        errors.push(ValidationError::new("chain.gas_limit", "must be > 0"));
    }
    if chain.gas_price_multiplier <= 0.0 {
        errors.push(ValidationError::new("chain.gas_price_multiplier", "must be positive"));
    }
    if chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.confirmation_timeout_secs", "must be > 0"));
    }
    if chain.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new("chain.receipt_poll_interval_ms", "must be > 0"));
    }
    if chain.max_broadcast_attempts == 0 {
        errors.push(ValidationError::new("chain.max_broadcast_attempts", "must be >= 1"));
    }
    if let Some(sender) = &chain.expected_sender {
        if sender.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                "chain.expected_sender",
                format!("'{}' is not an address", sender),
            ));
        }
    }

    if config.contract.address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "contract.address",
            format!("'{}' is not an address", config.contract.address),
        ));
    }

    if config.builders.scan_concurrency == 0 {
        errors.push(ValidationError::new("builders.scan_concurrency", "must be >= 1"));
    }
    if config.verification.reachability_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "verification.reachability_timeout_secs",
            "must be > 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Longest a write can take before the submitter itself gives up.
///
/// Every attempt may spend three RPC calls (nonce, gas price, send), each
/// trying every endpoint up to the RPC timeout, followed by a capped backoff.
/// One extra RPC slot covers the read some writes do first.
pub fn write_budget_secs(config: &GatewayConfig) -> u64 {
    let chain = &config.chain;
    let endpoints = 1 + chain.failover_urls.len() as u64;
    let rpc_call = chain.rpc_timeout_secs.saturating_mul(endpoints);
    let attempts = u64::from(chain.max_broadcast_attempts.max(1));
    let backoff = config.retries.max_delay_ms.div_ceil(1000);

    let broadcast = attempts
        .saturating_mul(rpc_call.saturating_mul(3))
        .saturating_add((attempts - 1).saturating_mul(backoff));

    broadcast
        .saturating_add(rpc_call)
        .saturating_add(config.verification.reachability_timeout_secs)
        .saturating_add(chain.confirmation_timeout_secs)
}
