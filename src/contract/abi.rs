//! ABI file loading.
//!
//! Accepted layouts:
//! - a bare ABI array
//! - an artifact object with an `abi` key (Foundry, Hardhat); the value may
//!   itself be a JSON string
//! - solc combined output, `contracts.<source>.<name>.abi`, or the
//!   `contracts["<source>:<name>"].abi` form of `--combined-json`

use std::path::Path;

use alloy::json_abi::JsonAbi;
use serde_json::Value;

use crate::contract::types::{ContractError, ContractResult};

/// Which contract to pick out of a multi-contract compiler output.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSelector<'a> {
    pub source_name: Option<&'a str>,
    pub contract_name: Option<&'a str>,
}

/// Read and parse the ABI at `path`.
pub fn load_abi(path: &Path, selector: &ArtifactSelector<'_>) -> ContractResult<JsonAbi> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ContractError::Unavailable(format!("cannot read ABI file {}: {}", path.display(), e))
    })?;
    parse_abi(&content, selector)
}

/// Parse ABI text in any of the accepted layouts.
pub fn parse_abi(content: &str, selector: &ArtifactSelector<'_>) -> ContractResult<JsonAbi> {
    let root: Value = serde_json::from_str(content)
        .map_err(|e| ContractError::Unavailable(format!("ABI file is not JSON: {}", e)))?;

    let abi = locate_abi(root, selector)?;
    let abi = match abi {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| ContractError::Unavailable(format!("embedded ABI string is not JSON: {}", e)))?,
        other => other,
    };

    serde_json::from_value(abi)
        .map_err(|e| ContractError::Unavailable(format!("malformed ABI: {}", e)))
}

fn locate_abi(root: Value, selector: &ArtifactSelector<'_>) -> ContractResult<Value> {
    let mut root = match root {
        Value::Array(_) => return Ok(root),
        Value::Object(map) => map,
        _ => return Err(ContractError::Unavailable("ABI file must be an array or object".into())),
    };

    if let Some(abi) = root.remove("abi") {
        return Ok(abi);
    }

    let contracts = match root.remove("contracts") {
        Some(Value::Object(contracts)) => contracts,
        _ => {
            return Err(ContractError::Unavailable(
                "ABI file has neither an `abi` nor a `contracts` key".into(),
            ))
        }
    };

    // Flatten both solc layouts into ("source:name", artifact) pairs.
    let mut candidates: Vec<(String, Value)> = Vec::new();
    for (key, value) in contracts {
        match value {
            Value::Object(mut entry) if entry.contains_key("abi") => {
                candidates.push((key, entry.remove("abi").unwrap_or(Value::Null)));
            }
            Value::Object(entries) => {
                for (name, mut artifact) in entries {
                    if let Some(abi) = artifact.get_mut("abi").map(Value::take) {
                        candidates.push((format!("{}:{}", key, name), abi));
                    }
                }
            }
            _ => {}
        }
    }

    let wanted = |qualified: &str| {
        let (source, name) = qualified.rsplit_once(':').unwrap_or(("", qualified));
        selector.source_name.map_or(true, |s| s == source)
            && selector.contract_name.map_or(true, |n| n == name)
    };
    let mut matching: Vec<(String, Value)> =
        candidates.into_iter().filter(|(key, _)| wanted(key)).collect();

    match matching.len() {
        1 => Ok(matching.remove(0).1),
        0 => Err(ContractError::Unavailable(
            "no contract in compiler output matches the configured source/name".into(),
        )),
        _ => {
            let names: Vec<_> = matching.iter().map(|(k, _)| k.as_str()).collect();
            Err(ContractError::Unavailable(format!(
                "compiler output holds several contracts ({}); set contract.contract_name",
                names.join(", ")
            )))
        }
    }
}
