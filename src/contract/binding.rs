//! Contract binding: a deployed address plus its interface definition.
//!
//! # Responsibilities
//! - Resolve functions by name and arity
//! - Coerce and validate arguments against declared parameter types
//! - `read`: encode, `eth_call`, decode
//! - `prepare`: encode into an `UnsignedCall` for the submitter
//!
//! A binding whose ABI failed to load still exists; every operation on it
//! returns `ContractError::Unavailable`.

use std::path::Path;
use std::sync::Arc;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::json_abi::{Function, JsonAbi, Param};
use alloy::primitives::{Address, Bytes};

use crate::blockchain::connector::ChainConnector;
use crate::blockchain::types::UnsignedCall;
use crate::config::ContractConfig;
use crate::contract::abi::{load_abi, ArtifactSelector};
use crate::contract::types::{ContractError, ContractResult};

#[derive(Debug)]
enum AbiState {
    Loaded(JsonAbi),
    Unavailable(String),
}

/// Callable view of the registry contract.
#[derive(Clone)]
pub struct ContractBinding {
    address: Address,
    abi: Arc<AbiState>,
    chain: Arc<dyn ChainConnector>,
}

impl ContractBinding {
    pub fn new(address: Address, abi: JsonAbi, chain: Arc<dyn ChainConnector>) -> Self {
        Self {
            address,
            abi: Arc::new(AbiState::Loaded(abi)),
            chain,
        }
    }

    /// A binding that rejects every operation with `reason`.
    pub fn unavailable(address: Address, reason: impl Into<String>, chain: Arc<dyn ChainConnector>) -> Self {
        Self {
            address,
            abi: Arc::new(AbiState::Unavailable(reason.into())),
            chain,
        }
    }

    /// Build from configuration. Load failures are logged and produce an
    /// unavailable binding rather than an error.
    pub fn from_config(config: &ContractConfig, chain: Arc<dyn ChainConnector>) -> Self {
        let address = match config.address.parse::<Address>() {
            Ok(address) => address,
            Err(e) => {
                let reason = format!("invalid contract address '{}': {}", config.address, e);
                tracing::error!(%reason, "Contract binding unavailable");
                return Self::unavailable(Address::ZERO, reason, chain);
            }
        };

        let selector = ArtifactSelector {
            source_name: config.source_name.as_deref(),
            contract_name: config.contract_name.as_deref(),
        };
        match load_abi(Path::new(&config.abi_path), &selector) {
            Ok(abi) => {
                tracing::info!(
                    address = %address,
                    abi_path = %config.abi_path,
                    functions = abi.functions().count(),
                    "Contract ABI loaded"
                );
                Self::new(address, abi, chain)
            }
            Err(e) => {
                tracing::error!(abi_path = %config.abi_path, error = %e, "Contract binding unavailable");
                Self::unavailable(address, e.to_string(), chain)
            }
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_available(&self) -> bool {
        matches!(*self.abi, AbiState::Loaded(_))
    }

    /// Pure call: no state change, no gas, no signature.
    pub async fn read(&self, function: &str, args: Vec<DynSolValue>) -> ContractResult<Vec<DynSolValue>> {
        let (func, data) = self.encode(function, args)?;
        let output = self.chain.call(self.address, data).await?;
        decode_output(func, &output)
    }

    /// Encode an invocation for the transaction submitter. Does not send.
    pub fn prepare(&self, function: &str, args: Vec<DynSolValue>) -> ContractResult<UnsignedCall> {
        let (func, data) = self.encode(function, args)?;
        Ok(UnsignedCall {
            to: self.address,
            function: func.name.clone(),
            data,
        })
    }

    fn abi(&self) -> ContractResult<&JsonAbi> {
        match &*self.abi {
            AbiState::Loaded(abi) => Ok(abi),
            AbiState::Unavailable(reason) => Err(ContractError::Unavailable(reason.clone())),
        }
    }

    fn encode(&self, function: &str, args: Vec<DynSolValue>) -> ContractResult<(&Function, Bytes)> {
        let overloads = self
            .abi()?
            .function(function)
            .ok_or_else(|| ContractError::UnknownFunction(function.to_string()))?;

        let func = overloads
            .iter()
            .find(|f| f.inputs.len() == args.len())
            .ok_or_else(|| {
                let arities: Vec<String> = overloads.iter().map(|f| f.inputs.len().to_string()).collect();
                ContractError::InvalidArgument(format!(
                    "{} takes {} argument(s), got {}",
                    function,
                    arities.join(" or "),
                    args.len()
                ))
            })?;

        let types = param_types(&func.inputs).map_err(|reason| ContractError::Decode {
            function: func.name.clone(),
            reason,
        })?;

        let mut coerced = Vec::with_capacity(args.len());
        for ((param, ty), arg) in func.inputs.iter().zip(&types).zip(args) {
            let label = if param.name.is_empty() { "argument" } else { param.name.as_str() };
            coerced.push(coerce(ty, arg, label).map_err(ContractError::InvalidArgument)?);
        }

        let mut data = func.selector().to_vec();
        data.extend_from_slice(&DynSolValue::Tuple(coerced).abi_encode_params());
        Ok((func, Bytes::from(data)))
    }
}

impl std::fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractBinding")
            .field("address", &self.address)
            .field("available", &self.is_available())
            .finish()
    }
}

/// Structural types of `params`, ignoring `internalType` struct names.
pub fn param_types(params: &[Param]) -> Result<Vec<DynSolType>, String> {
    params
        .iter()
        .map(|p| {
            let selector_type = p.selector_type();
            DynSolType::parse(&selector_type).map_err(|e| format!("bad ABI type '{}': {}", selector_type, e))
        })
        .collect()
}

fn decode_output(func: &Function, output: &[u8]) -> ContractResult<Vec<DynSolValue>> {
    let decode_err = |reason: String| ContractError::Decode {
        function: func.name.clone(),
        reason,
    };

    let types = param_types(&func.outputs).map_err(decode_err)?;
    match DynSolType::Tuple(types).abi_decode_sequence(output) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(_) => Err(decode_err("expected a tuple of outputs".to_string())),
        Err(e) => Err(decode_err(e.to_string())),
    }
}

/// Fit `value` to `ty`, or explain why it cannot.
///
/// Integers are re-tagged to the declared width after a range check, strings
/// are parsed into the declared type, and tuples/arrays are coerced element-wise.
fn coerce(ty: &DynSolType, value: DynSolValue, label: &str) -> Result<DynSolValue, String> {
    if ty.matches(&value) {
        return Ok(value);
    }

    match (ty, value) {
        (DynSolType::Uint(bits), DynSolValue::Uint(v, _)) => {
            if v.bit_len() > *bits {
                Err(format!("{}: {} does not fit in uint{}", label, v, bits))
            } else {
                Ok(DynSolValue::Uint(v, *bits))
            }
        }
        (DynSolType::Int(bits), DynSolValue::Int(v, _)) => {
            if v.bits() as usize > *bits {
                Err(format!("{}: {} does not fit in int{}", label, v, bits))
            } else {
                Ok(DynSolValue::Int(v, *bits))
            }
        }
        (DynSolType::Tuple(types), DynSolValue::Tuple(values)) if types.len() == values.len() => types
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (t, v))| coerce(t, v, &format!("{}.{}", label, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Tuple),
        (DynSolType::Array(inner), DynSolValue::Array(values)) => values
            .into_iter()
            .enumerate()
            .map(|(i, v)| coerce(inner, v, &format!("{}[{}]", label, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (_, DynSolValue::String(text)) => ty
            .coerce_str(&text)
            .map_err(|e| format!("{}: '{}' is not a valid {}: {}", label, text, ty, e)),
        (_, other) => Err(format!(
            "{}: expected {}, got {}",
            label,
            ty,
            other
                .sol_type_name()
                .map(|n| n.into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::{ChainResult, ReceiptSummary};
    use alloy::primitives::{TxHash, U256};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ABI: &str = r#"[
        {"type":"function","name":"submitReview","stateMutability":"nonpayable","outputs":[],
         "inputs":[{"name":"freelancer","type":"address"},{"name":"projectIndex","type":"uint256"},
                   {"name":"rating","type":"uint8"},{"name":"commentHash","type":"string"}]},
        {"type":"function","name":"projectCount","stateMutability":"view",
         "inputs":[{"name":"freelancer","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]}
    ]"#;

    /// Answers every eth_call with a fixed payload and records calldata.
    #[derive(Default)]
    struct EchoChain {
        response: Vec<u8>,
        calls: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl ChainConnector for EchoChain {
        fn chain_id(&self) -> u64 {
            1287
        }
        async fn get_balance(&self, _a: Address) -> ChainResult<U256> {
            Ok(U256::ZERO)
        }
        async fn get_pending_nonce(&self, _a: Address) -> ChainResult<u64> {
            Ok(0)
        }
        async fn get_gas_price(&self) -> ChainResult<u128> {
            Ok(0)
        }
        async fn get_block_number(&self) -> ChainResult<u64> {
            Ok(0)
        }
        async fn call(&self, _to: Address, data: Bytes) -> ChainResult<Bytes> {
            self.calls.lock().unwrap().push(data);
            Ok(Bytes::from(self.response.clone()))
        }
        async fn send_raw_transaction(&self, _raw: Bytes) -> ChainResult<TxHash> {
            Ok(TxHash::ZERO)
        }
        async fn get_receipt(&self, _h: TxHash) -> ChainResult<Option<ReceiptSummary>> {
            Ok(None)
        }
    }

    fn binding(chain: Arc<EchoChain>) -> ContractBinding {
        let abi: JsonAbi = serde_json::from_str(ABI).unwrap();
        ContractBinding::new(Address::repeat_byte(0xcc), abi, chain)
    }

    fn review_args(rating: u64) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(Address::repeat_byte(0xaa)),
            DynSolValue::Uint(U256::from(0), 256),
            DynSolValue::Uint(U256::from(rating), 256),
            DynSolValue::String("ipfs://comment".into()),
        ]
    }

    #[test]
    fn test_prepare_narrows_integers() {
        let binding = binding(Arc::new(EchoChain::default()));
        let call = binding.prepare("submitReview", review_args(5)).unwrap();

        let abi = serde_json::from_str::<JsonAbi>(ABI).unwrap();
        let func = &abi.function("submitReview").unwrap()[0];
        assert_eq!(&call.data[..4], func.selector().as_slice());
        assert_eq!(call.to, Address::repeat_byte(0xcc));
        assert_eq!(call.function, "submitReview");
    }

    #[test]
    fn test_out_of_range_integer() {
        let binding = binding(Arc::new(EchoChain::default()));
        let err = binding.prepare("submitReview", review_args(300)).unwrap_err();
        assert!(matches!(err, ContractError::InvalidArgument(ref m) if m.contains("rating")));
    }

    #[test]
    fn test_arity_mismatch() {
        let binding = binding(Arc::new(EchoChain::default()));
        let mut args = review_args(4);
        args.pop();
        let err = binding.prepare("submitReview", args).unwrap_err();
        assert!(matches!(err, ContractError::InvalidArgument(ref m) if m.contains("takes 4")));
    }

    #[test]
    fn test_string_coerced_to_address() {
        let binding = binding(Arc::new(EchoChain::default()));
        let mut args = review_args(3);
        args[0] = DynSolValue::String("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".into());
        assert!(binding.prepare("submitReview", args).is_ok());

        let mut args = review_args(3);
        args[0] = DynSolValue::String("0x1234".into());
        assert!(matches!(
            binding.prepare("submitReview", args),
            Err(ContractError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_wrong_type() {
        let binding = binding(Arc::new(EchoChain::default()));
        let mut args = review_args(3);
        args[1] = DynSolValue::Bool(true);
        assert!(matches!(
            binding.prepare("submitReview", args),
            Err(ContractError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_function() {
        let binding = binding(Arc::new(EchoChain::default()));
        assert!(matches!(
            binding.prepare("deleteProject", vec![]),
            Err(ContractError::UnknownFunction(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_binding_rejects_everything() {
        let chain = Arc::new(EchoChain::default());
        let binding = ContractBinding::unavailable(Address::ZERO, "ABI missing", chain.clone());

        assert!(!binding.is_available());
        assert!(matches!(binding.prepare("submitReview", review_args(1)), Err(ContractError::Unavailable(_))));
        assert!(matches!(binding.read("projectCount", vec![]).await, Err(ContractError::Unavailable(_))));
        assert!(chain.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_decodes_outputs() {
        let response = DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(3), 256)]).abi_encode_params();
        let chain = Arc::new(EchoChain {
            response,
            ..Default::default()
        });
        let binding = binding(chain.clone());

        let values = binding
            .read("projectCount", vec![DynSolValue::Address(Address::repeat_byte(1))])
            .await
            .unwrap();
        assert_eq!(values, vec![DynSolValue::Uint(U256::from(3), 256)]);
        assert_eq!(chain.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_rejects_garbage() {
        let chain = Arc::new(EchoChain {
            response: vec![1, 2, 3],
            ..Default::default()
        });
        let err = binding(chain)
            .read("projectCount", vec![DynSolValue::Address(Address::ZERO)])
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Decode { .. }));
    }

    #[test]
    fn test_from_config_with_missing_abi() {
        let config = ContractConfig {
            abi_path: "/no/such/file.json".to_string(),
            ..ContractConfig::default()
        };
        let binding = ContractBinding::from_config(&config, Arc::new(EchoChain::default()));
        assert!(!binding.is_available());
    }
}
