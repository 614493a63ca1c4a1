//! Shared utilities for integration tests.
//!
//! `FakeChain` is an in-memory chain: it decodes signed raw transactions,
//! executes the registry ABI against in-memory state and answers `eth_call`.
//! `start_link_server` serves profile links with programmable statuses.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::eips::eip2718::Decodable2718;
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tempfile::NamedTempFile;

use credchain_gateway::blockchain::{
    ChainConnector, ChainError, ChainResult, ReceiptSummary, TxPolicy, TxSubmitter, Wallet,
};
use credchain_gateway::config::ListenerConfig;
use credchain_gateway::contract::binding::param_types;
use credchain_gateway::contract::ContractBinding;
use credchain_gateway::registry::{HttpLinkChecker, JsonFileBuilderIndex, Registry};
use credchain_gateway::{build_router, AppState};

pub const CHAIN_ID: u64 = 1287;

/// Anvil's first development key.
pub const SIGNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const REGISTRY_ABI: &str = include_str!("../../abi/CredChain.json");

pub fn contract_address() -> Address {
    Address::repeat_byte(0xcc)
}

/// Stored project tuple.
#[derive(Debug, Clone)]
pub struct StoredProject {
    pub client: Address,
    pub name: String,
    pub description: String,
    pub languages: String,
    pub hash: String,
    pub link: String,
    pub verified: bool,
    pub timestamp: u64,
}

impl StoredProject {
    fn to_value(&self) -> DynSolValue {
        DynSolValue::Tuple(vec![
            DynSolValue::Address(self.client),
            DynSolValue::String(self.name.clone()),
            DynSolValue::String(self.description.clone()),
            DynSolValue::String(self.languages.clone()),
            DynSolValue::String(self.hash.clone()),
            DynSolValue::String(self.link.clone()),
            DynSolValue::Bool(self.verified),
            DynSolValue::Uint(U256::from(self.timestamp), 256),
        ])
    }
}

#[derive(Debug, Default)]
struct ChainState {
    block: u64,
    /// Next expected nonce per sender, counting accepted transactions.
    nonces: HashMap<Address, u64>,
    projects: HashMap<Address, Vec<StoredProject>>,
    verified: HashSet<Address>,
    reviews: Vec<(Address, u64, u8, String)>,
    receipts: HashMap<TxHash, ReceiptSummary>,
    /// Hashes of every accepted transaction.
    known: HashSet<TxHash>,
    /// Nonces of accepted transactions in arrival order.
    accepted_nonces: Vec<u64>,
    /// `getAllProjects` reads per builder.
    reads: HashMap<Address, usize>,
}

/// In-memory registry chain.
pub struct FakeChain {
    sender: Address,
    abi: JsonAbi,
    state: Mutex<ChainState>,
    mining: AtomicBool,
    broadcasts: AtomicUsize,
    lost_replies: AtomicUsize,
    failing_builders: Mutex<HashSet<Address>>,
}

impl FakeChain {
    /// A chain that accepts transactions from `sender`.
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            abi: serde_json::from_str(REGISTRY_ABI).expect("bundled ABI parses"),
            state: Mutex::new(ChainState::default()),
            mining: AtomicBool::new(true),
            broadcasts: AtomicUsize::new(0),
            lost_replies: AtomicUsize::new(0),
            failing_builders: Mutex::new(HashSet::new()),
        }
    }

    /// When false, transactions are accepted but never mined.
    pub fn set_mining(&self, mining: bool) {
        self.mining.store(mining, Ordering::SeqCst);
    }

    /// Reads of `builder`'s projects fail with a connection error.
    pub fn fail_reads_for(&self, builder: Address) {
        self.failing_builders.lock().unwrap().insert(builder);
    }

    /// The next `count` accepted transactions answer with a connection
    /// error, as if the reply was lost on the way back.
    pub fn lose_broadcast_replies(&self, count: usize) {
        self.lost_replies.store(count, Ordering::SeqCst);
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    pub fn accepted_nonces(&self) -> Vec<u64> {
        self.state.lock().unwrap().accepted_nonces.clone()
    }

    pub fn reads_of(&self, builder: Address) -> usize {
        self.state.lock().unwrap().reads.get(&builder).copied().unwrap_or(0)
    }

    pub fn is_verified(&self, user: Address) -> bool {
        self.state.lock().unwrap().verified.contains(&user)
    }

    pub fn reviews(&self) -> Vec<(Address, u64, u8, String)> {
        self.state.lock().unwrap().reviews.clone()
    }

    /// Seed a project directly, bypassing transactions.
    pub fn seed_project(&self, freelancer: Address, client: Address, name: &str) {
        let mut state = self.state.lock().unwrap();
        let timestamp = 1_700_000_000 + state.block;
        state.projects.entry(freelancer).or_default().push(StoredProject {
            client,
            name: name.to_string(),
            description: format!("{} description", name),
            languages: "Rust".to_string(),
            hash: String::new(),
            link: format!("https://github.com/example/{}", name),
            verified: false,
            timestamp,
        });
    }

    fn function_for(&self, data: &[u8]) -> Result<&Function, String> {
        if data.len() < 4 {
            return Err("calldata shorter than a selector".to_string());
        }
        self.abi
            .functions()
            .find(|f| f.selector().as_slice() == &data[..4])
            .ok_or_else(|| "unknown selector".to_string())
    }

    fn decode_args(func: &Function, data: &[u8]) -> Result<Vec<DynSolValue>, String> {
        let types = param_types(&func.inputs)?;
        match DynSolType::Tuple(types).abi_decode_params(&data[4..]) {
            Ok(DynSolValue::Tuple(values)) => Ok(values),
            Ok(_) => Err("arguments are not a tuple".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Apply a transaction; `false` means it reverted.
    fn execute(state: &mut ChainState, func: &Function, args: Vec<DynSolValue>) -> bool {
        match (func.name.as_str(), args.as_slice()) {
            ("addProject", [DynSolValue::Tuple(fields)]) => match fields.as_slice() {
                [DynSolValue::Address(user), DynSolValue::Address(client), DynSolValue::String(name), DynSolValue::String(description), DynSolValue::String(languages), DynSolValue::String(hash), DynSolValue::String(link)] =>
                {
                    let timestamp = 1_700_000_000 + state.block;
                    state.projects.entry(*user).or_default().push(StoredProject {
                        client: *client,
                        name: name.clone(),
                        description: description.clone(),
                        languages: languages.clone(),
                        hash: hash.clone(),
                        link: link.clone(),
                        verified: false,
                        timestamp,
                    });
                    true
                }
                _ => false,
            },
            ("setUserVerified", [DynSolValue::Address(user), DynSolValue::Bool(status)]) => {
                if *status {
                    state.verified.insert(*user);
                } else {
                    state.verified.remove(user);
                }
                true
            }
            (
                "submitReview",
                [DynSolValue::Address(freelancer), DynSolValue::Uint(index, _), DynSolValue::Uint(rating, _), DynSolValue::String(comment)],
            ) => {
                let index: u64 = index.saturating_to();
                let exists = state
                    .projects
                    .get(freelancer)
                    .is_some_and(|p| (index as usize) < p.len());
                if !exists {
                    return false;
                }
                state.reviews.push((*freelancer, index, rating.saturating_to(), comment.clone()));
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ChainConnector for FakeChain {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    async fn get_balance(&self, _address: Address) -> ChainResult<U256> {
        Ok(U256::from(10u64).pow(U256::from(18u64)))
    }

    async fn get_pending_nonce(&self, address: Address) -> ChainResult<u64> {
        Ok(self.state.lock().unwrap().nonces.get(&address).copied().unwrap_or(0))
    }

    async fn get_gas_price(&self) -> ChainResult<u128> {
        Ok(1_000_000_000)
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        Ok(self.state.lock().unwrap().block)
    }

    async fn call(&self, _to: Address, data: Bytes) -> ChainResult<Bytes> {
        let func = self.function_for(&data).map_err(ChainError::Rpc)?;
        let args = Self::decode_args(func, &data).map_err(ChainError::Rpc)?;

        match (func.name.as_str(), args.as_slice()) {
            ("getAllProjects", [DynSolValue::Address(builder)]) => {
                if self.failing_builders.lock().unwrap().contains(builder) {
                    return Err(ChainError::Connection("connection reset".to_string()));
                }
                let mut state = self.state.lock().unwrap();
                *state.reads.entry(*builder).or_default() += 1;
                let projects = state
                    .projects
                    .get(builder)
                    .map(|list| list.iter().map(StoredProject::to_value).collect())
                    .unwrap_or_default();
                Ok(DynSolValue::Tuple(vec![DynSolValue::Array(projects)])
                    .abi_encode_params()
                    .into())
            }
            _ => Err(ChainError::Rpc("execution reverted".to_string())),
        }
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> ChainResult<TxHash> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);

        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| ChainError::Rpc(format!("rlp: {}", e)))?;
        let tx_hash = *envelope.tx_hash();

        let mut state = self.state.lock().unwrap();
        if state.known.contains(&tx_hash) {
            return Err(ChainError::Rpc("already known".to_string()));
        }
        let expected = state.nonces.get(&self.sender).copied().unwrap_or(0);
        if envelope.nonce() < expected {
            return Err(ChainError::Rpc("nonce too low".to_string()));
        }
        if envelope.nonce() > expected {
            return Err(ChainError::Rpc(format!(
                "nonce gap: expected {}, got {}",
                expected,
                envelope.nonce()
            )));
        }
        if envelope.chain_id() != Some(CHAIN_ID) {
            return Err(ChainError::Rpc("invalid chain id".to_string()));
        }

        state.nonces.insert(self.sender, expected + 1);
        state.accepted_nonces.push(expected);
        state.known.insert(tx_hash);

        if self.mining.load(Ordering::SeqCst) {
            Self::mine(&mut state, self.function_for(envelope.input()), envelope.input(), tx_hash);
        }

        let lost = self
            .lost_replies
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(ChainError::Connection("connection reset".to_string()));
        }
        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> ChainResult<Option<ReceiptSummary>> {
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).cloned())
    }
}

impl FakeChain {
    fn mine(state: &mut ChainState, func: Result<&Function, String>, input: &[u8], tx_hash: TxHash) {
        let success = match func {
            Ok(func) => match Self::decode_args(func, input) {
                Ok(args) => Self::execute(state, func, args),
                Err(_) => false,
            },
            Err(_) => false,
        };

        state.block += 1;
        let block = state.block;
        state.receipts.insert(
            tx_hash,
            ReceiptSummary {
                tx_hash,
                block_number: Some(block),
                success,
                gas_used: 21_000,
            },
        );
    }
}

/// Profile link server. `/ok` answers 200, `/missing` 404, anything else 500.
pub struct LinkServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl LinkServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn start_link_server() -> LinkServer {
    async fn ok(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
        hits.fetch_add(1, Ordering::SeqCst);
        StatusCode::OK
    }
    async fn missing(State(hits): State<Arc<AtomicUsize>>) -> StatusCode {
        hits.fetch_add(1, Ordering::SeqCst);
        StatusCode::NOT_FOUND
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/ok", get(ok))
        .route("/missing", get(missing))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    LinkServer { addr, hits }
}

/// Submission policy with short waits for tests.
pub fn test_policy(confirmation_timeout: Duration) -> TxPolicy {
    TxPolicy {
        gas_limit: 5_000_000,
        fixed_gas_price: Some(20_000_000_000),
        gas_price_multiplier: 1.0,
        max_gas_price_gwei: 500,
        confirmation_timeout,
        poll_interval: Duration::from_millis(10),
        max_broadcast_attempts: 3,
        backoff_base_ms: 1,
        backoff_max_ms: 5,
    }
}

/// A fully wired gateway over a `FakeChain`.
pub struct Harness {
    pub chain: Arc<FakeChain>,
    pub state: AppState,
    pub router: Router,
    pub sender: Address,
    /// Keeps the builder list alive for the harness lifetime.
    pub builders_file: NamedTempFile,
}

pub struct HarnessOptions {
    pub builders: Vec<String>,
    pub with_signer: bool,
    pub with_abi: bool,
    pub confirmation_timeout: Duration,
    pub listener: ListenerConfig,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            builders: Vec::new(),
            with_signer: true,
            with_abi: true,
            confirmation_timeout: Duration::from_secs(2),
            listener: ListenerConfig::default(),
        }
    }
}

pub fn harness(options: HarnessOptions) -> Harness {
    let wallet = Wallet::from_private_key(SIGNER_KEY, CHAIN_ID).unwrap();
    let sender = wallet.address();
    let chain = Arc::new(FakeChain::new(sender));
    let connector: Arc<dyn ChainConnector> = chain.clone();

    let binding = if options.with_abi {
        ContractBinding::new(contract_address(), serde_json::from_str(REGISTRY_ABI).unwrap(), connector.clone())
    } else {
        ContractBinding::unavailable(contract_address(), "cannot read ABI file abi/missing.json", connector.clone())
    };

    let submitter = options
        .with_signer
        .then(|| TxSubmitter::new(connector.clone(), wallet, test_policy(options.confirmation_timeout)));

    let mut builders_file = NamedTempFile::new().unwrap();
    write!(builders_file, "{}", serde_json::to_string(&options.builders).unwrap()).unwrap();

    let registry = Registry::new(
        binding,
        submitter,
        Arc::new(JsonFileBuilderIndex::new(builders_file.path())),
        Arc::new(HttpLinkChecker::new(Duration::from_secs(2)).unwrap()),
        2,
    );

    let state = AppState {
        registry: Arc::new(registry),
        chain: connector,
    };
    let router = build_router(state.clone(), &options.listener);

    Harness {
        chain,
        state,
        router,
        sender,
        builders_file,
    }
}
