//! # In-Memory Ledger
//!
//! A single-node ledger that executes the credential registry program
//! natively. It speaks the same [`LedgerRpc`] surface as a real node:
//! transactions arrive RLP-encoded and signed, senders are recovered from the
//! signature, nonces and balances are enforced, and every transaction is mined
//! into its own block with a receipt and logs.
//!
//! Used by unit tests, the scenario suite and the runtime's dev mode.

use async_trait::async_trait;
use parking_lot::Mutex;
use primitive_types::U256;
use shared_types::{Address, Bytes32, Role, RoleId, TimeSource, TxHash};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::adapters::artifacts::StaticArtifacts;
use crate::domain::abi::{self, ParamType, Token};
use crate::domain::entities::{BlockInfo, CallRequest, LogEntry, LogFilter, Receipt};
use crate::domain::errors::LedgerError;
use crate::domain::gas;
use crate::domain::interface::{
    EV_REGISTERED, EV_REVOKED, FN_GET, FN_GRANT_ROLE, FN_HAS_ROLE, FN_REGISTER, FN_REVOKE,
    FN_REVOKE_ROLE, FN_VERIFY,
};
use crate::domain::transaction::decode_signed;
use crate::ports::outbound::{LedgerRpc, RpcConnector};

/// Interface description of the credential registry program.
pub const CREDENTIAL_REGISTRY_ABI: &str = r#"[
  {"type":"constructor","inputs":[]},
  {"type":"function","name":"registerCredential","stateMutability":"nonpayable",
   "inputs":[{"name":"fingerprint","type":"bytes32"},{"name":"recipient","type":"address"},
             {"name":"pointer","type":"string"},{"name":"storageMode","type":"uint8"}],
   "outputs":[]},
  {"type":"function","name":"revokeCredential","stateMutability":"nonpayable",
   "inputs":[{"name":"fingerprint","type":"bytes32"}],"outputs":[]},
  {"type":"function","name":"getCredential","stateMutability":"view",
   "inputs":[{"name":"fingerprint","type":"bytes32"}],
   "outputs":[{"name":"issuer","type":"address"},{"name":"recipient","type":"address"},
              {"name":"issuedAt","type":"uint256"},{"name":"isRevoked","type":"bool"},
              {"name":"pointer","type":"string"}]},
  {"type":"function","name":"verifyCredential","stateMutability":"view",
   "inputs":[{"name":"fingerprint","type":"bytes32"}],
   "outputs":[{"name":"exists","type":"bool"},{"name":"issuer","type":"address"},
              {"name":"recipient","type":"address"},{"name":"issuedAt","type":"uint256"},
              {"name":"metadata","type":"string"},{"name":"storageMode","type":"uint8"},
              {"name":"embeddedBytes","type":"bytes"},{"name":"externalPointer","type":"string"},
              {"name":"isRevoked","type":"bool"}]},
  {"type":"function","name":"hasRole","stateMutability":"view",
   "inputs":[{"name":"role","type":"bytes32"},{"name":"account","type":"address"}],
   "outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"grantRole","stateMutability":"nonpayable",
   "inputs":[{"name":"role","type":"bytes32"},{"name":"account","type":"address"}],"outputs":[]},
  {"type":"function","name":"revokeRole","stateMutability":"nonpayable",
   "inputs":[{"name":"role","type":"bytes32"},{"name":"account","type":"address"}],"outputs":[]},
  {"type":"function","name":"ISSUER_ROLE","stateMutability":"view","inputs":[],
   "outputs":[{"name":"","type":"bytes32"}]},
  {"type":"event","name":"CredentialRegistered","anonymous":false,
   "inputs":[{"name":"fingerprint","type":"bytes32","indexed":true},
             {"name":"issuer","type":"address","indexed":true},
             {"name":"recipient","type":"address","indexed":true},
             {"name":"pointer","type":"string","indexed":false}]},
  {"type":"event","name":"CredentialRevoked","anonymous":false,
   "inputs":[{"name":"fingerprint","type":"bytes32","indexed":true}]}
]"#;

/// Address the first deployment from a fresh dev node lands at.
pub const DEFAULT_CONTRACT_ADDRESS: Address = Address([
    0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3f, 0x64,
    0x2f, 0x64, 0x18, 0x0a, 0xa3,
]);

pub const DEFAULT_CHAIN_ID: u64 = 1337;

const DEFAULT_GAS_PRICE: u64 = 1_000_000_000;
const GENESIS_BALANCE_ETH: u64 = 10_000;

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone)]
struct StoredCredential {
    issuer: Address,
    recipient: Address,
    issued_at: u64,
    storage_mode: u8,
    pointer: Vec<u8>,
    revoked: bool,
}

#[derive(Debug, Default)]
struct LedgerState {
    blocks: Vec<BlockInfo>,
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, U256>,
    roles: HashSet<(RoleId, Address)>,
    credentials: HashMap<[u8; 32], StoredCredential>,
    receipts: HashMap<TxHash, Receipt>,
    logs: Vec<LogEntry>,
}

impl LedgerState {
    fn has_role(&self, role: Role, account: Address) -> bool {
        self.roles.contains(&(role.id(), account))
    }

    fn head(&self) -> BlockInfo {
        self.blocks.last().copied().unwrap_or(BlockInfo {
            number: 0,
            timestamp: 0,
        })
    }
}

#[derive(Debug, Default)]
struct Faults {
    offline: bool,
    failing_calls: u32,
    blocks_unavailable: bool,
    receipts_unavailable: bool,
}

enum Effect {
    StoreCredential([u8; 32], StoredCredential),
    MarkRevoked([u8; 32]),
    GrantRole(RoleId, Address),
    RevokeRole(RoleId, Address),
}

#[derive(Default)]
struct Outcome {
    output: Vec<u8>,
    effects: Vec<Effect>,
    logs: Vec<(Vec<Bytes32>, Vec<u8>)>,
    execution_gas: u64,
}

struct Selectors {
    register: [u8; 4],
    revoke: [u8; 4],
    get: [u8; 4],
    verify: [u8; 4],
    has_role: [u8; 4],
    grant_role: [u8; 4],
    revoke_role: [u8; 4],
    registered_topic: Bytes32,
    revoked_topic: Bytes32,
}

impl Selectors {
    fn new() -> Self {
        let sig = |name: &str, params: &[ParamType]| abi::signature(name, params);
        Self {
            register: abi::selector(&sig(
                FN_REGISTER,
                &[
                    ParamType::Bytes32,
                    ParamType::Address,
                    ParamType::String,
                    ParamType::Uint(8),
                ],
            )),
            revoke: abi::selector(&sig(FN_REVOKE, &[ParamType::Bytes32])),
            get: abi::selector(&sig(FN_GET, &[ParamType::Bytes32])),
            verify: abi::selector(&sig(FN_VERIFY, &[ParamType::Bytes32])),
            has_role: abi::selector(&sig(FN_HAS_ROLE, &[ParamType::Bytes32, ParamType::Address])),
            grant_role: abi::selector(&sig(
                FN_GRANT_ROLE,
                &[ParamType::Bytes32, ParamType::Address],
            )),
            revoke_role: abi::selector(&sig(
                FN_REVOKE_ROLE,
                &[ParamType::Bytes32, ParamType::Address],
            )),
            registered_topic: Bytes32(shared_crypto::keccak256(
                sig(
                    EV_REGISTERED,
                    &[
                        ParamType::Bytes32,
                        ParamType::Address,
                        ParamType::Address,
                        ParamType::String,
                    ],
                )
                .as_bytes(),
            )),
            revoked_topic: Bytes32(shared_crypto::keccak256(
                sig(EV_REVOKED, &[ParamType::Bytes32]).as_bytes(),
            )),
        }
    }
}

// =============================================================================
// LEDGER
// =============================================================================

pub struct InMemoryLedger {
    chain_id: u64,
    contract: Address,
    gas_price: U256,
    /// Without `verifyCredential` and revocation events.
    legacy: bool,
    clock: Arc<dyn TimeSource>,
    selectors: Selectors,
    state: Mutex<LedgerState>,
    faults: Mutex<Faults>,
}

impl InMemoryLedger {
    /// A fresh ledger with the registry deployed; `admin` holds the admin
    /// role and a funded balance.
    pub fn new(admin: Address, clock: Arc<dyn TimeSource>) -> Self {
        Self::build(admin, clock, false)
    }

    /// Same as [`InMemoryLedger::new`] but deploys the first-generation
    /// program: no `verifyCredential`, no `CredentialRevoked` event.
    pub fn legacy(admin: Address, clock: Arc<dyn TimeSource>) -> Self {
        Self::build(admin, clock, true)
    }

    fn build(admin: Address, clock: Arc<dyn TimeSource>, legacy: bool) -> Self {
        let mut state = LedgerState::default();
        state.blocks.push(BlockInfo {
            number: 0,
            timestamp: clock.now(),
        });
        state.roles.insert((Role::Admin.id(), admin));
        state.balances.insert(admin, genesis_balance());

        Self {
            chain_id: DEFAULT_CHAIN_ID,
            contract: DEFAULT_CONTRACT_ADDRESS,
            gas_price: U256::from(DEFAULT_GAS_PRICE),
            legacy,
            clock,
            selectors: Selectors::new(),
            state: Mutex::new(state),
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn chain_id_value(&self) -> u64 {
        self.chain_id
    }

    /// The interface description matching the deployed program generation.
    pub fn interface_document(&self) -> String {
        if !self.legacy {
            return CREDENTIAL_REGISTRY_ABI.to_string();
        }
        let entries: Vec<serde_json::Value> =
            serde_json::from_str(CREDENTIAL_REGISTRY_ABI).unwrap_or_default();
        let trimmed: Vec<_> = entries
            .into_iter()
            .filter(|e| e["name"] != FN_VERIFY && e["name"] != EV_REVOKED)
            .collect();
        serde_json::to_string(&trimmed).unwrap_or_default()
    }

    /// Artifacts describing this deployment.
    pub fn artifacts(&self) -> StaticArtifacts {
        StaticArtifacts::new(self.interface_document(), self.contract.to_checksum())
    }

    pub fn fund(&self, account: Address, amount: U256) {
        let mut state = self.state.lock();
        let balance = state.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Write a role membership directly, outside any transaction.
    pub fn grant_genesis_role(&self, role: Role, account: Address) {
        self.state.lock().roles.insert((role.id(), account));
    }

    pub fn transaction_total(&self) -> usize {
        self.state.lock().receipts.len()
    }

    pub fn credential_count(&self) -> usize {
        self.state.lock().credentials.len()
    }

    // -------------------------------------------------------------------------
    // Fault injection
    // -------------------------------------------------------------------------

    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().offline = offline;
    }

    /// The next `n` RPC calls fail with a transport error.
    pub fn fail_next_calls(&self, n: u32) {
        self.faults.lock().failing_calls = n;
    }

    pub fn set_blocks_unavailable(&self, unavailable: bool) {
        self.faults.lock().blocks_unavailable = unavailable;
    }

    pub fn set_receipts_unavailable(&self, unavailable: bool) {
        self.faults.lock().receipts_unavailable = unavailable;
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        let mut faults = self.faults.lock();
        if faults.offline {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        if faults.failing_calls > 0 {
            faults.failing_calls -= 1;
            return Err(LedgerError::Transport("injected transport failure".into()));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Program execution
    // -------------------------------------------------------------------------

    fn execute(
        &self,
        state: &LedgerState,
        sender: Address,
        data: &[u8],
        now: u64,
    ) -> Result<Outcome, String> {
        if data.len() < 4 {
            return Err("function selector was not recognized".into());
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        let args = &data[4..];
        let s = &self.selectors;

        if selector == s.register {
            self.register(state, sender, args, now)
        } else if selector == s.revoke {
            self.revoke(state, sender, args)
        } else if selector == s.get {
            get_credential(state, args)
        } else if selector == s.verify && !self.legacy {
            verify_credential(state, args)
        } else if selector == s.has_role {
            let (role, account) = decode_role_args(args)?;
            Ok(Outcome {
                output: encode_output(
                    &[ParamType::Bool],
                    vec![Token::Bool(state.roles.contains(&(role, account)))],
                )?,
                ..Outcome::default()
            })
        } else if selector == s.grant_role || selector == s.revoke_role {
            let (role, account) = decode_role_args(args)?;
            require_role_admin(state, sender, role)?;
            let granting = selector == s.grant_role;
            let present = state.roles.contains(&(role, account));
            let (effects, execution_gas) = match (granting, present) {
                (true, false) => (vec![Effect::GrantRole(role, account)], gas::SSTORE_SET),
                (false, true) => (vec![Effect::RevokeRole(role, account)], gas::SSTORE_RESET),
                // Idempotent no-op, as in the reference access-control module.
                _ => (Vec::new(), 0),
            };
            Ok(Outcome {
                effects,
                execution_gas,
                ..Outcome::default()
            })
        } else {
            Err("function selector was not recognized".into())
        }
    }

    fn register(
        &self,
        state: &LedgerState,
        sender: Address,
        args: &[u8],
        now: u64,
    ) -> Result<Outcome, String> {
        let mut tokens = abi::decode(
            &[
                ParamType::Bytes32,
                ParamType::Address,
                ParamType::String,
                ParamType::Uint(8),
            ],
            args,
        )
        .map_err(|e| format!("invalid calldata: {e}"))?
        .into_iter();

        let fingerprint = next_token(&mut tokens, Token::into_bytes32)?;
        let recipient = next_token(&mut tokens, Token::into_address)?;
        let pointer = next_token(&mut tokens, Token::into_bytes)?;
        let storage_mode = next_token(&mut tokens, Token::into_uint)?.low_u32() as u8;

        if !state.has_role(Role::Issuer, sender) {
            return Err(missing_role(sender, Role::Issuer.id()));
        }
        if recipient.is_zero() {
            return Err("Invalid recipient address".into());
        }
        if state.credentials.contains_key(&fingerprint) {
            return Err("Credential already exists".into());
        }

        let log_data = abi::encode(&[ParamType::String], &[Token::Bytes(pointer.clone())])
            .map_err(|e| e.to_string())?;
        let topics = vec![
            self.selectors.registered_topic,
            Bytes32(fingerprint),
            address_topic(sender),
            address_topic(recipient),
        ];

        Ok(Outcome {
            output: Vec::new(),
            execution_gas: gas::credential_storage(pointer.len()) + log_gas(&topics, &log_data),
            effects: vec![Effect::StoreCredential(
                fingerprint,
                StoredCredential {
                    issuer: sender,
                    recipient,
                    issued_at: now,
                    storage_mode,
                    pointer,
                    revoked: false,
                },
            )],
            logs: vec![(topics, log_data)],
        })
    }

    fn revoke(&self, state: &LedgerState, sender: Address, args: &[u8]) -> Result<Outcome, String> {
        let fingerprint = abi::decode(&[ParamType::Bytes32], args)
            .map_err(|e| format!("invalid calldata: {e}"))?
            .into_iter()
            .next()
            .and_then(Token::into_bytes32)
            .ok_or("invalid calldata")?;

        let Some(existing) = state.credentials.get(&fingerprint) else {
            return Err("Credential does not exist".into());
        };
        if !state.has_role(Role::Issuer, sender) {
            return Err(missing_role(sender, Role::Issuer.id()));
        }
        if existing.revoked {
            return Err("Credential already revoked".into());
        }

        let mut logs = Vec::new();
        let mut execution_gas = gas::SSTORE_RESET;
        if !self.legacy {
            let topics = vec![self.selectors.revoked_topic, Bytes32(fingerprint)];
            execution_gas += log_gas(&topics, &[]);
            logs.push((topics, Vec::new()));
        }

        Ok(Outcome {
            output: Vec::new(),
            effects: vec![Effect::MarkRevoked(fingerprint)],
            logs,
            execution_gas,
        })
    }

    fn apply(state: &mut LedgerState, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StoreCredential(fp, credential) => {
                    state.credentials.insert(fp, credential);
                }
                Effect::MarkRevoked(fp) => {
                    if let Some(c) = state.credentials.get_mut(&fp) {
                        c.revoked = true;
                    }
                }
                Effect::GrantRole(role, account) => {
                    state.roles.insert((role, account));
                }
                Effect::RevokeRole(role, account) => {
                    state.roles.remove(&(role, account));
                }
            }
        }
    }
}

fn genesis_balance() -> U256 {
    U256::from(GENESIS_BALANCE_ETH) * U256::exp10(18)
}

fn address_topic(address: Address) -> Bytes32 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    Bytes32(word)
}

fn log_gas(topics: &[Bytes32], data: &[u8]) -> u64 {
    gas::log_cost(topics.len(), data.len())
}

fn missing_role(account: Address, role: RoleId) -> String {
    format!(
        "AccessControl: account {} is missing role {}",
        account.to_lower_hex(),
        role.to_hex()
    )
}

fn next_token<T>(
    tokens: &mut impl Iterator<Item = Token>,
    convert: fn(Token) -> Option<T>,
) -> Result<T, String> {
    tokens
        .next()
        .and_then(convert)
        .ok_or_else(|| "invalid calldata".to_string())
}

fn encode_output(types: &[ParamType], tokens: Vec<Token>) -> Result<Vec<u8>, String> {
    abi::encode(types, &tokens).map_err(|e| e.to_string())
}

fn decode_role_args(args: &[u8]) -> Result<(RoleId, Address), String> {
    let mut tokens = abi::decode(&[ParamType::Bytes32, ParamType::Address], args)
        .map_err(|e| format!("invalid calldata: {e}"))?
        .into_iter();
    let role = next_token(&mut tokens, Token::into_bytes32)?;
    let account = next_token(&mut tokens, Token::into_address)?;
    Ok((Bytes32(role), account))
}

/// Admin manages every role; Issuer additionally manages Student.
fn require_role_admin(state: &LedgerState, sender: Address, role: RoleId) -> Result<(), String> {
    let allowed = match Role::from_id(&role) {
        Some(target) => Role::ALL
            .iter()
            .any(|r| r.can_manage(target) && state.has_role(*r, sender)),
        None => state.has_role(Role::Admin, sender),
    };
    if allowed {
        Ok(())
    } else {
        Err(missing_role(sender, Role::Admin.id()))
    }
}

fn read_fingerprint(args: &[u8]) -> Result<[u8; 32], String> {
    abi::decode(&[ParamType::Bytes32], args)
        .map_err(|e| format!("invalid calldata: {e}"))?
        .into_iter()
        .next()
        .and_then(Token::into_bytes32)
        .ok_or_else(|| "invalid calldata".to_string())
}

fn get_credential(state: &LedgerState, args: &[u8]) -> Result<Outcome, String> {
    let fingerprint = read_fingerprint(args)?;
    let tokens = match state.credentials.get(&fingerprint) {
        Some(c) => vec![
            Token::Address(c.issuer),
            Token::Address(c.recipient),
            Token::Uint(U256::from(c.issued_at)),
            Token::Bool(c.revoked),
            Token::Bytes(c.pointer.clone()),
        ],
        None => vec![
            Token::Address(Address::ZERO),
            Token::Address(Address::ZERO),
            Token::Uint(U256::zero()),
            Token::Bool(false),
            Token::Bytes(Vec::new()),
        ],
    };
    Ok(Outcome {
        output: encode_output(
            &[
                ParamType::Address,
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Bool,
                ParamType::String,
            ],
            tokens,
        )?,
        ..Outcome::default()
    })
}

fn verify_credential(state: &LedgerState, args: &[u8]) -> Result<Outcome, String> {
    let fingerprint = read_fingerprint(args)?;
    let tokens = match state.credentials.get(&fingerprint) {
        Some(c) => {
            let external = c.storage_mode != 0;
            vec![
                Token::Bool(true),
                Token::Address(c.issuer),
                Token::Address(c.recipient),
                Token::Uint(U256::from(c.issued_at)),
                Token::Bytes(c.pointer.clone()),
                Token::Uint(U256::from(c.storage_mode)),
                Token::Bytes(if external { Vec::new() } else { c.pointer.clone() }),
                Token::Bytes(if external { c.pointer.clone() } else { Vec::new() }),
                Token::Bool(c.revoked),
            ]
        }
        None => vec![
            Token::Bool(false),
            Token::Address(Address::ZERO),
            Token::Address(Address::ZERO),
            Token::Uint(U256::zero()),
            Token::Bytes(Vec::new()),
            Token::Uint(U256::zero()),
            Token::Bytes(Vec::new()),
            Token::Bytes(Vec::new()),
            Token::Bool(false),
        ],
    };
    Ok(Outcome {
        output: encode_output(
            &[
                ParamType::Bool,
                ParamType::Address,
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::String,
                ParamType::Uint(8),
                ParamType::Bytes,
                ParamType::String,
                ParamType::Bool,
            ],
            tokens,
        )?,
        ..Outcome::default()
    })
}

fn nonce_error(message: &str) -> LedgerError {
    LedgerError::Rpc {
        code: -32000,
        message: message.to_string(),
    }
}

// =============================================================================
// PORT IMPLEMENTATION
// =============================================================================

#[async_trait]
impl LedgerRpc for InMemoryLedger {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        self.check_online()?;
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.check_online()?;
        Ok(self.state.lock().head().number)
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        self.check_online()?;
        if request.to != self.contract {
            return Ok(Vec::new());
        }
        let state = self.state.lock();
        let sender = request.from.unwrap_or(Address::ZERO);
        self.execute(&state, sender, &request.data, self.clock.now())
            .map(|outcome| outcome.output)
            .map_err(LedgerError::reverted)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, LedgerError> {
        self.check_online()?;
        let intrinsic = gas::intrinsic(&request.data);
        if request.to != self.contract {
            return Ok(intrinsic);
        }
        let state = self.state.lock();
        let sender = request.from.unwrap_or(Address::ZERO);
        self.execute(&state, sender, &request.data, self.clock.now())
            .map(|outcome| intrinsic + outcome.execution_gas)
            .map_err(LedgerError::reverted)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, LedgerError> {
        self.check_online()?;
        let decoded = decode_signed(raw).map_err(|e| LedgerError::Rpc {
            code: -32000,
            message: format!("invalid transaction: {e}"),
        })?;
        let tx = decoded.tx;
        let sender = decoded.sender;

        let mut state = self.state.lock();
        if state.receipts.contains_key(&decoded.hash) {
            return Err(nonce_error("already known"));
        }
        if tx.chain_id != self.chain_id {
            return Err(nonce_error("invalid chain id"));
        }
        let expected = state.nonces.get(&sender).copied().unwrap_or(0);
        if tx.nonce < expected {
            return Err(nonce_error("nonce too low"));
        }
        if tx.nonce > expected {
            return Err(nonce_error("nonce too high"));
        }
        let max_cost = U256::from(tx.gas_limit)
            .saturating_mul(tx.gas_price)
            .saturating_add(tx.value);
        let balance = state.balances.get(&sender).copied().unwrap_or_default();
        if balance < max_cost {
            return Err(nonce_error("insufficient funds for gas * price + value"));
        }
        let intrinsic = gas::intrinsic(&tx.data);
        if intrinsic > tx.gas_limit {
            return Err(nonce_error("intrinsic gas too low"));
        }

        let head = state.head();
        let block = BlockInfo {
            number: head.number + 1,
            timestamp: self.clock.now().max(head.timestamp),
        };

        let (status, gas_used, logs) = if tx.to == Some(self.contract) {
            match self.execute(&state, sender, &tx.data, block.timestamp) {
                Ok(outcome) if intrinsic + outcome.execution_gas <= tx.gas_limit => {
                    let used = intrinsic + outcome.execution_gas;
                    Self::apply(&mut state, outcome.effects);
                    (true, used, outcome.logs)
                }
                // Out of gas or reverted: the sender still pays.
                Ok(_) => (false, tx.gas_limit, Vec::new()),
                Err(_) => (false, intrinsic, Vec::new()),
            }
        } else {
            (true, intrinsic, Vec::new())
        };

        let logs: Vec<LogEntry> = logs
            .into_iter()
            .enumerate()
            .map(|(i, (topics, data))| LogEntry {
                address: self.contract,
                topics,
                data,
                block_number: block.number,
                tx_hash: decoded.hash,
                log_index: i as u64,
            })
            .collect();

        let fee = U256::from(gas_used).saturating_mul(tx.gas_price);
        if let Some(balance) = state.balances.get_mut(&sender) {
            *balance = balance.saturating_sub(fee);
        }
        if status {
            if let Some(to) = tx.to {
                if let Some(from) = state.balances.get_mut(&sender) {
                    *from = from.saturating_sub(tx.value);
                }
                let credit = state.balances.entry(to).or_default();
                *credit = credit.saturating_add(tx.value);
            }
        }
        *state.nonces.entry(sender).or_insert(0) += 1;
        state.logs.extend(logs.iter().cloned());
        state.blocks.push(block);
        state.receipts.insert(
            decoded.hash,
            Receipt {
                tx_hash: decoded.hash,
                block_number: block.number,
                from: sender,
                to: tx.to,
                gas_used,
                effective_gas_price: tx.gas_price,
                status,
                logs,
            },
        );

        Ok(decoded.hash)
    }

    async fn transaction_count(
        &self,
        address: Address,
        _pending: bool,
    ) -> Result<u64, LedgerError> {
        self.check_online()?;
        // Transactions are mined on arrival, so pending equals latest.
        Ok(self.state.lock().nonces.get(&address).copied().unwrap_or(0))
    }

    async fn gas_price(&self) -> Result<U256, LedgerError> {
        self.check_online()?;
        Ok(self.gas_price)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, LedgerError> {
        self.check_online()?;
        if self.faults.lock().receipts_unavailable {
            return Err(LedgerError::Transport("receipt lookup unavailable".into()));
        }
        Ok(self.state.lock().receipts.get(&hash).cloned())
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
        self.check_online()?;
        let state = self.state.lock();
        Ok(state
            .logs
            .iter()
            .filter(|log| log.address == filter.address)
            .filter(|log| log.block_number >= filter.from_block)
            .filter(|log| filter.to_block.map_or(true, |to| log.block_number <= to))
            .filter(|log| filter.topic0.map_or(true, |t| log.topics.first() == Some(&t)))
            .cloned()
            .collect())
    }

    async fn block(&self, number: u64) -> Result<Option<BlockInfo>, LedgerError> {
        self.check_online()?;
        if self.faults.lock().blocks_unavailable {
            return Err(LedgerError::Transport("block lookup unavailable".into()));
        }
        Ok(self.state.lock().blocks.get(number as usize).copied())
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.check_online()?;
        Ok(self
            .state
            .lock()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }
}

/// Hands out the shared in-memory ledger; refuses while it is offline.
#[derive(Clone)]
pub struct InMemoryConnector {
    ledger: Arc<InMemoryLedger>,
}

impl InMemoryConnector {
    pub fn new(ledger: Arc<InMemoryLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl RpcConnector for InMemoryConnector {
    async fn connect(&self, _endpoint: &str) -> Result<Arc<dyn LedgerRpc>, LedgerError> {
        self.ledger.chain_id().await?;
        Ok(self.ledger.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::revert::RevertKind;
    use crate::domain::transaction::LegacyTransaction;
    use shared_crypto::SigningAccount;
    use shared_types::ManualClock;

    fn ledger() -> (InMemoryLedger, SigningAccount) {
        let admin = SigningAccount::generate();
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let ledger = InMemoryLedger::new(admin.address(), clock);
        (ledger, admin)
    }

    fn role_call(selector: [u8; 4], role: Role, account: Address) -> Vec<u8> {
        abi::encode_call(
            selector,
            &[ParamType::Bytes32, ParamType::Address],
            &[Token::Bytes32(role.id().0), Token::Address(account)],
        )
        .unwrap()
    }

    async fn send(
        ledger: &InMemoryLedger,
        signer: &SigningAccount,
        data: Vec<u8>,
    ) -> Receipt {
        let nonce = ledger.transaction_count(signer.address(), true).await.unwrap();
        let tx = LegacyTransaction {
            nonce,
            gas_price: U256::from(DEFAULT_GAS_PRICE),
            gas_limit: 2_000_000,
            to: Some(ledger.contract_address()),
            value: U256::zero(),
            data,
            chain_id: DEFAULT_CHAIN_ID,
        };
        let signed = tx.sign(signer).unwrap();
        let hash = ledger.send_raw_transaction(&signed.raw).await.unwrap();
        ledger.transaction_receipt(hash).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_admin_can_grant_issuer() {
        let (ledger, admin) = ledger();
        let issuer = Address([7; 20]);
        let receipt = send(
            &ledger,
            &admin,
            role_call(ledger.selectors.grant_role, Role::Issuer, issuer),
        )
        .await;

        assert!(receipt.status);
        assert!(receipt.gas_used > gas::TX_BASE);
        let out = ledger
            .call(&CallRequest {
                from: None,
                to: ledger.contract_address(),
                data: role_call(ledger.selectors.has_role, Role::Issuer, issuer),
            })
            .await
            .unwrap();
        assert_eq!(out[31], 1);
    }

    #[tokio::test]
    async fn test_unfunded_sender_rejected() {
        let (ledger, _) = ledger();
        let stranger = SigningAccount::generate();
        let tx = LegacyTransaction {
            nonce: 0,
            gas_price: U256::from(DEFAULT_GAS_PRICE),
            gas_limit: 100_000,
            to: Some(ledger.contract_address()),
            value: U256::zero(),
            data: vec![],
            chain_id: DEFAULT_CHAIN_ID,
        };
        let err = ledger
            .send_raw_transaction(&tx.sign(&stranger).unwrap().raw)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn test_register_without_issuer_role_reverts_in_call() {
        let (ledger, admin) = ledger();
        let data = abi::encode_call(
            ledger.selectors.register,
            &[
                ParamType::Bytes32,
                ParamType::Address,
                ParamType::String,
                ParamType::Uint(8),
            ],
            &[
                Token::Bytes32([1; 32]),
                Token::Address(Address([2; 20])),
                Token::Bytes(b"x".to_vec()),
                Token::Uint(U256::zero()),
            ],
        )
        .unwrap();

        let err = ledger
            .call(&CallRequest {
                from: Some(admin.address()),
                to: ledger.contract_address(),
                data,
            })
            .await
            .unwrap_err();
        assert_eq!(err.revert_kind(), Some(RevertKind::Unauthorized));
    }

    #[tokio::test]
    async fn test_wrong_nonce_rejected() {
        let (ledger, admin) = ledger();
        let tx = LegacyTransaction {
            nonce: 5,
            gas_price: U256::from(DEFAULT_GAS_PRICE),
            gas_limit: 100_000,
            to: Some(ledger.contract_address()),
            value: U256::zero(),
            data: vec![],
            chain_id: DEFAULT_CHAIN_ID,
        };
        let err = ledger
            .send_raw_transaction(&tx.sign(&admin).unwrap().raw)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nonce too high"));
    }

    #[tokio::test]
    async fn test_reverted_transaction_is_mined_with_failure_status() {
        let (ledger, _) = ledger();
        let outsider = SigningAccount::generate();
        ledger.fund(outsider.address(), genesis_balance());

        let receipt = send(
            &ledger,
            &outsider,
            role_call(ledger.selectors.grant_role, Role::Admin, outsider.address()),
        )
        .await;
        assert!(!receipt.status);
        assert_eq!(ledger.transaction_total(), 1);
        assert_eq!(
            ledger.transaction_count(outsider.address(), false).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_offline_ledger_refuses_connection() {
        let (ledger, _) = ledger();
        let ledger = Arc::new(ledger);
        ledger.set_offline(true);
        let connector = InMemoryConnector::new(ledger.clone());
        assert!(matches!(
            connector.connect("memory://").await,
            Err(LedgerError::Transport(_))
        ));
        ledger.set_offline(false);
        assert!(connector.connect("memory://").await.is_ok());
    }

    #[test]
    fn test_legacy_document_drops_optional_members() {
        let (ledger, _) = ledger();
        assert!(ledger.interface_document().contains(FN_VERIFY));
        let legacy = InMemoryLedger::legacy(Address::ZERO, Arc::new(ManualClock::new(0)));
        assert!(!legacy.interface_document().contains(FN_VERIFY));
        assert!(!legacy.interface_document().contains(EV_REVOKED));
    }
}
