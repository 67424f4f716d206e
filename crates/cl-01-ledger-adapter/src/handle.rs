//! # Contract Handle
//!
//! The bound proxy to the deployed registry program. A handle exists only
//! when both the interface description and the program address resolved
//! cleanly; it is cheap to clone and shares one RPC client.

use primitive_types::U256;
use shared_crypto::SigningAccount;
use shared_types::{Address, Bytes32, Fingerprint, Role, StorageMode, TxHash};
use std::sync::Arc;
use tracing::instrument;

use crate::domain::abi::{self, ParamType, Token};
use crate::domain::entities::{
    looks_like_content_id, CallRequest, EventLocation, LogEntry, LogFilter, OnChainCredential,
    Receipt, RegistryEvent, UnsignedTransaction,
};
use crate::domain::errors::LedgerError;
use crate::domain::interface::{
    Capabilities, ContractInterface, EventSpec, FunctionSpec, InterfaceError, EV_REGISTERED,
    EV_REVOKED, FN_GET, FN_GRANT_ROLE, FN_HAS_ROLE, FN_REGISTER, FN_REVOKE, FN_REVOKE_ROLE,
    FN_VERIFY,
};
use crate::domain::revert::RevertKind;
use crate::ports::outbound::LedgerRpc;
use crate::sequencer::TransactionSubmitter;

#[derive(Clone)]
pub struct ContractHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    address: Address,
    interface: ContractInterface,
    rpc: Arc<dyn LedgerRpc>,
    submitter: TransactionSubmitter,
}

impl std::fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.inner.address)
            .field("version", &self.inner.interface.version())
            .finish()
    }
}

impl ContractHandle {
    pub(crate) fn new(
        address: Address,
        interface: ContractInterface,
        rpc: Arc<dyn LedgerRpc>,
        submitter: TransactionSubmitter,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                address,
                interface,
                rpc,
                submitter,
            }),
        }
    }

    pub fn address(&self) -> Address {
        self.inner.address
    }

    pub fn interface(&self) -> &ContractInterface {
        &self.inner.interface
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.interface.capabilities()
    }

    fn function(&self, name: &str) -> Result<&FunctionSpec, LedgerError> {
        self.inner
            .interface
            .function(name)
            .ok_or_else(|| InterfaceError::MissingMember(name.to_string()).into())
    }

    fn event(&self, name: &str) -> Result<&EventSpec, LedgerError> {
        self.inner
            .interface
            .event(name)
            .ok_or_else(|| InterfaceError::MissingMember(name.to_string()).into())
    }

    fn encode(&self, name: &str, tokens: &[Token]) -> Result<Vec<u8>, LedgerError> {
        let spec = self.function(name)?;
        Ok(abi::encode_call(spec.selector, &spec.inputs, tokens)?)
    }

    async fn view(&self, name: &str, tokens: &[Token]) -> Result<Vec<Token>, LedgerError> {
        let data = self.encode(name, tokens)?;
        let output = self
            .inner
            .rpc
            .call(&CallRequest {
                from: None,
                to: self.inner.address,
                data,
            })
            .await?;
        Ok(abi::decode(&self.function(name)?.outputs, &output)?)
    }

    async fn transact(
        &self,
        signer: &SigningAccount,
        name: &str,
        tokens: &[Token],
    ) -> Result<Receipt, LedgerError> {
        let data = self.encode(name, tokens)?;
        self.inner
            .submitter
            .submit(signer, self.inner.address, name, data)
            .await
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub async fn has_role(&self, role: Role, account: Address) -> Result<bool, LedgerError> {
        let out = self
            .view(
                FN_HAS_ROLE,
                &[Token::Bytes32(role.id().0), Token::Address(account)],
            )
            .await?;
        take(out, 0, Token::into_bool)
    }

    /// `None` when the fingerprint was never registered.
    ///
    /// The first-generation lookup does not report the storage mode, so it is
    /// inferred from the pointer's shape.
    #[instrument(skip(self), fields(fingerprint = %fingerprint))]
    pub async fn get_credential(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<OnChainCredential>, LedgerError> {
        let out = match self.view(FN_GET, &[Token::Bytes32(fingerprint.0)]).await {
            Ok(out) => out,
            Err(e) if e.revert_kind() == Some(RevertKind::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut out = out.into_iter();
        let issuer = next(&mut out, Token::into_address)?;
        let recipient = next(&mut out, Token::into_address)?;
        let issued_at = next(&mut out, Token::into_uint)?;
        let is_revoked = next(&mut out, Token::into_bool)?;
        let pointer = next(&mut out, Token::into_bytes)?;

        if issuer.is_zero() {
            return Ok(None);
        }
        let storage_mode = if looks_like_content_id(&pointer) {
            StorageMode::External
        } else {
            StorageMode::Embedded
        };
        Ok(Some(OnChainCredential {
            fingerprint: *fingerprint,
            issuer,
            recipient,
            issued_at: issued_at.low_u64(),
            storage_mode,
            pointer,
            is_revoked,
        }))
    }

    /// Full credential view; uses `verifyCredential` when deployed and falls
    /// back to `getCredential` otherwise.
    #[instrument(skip(self), fields(fingerprint = %fingerprint))]
    pub async fn verify_credential(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<OnChainCredential>, LedgerError> {
        if !self.capabilities().verify_credential {
            return self.get_credential(fingerprint).await;
        }

        let mut out = self
            .view(FN_VERIFY, &[Token::Bytes32(fingerprint.0)])
            .await?
            .into_iter();
        let exists = next(&mut out, Token::into_bool)?;
        let issuer = next(&mut out, Token::into_address)?;
        let recipient = next(&mut out, Token::into_address)?;
        let issued_at = next(&mut out, Token::into_uint)?;
        let metadata = next(&mut out, Token::into_bytes)?;
        let mode = next(&mut out, Token::into_uint)?;
        let embedded = next(&mut out, Token::into_bytes)?;
        let external = next(&mut out, Token::into_bytes)?;
        let is_revoked = next(&mut out, Token::into_bool)?;

        if !exists {
            return Ok(None);
        }
        let storage_mode = StorageMode::from_u8(mode.low_u32() as u8);
        let pointer = match storage_mode {
            StorageMode::External if !external.is_empty() => external,
            StorageMode::Embedded if !embedded.is_empty() => embedded,
            _ => metadata,
        };
        Ok(Some(OnChainCredential {
            fingerprint: *fingerprint,
            issuer,
            recipient,
            issued_at: issued_at.low_u64(),
            storage_mode,
            pointer,
            is_revoked,
        }))
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    pub async fn register_credential(
        &self,
        signer: &SigningAccount,
        fingerprint: &Fingerprint,
        recipient: Address,
        pointer: &[u8],
        storage_mode: StorageMode,
    ) -> Result<Receipt, LedgerError> {
        self.transact(
            signer,
            FN_REGISTER,
            &register_tokens(fingerprint, recipient, pointer, storage_mode),
        )
        .await
    }

    pub async fn revoke_credential(
        &self,
        signer: &SigningAccount,
        fingerprint: &Fingerprint,
    ) -> Result<Receipt, LedgerError> {
        self.transact(signer, FN_REVOKE, &[Token::Bytes32(fingerprint.0)])
            .await
    }

    pub async fn grant_role(
        &self,
        signer: &SigningAccount,
        role: Role,
        account: Address,
    ) -> Result<Receipt, LedgerError> {
        self.transact(
            signer,
            FN_GRANT_ROLE,
            &[Token::Bytes32(role.id().0), Token::Address(account)],
        )
        .await
    }

    pub async fn revoke_role(
        &self,
        signer: &SigningAccount,
        role: Role,
        account: Address,
    ) -> Result<Receipt, LedgerError> {
        self.transact(
            signer,
            FN_REVOKE_ROLE,
            &[Token::Bytes32(role.id().0), Token::Address(account)],
        )
        .await
    }

    pub async fn prepare_register(
        &self,
        from: Address,
        fingerprint: &Fingerprint,
        recipient: Address,
        pointer: &[u8],
        storage_mode: StorageMode,
    ) -> Result<UnsignedTransaction, LedgerError> {
        let data = self.encode(
            FN_REGISTER,
            &register_tokens(fingerprint, recipient, pointer, storage_mode),
        )?;
        self.inner
            .submitter
            .prepare(from, self.inner.address, data)
            .await
    }

    pub async fn prepare_revoke(
        &self,
        from: Address,
        fingerprint: &Fingerprint,
    ) -> Result<UnsignedTransaction, LedgerError> {
        let data = self.encode(FN_REVOKE, &[Token::Bytes32(fingerprint.0)])?;
        self.inner
            .submitter
            .prepare(from, self.inner.address, data)
            .await
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    async fn fetch_logs(
        &self,
        spec: &EventSpec,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<LogEntry>, LedgerError> {
        self.inner
            .rpc
            .logs(&LogFilter {
                address: self.inner.address,
                topic0: Some(spec.topic),
                from_block,
                to_block,
            })
            .await
    }

    pub async fn registered_events(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<RegistryEvent>, LedgerError> {
        let spec = self.event(EV_REGISTERED)?;
        let logs = self.fetch_logs(spec, from_block, to_block).await?;

        logs.iter()
            .map(|log| {
                let mut tokens = decode_log(spec, log)?.into_iter();
                let fingerprint = next(&mut tokens, Token::into_bytes32)?;
                let issuer = next(&mut tokens, Token::into_address)?;
                let recipient = next(&mut tokens, Token::into_address)?;
                // An indexed string only leaves its hash behind.
                let pointer = tokens.next().and_then(Token::into_bytes).unwrap_or_default();
                Ok(RegistryEvent::Registered {
                    fingerprint: Fingerprint(fingerprint),
                    issuer,
                    recipient,
                    pointer,
                    location: location(log),
                })
            })
            .collect()
    }

    /// Empty when the deployed program emits no revocation events.
    pub async fn revoked_events(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<RegistryEvent>, LedgerError> {
        if !self.capabilities().revocation_events {
            return Ok(Vec::new());
        }
        let spec = self.event(EV_REVOKED)?;
        let logs = self.fetch_logs(spec, from_block, to_block).await?;

        logs.iter()
            .map(|log| {
                let mut tokens = decode_log(spec, log)?.into_iter();
                let fingerprint = next(&mut tokens, Token::into_bytes32)?;
                let actor = tokens.find_map(Token::into_address);
                Ok(RegistryEvent::Revoked {
                    fingerprint: Fingerprint(fingerprint),
                    actor,
                    location: location(log),
                })
            })
            .collect()
    }

    // =========================================================================
    // CHAIN QUERIES
    // =========================================================================

    pub async fn block_number(&self) -> Result<u64, LedgerError> {
        self.inner.rpc.block_number().await
    }

    pub async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, LedgerError> {
        Ok(self.inner.rpc.block(number).await?.map(|b| b.timestamp))
    }

    pub async fn receipt(&self, hash: TxHash) -> Result<Option<Receipt>, LedgerError> {
        self.inner.rpc.transaction_receipt(hash).await
    }

    pub async fn balance(&self, account: Address) -> Result<U256, LedgerError> {
        self.inner.rpc.balance(account).await
    }
}

fn register_tokens(
    fingerprint: &Fingerprint,
    recipient: Address,
    pointer: &[u8],
    storage_mode: StorageMode,
) -> [Token; 4] {
    [
        Token::Bytes32(fingerprint.0),
        Token::Address(recipient),
        Token::Bytes(pointer.to_vec()),
        Token::Uint(U256::from(storage_mode.as_u8())),
    ]
}

fn location(log: &LogEntry) -> EventLocation {
    EventLocation {
        block_number: log.block_number,
        log_index: log.log_index,
        tx_hash: log.tx_hash,
    }
}

/// Decode a log into tokens in declaration order.
fn decode_log(spec: &EventSpec, log: &LogEntry) -> Result<Vec<Token>, LedgerError> {
    let data_types: Vec<ParamType> = spec
        .params
        .iter()
        .filter(|p| !p.indexed)
        .map(|p| p.kind)
        .collect();
    let mut data_tokens = abi::decode(&data_types, &log.data)?.into_iter();
    let mut topics = log.topics.iter().skip(1);

    spec.params
        .iter()
        .map(|param| {
            if param.indexed {
                let topic: &Bytes32 = topics.next().ok_or_else(|| {
                    let msg = format!("{}: missing topic for {}", spec.name, param.name);
                    LedgerError::Malformed(msg)
                })?;
                Ok(abi::decode_topic(&param.kind, &topic.0)?)
            } else {
                data_tokens.next().ok_or_else(|| {
                    let msg = format!("{}: missing data for {}", spec.name, param.name);
                    LedgerError::Malformed(msg)
                })
            }
        })
        .collect()
}

fn next<T>(
    tokens: &mut impl Iterator<Item = Token>,
    convert: fn(Token) -> Option<T>,
) -> Result<T, LedgerError> {
    tokens
        .next()
        .and_then(convert)
        .ok_or_else(|| LedgerError::Malformed("unexpected output shape".into()))
}

fn take<T>(
    tokens: Vec<Token>,
    index: usize,
    convert: fn(Token) -> Option<T>,
) -> Result<T, LedgerError> {
    tokens
        .into_iter()
        .nth(index)
        .and_then(convert)
        .ok_or_else(|| LedgerError::Malformed("unexpected output shape".into()))
}
