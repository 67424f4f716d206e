//! # Per-Account Sequencer
//!
//! Nonce allocation, signing and submission for one account happen under that
//! account's lock, so concurrent requests from the same signer get contiguous
//! nonces instead of racing on `eth_getTransactionCount`. Receipt polling runs
//! after the lock is released.
//!
//! The locally tracked next nonce is dropped whenever a submission fails; the
//! next request re-reads the pending count from the node.

use dashmap::DashMap;
use primitive_types::U256;
use shared_crypto::SigningAccount;
use shared_types::{Address, TxHash};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

use credential_telemetry::{
    log_event, log_tx_event, metric_observe, LEDGER_GAS_USED, LEDGER_RECEIPT_WAIT,
    LEDGER_TRANSACTIONS,
};

use crate::domain::entities::{CallRequest, Receipt, UnsignedTransaction};
use crate::domain::errors::LedgerError;
use crate::domain::transaction::LegacyTransaction;
use crate::ports::outbound::LedgerRpc;

const SUBSYSTEM: &str = "ledger_adapter";

/// Submission parameters.
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    pub gas_limit: u64,
    pub receipt_poll_interval: Duration,
    /// `None` waits indefinitely.
    pub receipt_timeout: Option<Duration>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            gas_limit: 2_000_000,
            receipt_poll_interval: Duration::from_millis(500),
            receipt_timeout: None,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    next_nonce: Option<u64>,
}

/// One lock per signing account.
#[derive(Debug, Default)]
pub struct AccountSequencer {
    slots: DashMap<Address, Arc<Mutex<Slot>>>,
}

impl AccountSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, account: Address) -> Arc<Mutex<Slot>> {
        self.slots.entry(account).or_default().clone()
    }

    /// Locally tracked next nonce, if any.
    pub async fn next_nonce(&self, account: Address) -> Option<u64> {
        match self.slots.get(&account).map(|s| s.clone()) {
            Some(slot) => slot.lock().await.next_nonce,
            None => None,
        }
    }
}

/// Builds, signs and submits transactions against one node.
#[derive(Clone)]
pub struct TransactionSubmitter {
    rpc: Arc<dyn LedgerRpc>,
    sequencer: Arc<AccountSequencer>,
    config: SubmitConfig,
}

impl TransactionSubmitter {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        sequencer: Arc<AccountSequencer>,
        config: SubmitConfig,
    ) -> Self {
        Self {
            rpc,
            sequencer,
            config,
        }
    }

    /// Preflight, sign, send and wait for the receipt.
    ///
    /// The preflight is a gas estimate. A revert it finds is returned with its
    /// reason, and an estimate above `gas_limit` becomes
    /// [`LedgerError::GasLimitExceeded`]; in both cases nothing is sent and no
    /// nonce is consumed. A transaction mined with failure status becomes
    /// [`LedgerError::TransactionFailed`].
    #[instrument(skip(self, signer, data), fields(from = %signer.address()))]
    pub async fn submit(
        &self,
        signer: &SigningAccount,
        to: Address,
        function: &str,
        data: Vec<u8>,
    ) -> Result<Receipt, LedgerError> {
        let hash = self.send(signer, to, function, data).await?;
        let receipt = self.wait_for_receipt(hash).await?;

        if !receipt.status {
            LEDGER_TRANSACTIONS
                .with_label_values(&[function, "reverted"])
                .inc();
            log_tx_event!(
                warn,
                SUBSYSTEM,
                "transaction mined with failure status",
                hash,
                function
            );
            return Err(LedgerError::TransactionFailed { tx_hash: hash });
        }

        LEDGER_TRANSACTIONS
            .with_label_values(&[function, "confirmed"])
            .inc();
        LEDGER_GAS_USED.inc_by(receipt.gas_used as f64);
        log_tx_event!(
            debug,
            SUBSYSTEM,
            "transaction confirmed",
            hash,
            gas_used = receipt.gas_used
        );
        Ok(receipt)
    }

    async fn send(
        &self,
        signer: &SigningAccount,
        to: Address,
        function: &str,
        data: Vec<u8>,
    ) -> Result<TxHash, LedgerError> {
        let from = signer.address();
        let slot = self.sequencer.slot(from);
        let mut slot = slot.lock().await;

        let preflight = CallRequest {
            from: Some(from),
            to,
            data: data.clone(),
        };
        let estimate = match self.rpc.estimate_gas(&preflight).await {
            Ok(gas) if gas > self.config.gas_limit => Err(LedgerError::GasLimitExceeded {
                required: gas,
                limit: self.config.gas_limit,
            }),
            other => other,
        };
        if let Err(e) = estimate {
            LEDGER_TRANSACTIONS
                .with_label_values(&[function, "rejected"])
                .inc();
            return Err(e);
        }

        let nonce = match slot.next_nonce {
            Some(n) => n,
            None => self.rpc.transaction_count(from, true).await?,
        };
        let tx = LegacyTransaction {
            nonce,
            gas_price: self.rpc.gas_price().await?,
            gas_limit: self.config.gas_limit,
            to: Some(to),
            value: U256::zero(),
            data,
            chain_id: self.rpc.chain_id().await?,
        };
        let signed = tx.sign(signer)?;

        match self.rpc.send_raw_transaction(&signed.raw).await {
            Ok(hash) => {
                slot.next_nonce = Some(nonce + 1);
                log_tx_event!(debug, SUBSYSTEM, "transaction submitted", hash, nonce, function);
                Ok(hash)
            }
            Err(e) => {
                slot.next_nonce = None;
                LEDGER_TRANSACTIONS
                    .with_label_values(&[function, "rejected"])
                    .inc();
                log_event!(
                    warn,
                    SUBSYSTEM,
                    "submission failed, nonce reset",
                    nonce,
                    function,
                    error = %e
                );
                Err(e)
            }
        }
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, LedgerError> {
        let started = Instant::now();
        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(hash).await? {
                metric_observe!(LEDGER_RECEIPT_WAIT, started.elapsed().as_secs_f64());
                return Ok(receipt);
            }
            if let Some(timeout) = self.config.receipt_timeout {
                if started.elapsed() >= timeout {
                    return Err(LedgerError::ReceiptTimeout { tx_hash: hash });
                }
            }
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }

    /// Unsigned transaction for `from` to sign client-side.
    pub async fn prepare(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> Result<UnsignedTransaction, LedgerError> {
        let nonce = match self.sequencer.next_nonce(from).await {
            Some(n) => n,
            None => self.rpc.transaction_count(from, true).await?,
        };
        Ok(UnsignedTransaction {
            from,
            to,
            data,
            value: U256::zero(),
            gas: self.config.gas_limit,
            gas_price: self.rpc.gas_price().await?,
            nonce,
            chain_id: self.rpc.chain_id().await?,
        })
    }
}
