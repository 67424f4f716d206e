use cl_01_ledger_adapter::LedgerError;
use shared_types::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Classify for AuditError {
    fn kind(&self) -> ErrorKind {
        match self {
            AuditError::Ledger(e) => e.kind(),
        }
    }
}
