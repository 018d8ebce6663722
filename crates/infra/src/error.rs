use thiserror::Error;

use stockledger_core::{DomainError, Sku};

use crate::store::StoreError;

/// Error returned by the catalog, registry, ledger and read-model services.
///
/// Flattens the two layers a call can fail in: deterministic domain rejections,
/// and storage failures. Every variant guarantees the call had no effect.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("item {sku} kept changing concurrently; gave up after {attempts} attempt(s)")]
    Conflict { sku: Sku, attempts: u32 },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    /// The domain rejection, if that is what this is.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(e) => LedgerError::Domain(e),
            StoreError::Conflict { sku, .. } => LedgerError::Conflict { sku, attempts: 1 },
            StoreError::Unavailable(msg) => LedgerError::Storage(msg),
            StoreError::Corrupt(msg) => LedgerError::Storage(format!("corrupt data: {msg}")),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
