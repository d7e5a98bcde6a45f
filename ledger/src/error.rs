//! Ledger store error types.

use rust_decimal::Decimal;
use stablesettle_common::{ConversionId, Currency};
use thiserror::Error;

/// Errors raised by the ledger store.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store detected a write conflict at commit.
    #[error("Serialization conflict: {0}")]
    SerializationConflict(String),

    /// A row lock could not be acquired within the configured window.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// The fixed lock order (crypto balance before fiat wallet) was violated.
    #[error("Lock order violation: crypto balance row must be locked before the fiat wallet row")]
    LockOrderViolation,

    /// A staged write was attempted without the backing row lock.
    #[error("No lock held on {0}")]
    MissingLock(&'static str),

    /// A referenced row does not exist.
    #[error("Row not found: {what}")]
    RowNotFound { what: String },

    /// Debit would take the balance negative.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Credit currency does not match the wallet currency.
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },

    /// A journal row with this reference already exists.
    #[error("Duplicate journal reference: {0}")]
    DuplicateReference(String),

    /// The conversion row left PROCESSING before commit.
    #[error("Conversion {0} is no longer processing")]
    ConversionNotProcessing(ConversionId),

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Check if this error class is retryable from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::SerializationConflict(_) | LedgerError::LockTimeout(_)
        )
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
