//! Error taxonomy for StableSettle operations.

use crate::{
    ConversionStatus, CurrencyPair, FailureCode, TokenSymbol, UserId,
};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for conversion operations.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Amount failed validation before anything else ran.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Token is not eligible for conversion.
    #[error("Unsupported token: {0}")]
    UnsupportedToken(TokenSymbol),

    /// Balance is short of the requested amount.
    ///
    /// Raised by the advisory pre-check and again, authoritatively, by the
    /// in-transaction re-check.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    /// No active exchange rate for the pair.
    #[error("No active exchange rate for {0}")]
    NoActiveRate(CurrencyPair),

    /// A wallet could not be resolved for the user.
    #[error("Wallet not found: {wallet} for user {user_id}")]
    WalletNotFound { user_id: UserId, wallet: String },

    /// Write conflicts persisted through every settlement attempt.
    #[error("Transaction conflict after {attempts} attempts")]
    TransactionConflict { attempts: u32 },

    /// A row lock could not be acquired within the configured window.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// Invalid conversion status transition.
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConversionStatus,
        to: ConversionStatus,
    },

    /// Any other internal error. Detail is logged, never exposed.
    #[error("Internal error: {0}")]
    Unexpected(String),
}

impl ConversionError {
    /// Check if this error is retryable within the settlement loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConversionError::TransactionConflict { .. } | ConversionError::LockTimeout(_)
        )
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConversionError::InvalidAmount { .. } => "INVALID_AMOUNT",
            ConversionError::UnsupportedToken(_) => "UNSUPPORTED_TOKEN",
            ConversionError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ConversionError::NoActiveRate(_) => "NO_ACTIVE_RATE",
            ConversionError::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            ConversionError::TransactionConflict { .. } => "TRANSACTION_CONFLICT",
            ConversionError::LockTimeout(_) => "LOCK_TIMEOUT",
            ConversionError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ConversionError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the message shown to the end user.
    pub fn user_message(&self) -> String {
        match self {
            ConversionError::InvalidAmount { reason } => format!("Invalid amount: {reason}"),
            ConversionError::UnsupportedToken(token) => {
                format!("{token} is not supported for conversion")
            }
            ConversionError::InsufficientBalance { .. } => {
                "Insufficient balance for this conversion".to_string()
            }
            ConversionError::NoActiveRate(_) => {
                "Exchange rate unavailable, please try again later".to_string()
            }
            ConversionError::WalletNotFound { wallet, .. } => {
                format!("{wallet} wallet not found")
            }
            ConversionError::TransactionConflict { .. } => {
                "Transaction conflict, please retry".to_string()
            }
            ConversionError::LockTimeout(_) => "System busy, please retry".to_string(),
            ConversionError::InvalidTransition { .. } | ConversionError::Unexpected(_) => {
                "Conversion failed, please try again later".to_string()
            }
        }
    }

    /// Map to the failure code recorded on a FAILED conversion row.
    pub fn failure_code(&self) -> FailureCode {
        match self {
            ConversionError::InsufficientBalance { .. } => FailureCode::InsufficientFunds,
            ConversionError::TransactionConflict { .. } | ConversionError::LockTimeout(_) => {
                FailureCode::TransactionConflict
            }
            ConversionError::WalletNotFound { .. } => FailureCode::WalletNotFound,
            ConversionError::InvalidAmount { .. }
            | ConversionError::UnsupportedToken(_)
            | ConversionError::NoActiveRate(_) => FailureCode::InvalidRequest,
            ConversionError::InvalidTransition { .. } | ConversionError::Unexpected(_) => {
                FailureCode::EngineError
            }
        }
    }
}

impl From<crate::InvalidTransition> for ConversionError {
    fn from(e: crate::InvalidTransition) -> Self {
        ConversionError::InvalidTransition {
            from: e.from,
            to: e.to,
        }
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(ConversionError::TransactionConflict { attempts: 3 }.is_retryable());
        assert!(ConversionError::LockTimeout("crypto row".into()).is_retryable());
        assert!(!ConversionError::InsufficientBalance {
            required: dec!(10),
            available: dec!(5)
        }
        .is_retryable());
        assert!(!ConversionError::Unexpected("boom".into()).is_retryable());
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = ConversionError::Unexpected("connection pool exhausted at 10.0.4.2".into());
        assert!(!err.user_message().contains("10.0.4.2"));
    }

    #[test]
    fn test_conflict_user_message() {
        let err = ConversionError::TransactionConflict { attempts: 3 };
        assert_eq!(err.user_message(), "Transaction conflict, please retry");
        assert_eq!(err.error_code(), "TRANSACTION_CONFLICT");
        assert_eq!(err.failure_code(), FailureCode::TransactionConflict);
    }
}
