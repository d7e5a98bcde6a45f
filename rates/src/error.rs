//! Rate engine error types.

use rust_decimal::Decimal;
use stablesettle_common::{ConversionError, CurrencyPair, TokenSymbol};
use thiserror::Error;

/// Errors that can occur in the rate engine.
#[derive(Debug, Error)]
pub enum RateError {
    /// Amount is not a positive decimal.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Token is not eligible for conversion.
    #[error("Unsupported token: {0}")]
    UnsupportedToken(TokenSymbol),

    /// No active rate row exists for the pair.
    #[error("No active exchange rate for {0}")]
    NoActiveRate(CurrencyPair),

    /// Rate must be strictly positive.
    #[error("Invalid rate: {rate}")]
    InvalidRate { rate: Decimal },

    /// Fee percentage must be within [0, 100).
    #[error("Invalid fee percentage: {fee_percent}")]
    InvalidFeePercent { fee_percent: Decimal },
}

/// Result type for rate operations.
pub type RateResult<T> = Result<T, RateError>;

impl From<RateError> for ConversionError {
    fn from(e: RateError) -> Self {
        match e {
            RateError::InvalidAmount(reason) => ConversionError::InvalidAmount { reason },
            RateError::UnsupportedToken(token) => ConversionError::UnsupportedToken(token),
            RateError::NoActiveRate(pair) => ConversionError::NoActiveRate(pair),
            RateError::InvalidRate { .. } | RateError::InvalidFeePercent { .. } => {
                ConversionError::Unexpected(e.to_string())
            }
        }
    }
}
