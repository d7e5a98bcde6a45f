//! Conversion record and status state machine.

use crate::{ConversionId, ConversionReference, TokenSymbol, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Conversion status representing the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionStatus {
    /// Record created, settlement not yet committed.
    Processing,
    /// Settlement committed; the fiat transaction is linked.
    Completed,
    /// Settlement aborted; balances untouched.
    Failed,
}

impl ConversionStatus {
    /// Check if this is a final state.
    pub fn is_final(&self) -> bool {
        matches!(self, ConversionStatus::Completed | ConversionStatus::Failed)
    }

    /// Check if the conversion is still in flight.
    pub fn is_in_progress(&self) -> bool {
        !self.is_final()
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[ConversionStatus] {
        match self {
            ConversionStatus::Processing => {
                &[ConversionStatus::Completed, ConversionStatus::Failed]
            }
            ConversionStatus::Completed => &[],
            ConversionStatus::Failed => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: ConversionStatus) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Error when attempting an invalid status transition.
#[derive(Debug, Clone)]
pub struct InvalidTransition {
    pub from: ConversionStatus,
    pub to: ConversionStatus,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid status transition from {:?} to {:?}",
            self.from, self.to
        )
    }
}

impl std::error::Error for InvalidTransition {}

/// A priced conversion quote.
///
/// Advisory only: the engine recomputes the quote server-side at execution
/// time and never trusts a value a client carried across the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Token being converted.
    pub token: TokenSymbol,
    /// Token amount to convert.
    pub crypto_amount: Decimal,
    /// USD valuation of the token amount.
    pub usd_value: Decimal,
    /// USD/NGN rate applied.
    pub rate: Decimal,
    /// Platform fee percentage applied.
    pub fee_percent: Decimal,
    /// Fee in naira.
    pub fee_amount: Decimal,
    /// Gross naira before fees.
    pub naira_amount: Decimal,
    /// Net naira credited on settlement.
    pub net_naira: Decimal,
    /// When the quote was computed.
    pub quoted_at: DateTime<Utc>,
    /// When the quote expires.
    pub expires_at: DateTime<Utc>,
}

impl Quote {
    /// Check if the quote is still within its validity window.
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// A durable conversion record, one row per conversion attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConversion {
    /// Unique record identifier.
    pub id: ConversionId,
    /// Owning user.
    pub user_id: UserId,
    /// Globally unique reference, generated once at creation.
    pub reference: ConversionReference,
    /// Token converted.
    pub token: TokenSymbol,
    /// Token amount debited.
    pub crypto_amount: Decimal,
    /// USD valuation at quote time.
    pub usd_value: Decimal,
    /// USD/NGN rate applied.
    pub exchange_rate: Decimal,
    /// Platform fee percentage applied.
    pub fee_percent: Decimal,
    /// Fee in naira.
    pub fee_amount: Decimal,
    /// Gross naira before fees.
    pub naira_amount: Decimal,
    /// Net naira credited.
    pub net_naira: Decimal,
    /// Current status.
    pub status: ConversionStatus,
    /// Fiat ledger transaction, set only on success.
    pub naira_transaction_id: Option<TransactionId>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record reached a final state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure information (if failed).
    pub failure: Option<ConversionFailure>,
}

impl CryptoConversion {
    /// Create a PROCESSING record from a server-side quote.
    ///
    /// The reference is generated here, exactly once; settlement retries
    /// reuse it unchanged.
    pub fn from_quote(user_id: UserId, quote: &Quote) -> Self {
        Self {
            id: ConversionId::new(),
            user_id,
            reference: ConversionReference::generate(),
            token: quote.token.clone(),
            crypto_amount: quote.crypto_amount,
            usd_value: quote.usd_value,
            exchange_rate: quote.rate,
            fee_percent: quote.fee_percent,
            fee_amount: quote.fee_amount,
            naira_amount: quote.naira_amount,
            net_naira: quote.net_naira,
            status: ConversionStatus::Processing,
            naira_transaction_id: None,
            created_at: Utc::now(),
            completed_at: None,
            failure: None,
        }
    }

    /// The deterministic reference of the fiat ledger leg.
    pub fn fiat_reference(&self) -> String {
        self.reference.fiat_leg()
    }

    /// Transition PROCESSING -> COMPLETED, linking the fiat transaction.
    pub fn complete(&mut self, transaction_id: TransactionId) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(ConversionStatus::Completed) {
            return Err(InvalidTransition {
                from: self.status,
                to: ConversionStatus::Completed,
            });
        }
        self.status = ConversionStatus::Completed;
        self.naira_transaction_id = Some(transaction_id);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Transition PROCESSING -> FAILED with failure details.
    pub fn fail(&mut self, failure: ConversionFailure) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(ConversionStatus::Failed) {
            return Err(InvalidTransition {
                from: self.status,
                to: ConversionStatus::Failed,
            });
        }
        self.status = ConversionStatus::Failed;
        self.failure = Some(failure);
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Conversion failure information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionFailure {
    /// Failure code.
    pub code: FailureCode,
    /// Human-readable message.
    pub message: String,
    /// When the failure occurred.
    pub failed_at: DateTime<Utc>,
}

impl ConversionFailure {
    /// Create a new failure record.
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Failure codes for conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    /// Crypto balance insufficient at settlement time.
    InsufficientFunds,
    /// Write conflicts persisted through every retry.
    TransactionConflict,
    /// One of the user's wallets could not be resolved.
    WalletNotFound,
    /// Request rejected before settlement started.
    InvalidRequest,
    /// Internal engine error.
    EngineError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_quote() -> Quote {
        let now = Utc::now();
        Quote {
            token: TokenSymbol::usdc(),
            crypto_amount: dec!(10),
            usd_value: dec!(10),
            rate: dec!(1500),
            fee_percent: dec!(1),
            fee_amount: dec!(150),
            naira_amount: dec!(15000),
            net_naira: dec!(14850),
            quoted_at: now,
            expires_at: now + chrono::Duration::minutes(5),
        }
    }

    #[test]
    fn test_record_starts_processing() {
        let conversion = CryptoConversion::from_quote(UserId::new("user-1"), &test_quote());
        assert_eq!(conversion.status, ConversionStatus::Processing);
        assert!(conversion.naira_transaction_id.is_none());
        assert!(conversion.completed_at.is_none());
    }

    #[test]
    fn test_fiat_reference_derivation() {
        let conversion = CryptoConversion::from_quote(UserId::new("user-1"), &test_quote());
        assert_eq!(
            conversion.fiat_reference(),
            format!("{}_NAIRA", conversion.reference)
        );
    }

    #[test]
    fn test_complete_links_transaction() {
        let mut conversion = CryptoConversion::from_quote(UserId::new("user-1"), &test_quote());
        let tx_id = TransactionId::new();

        conversion.complete(tx_id).unwrap();

        assert_eq!(conversion.status, ConversionStatus::Completed);
        assert_eq!(conversion.naira_transaction_id, Some(tx_id));
        assert!(conversion.completed_at.is_some());
    }

    #[test]
    fn test_status_is_monotonic() {
        let mut conversion = CryptoConversion::from_quote(UserId::new("user-1"), &test_quote());
        conversion
            .fail(ConversionFailure::new(
                FailureCode::InsufficientFunds,
                "short funds",
            ))
            .unwrap();

        // A final record can never move again.
        assert!(conversion.complete(TransactionId::new()).is_err());
        assert!(conversion
            .fail(ConversionFailure::new(FailureCode::EngineError, "again"))
            .is_err());
        assert_eq!(conversion.status, ConversionStatus::Failed);
    }

    #[test]
    fn test_valid_transitions() {
        assert!(ConversionStatus::Processing.can_transition_to(ConversionStatus::Completed));
        assert!(ConversionStatus::Processing.can_transition_to(ConversionStatus::Failed));
        assert!(!ConversionStatus::Completed.can_transition_to(ConversionStatus::Failed));
        assert!(!ConversionStatus::Failed.can_transition_to(ConversionStatus::Completed));
        assert!(ConversionStatus::Completed.is_final());
    }
}
