//! Append-only transaction journal rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stablesettle_common::{Currency, TransactionId, WalletId};

/// Journal entry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Crypto balance converted into naira.
    CryptoToNaira,
}

impl TransactionType {
    /// Get the type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::CryptoToNaira => "CRYPTO_TO_NAIRA",
        }
    }
}

/// One journal row. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Row identifier.
    pub id: TransactionId,
    /// Wallet the row mutated.
    pub wallet_id: WalletId,
    /// Entry type.
    pub tx_type: TransactionType,
    /// Net amount credited.
    pub amount: Decimal,
    /// Platform fee charged.
    pub fee: Decimal,
    /// Gross amount (`amount + fee`).
    pub total_amount: Decimal,
    /// Wallet balance before the write.
    pub balance_before: Decimal,
    /// Wallet balance after the write.
    pub balance_after: Decimal,
    /// Currency of the mutated wallet.
    pub currency: Currency,
    /// Deterministic reference, unique across the journal.
    pub reference: String,
    /// When the row was written.
    pub completed_at: DateTime<Utc>,
}

impl Transaction {
    /// Build the fiat-leg journal row for a conversion settlement.
    #[allow(clippy::too_many_arguments)]
    pub fn crypto_to_naira(
        wallet_id: WalletId,
        amount: Decimal,
        fee: Decimal,
        balance_before: Decimal,
        balance_after: Decimal,
        currency: Currency,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            wallet_id,
            tx_type: TransactionType::CryptoToNaira,
            amount,
            fee,
            total_amount: amount + fee,
            balance_before,
            balance_after,
            currency,
            reference: reference.into(),
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_amount_is_gross() {
        let tx = Transaction::crypto_to_naira(
            WalletId::new(),
            dec!(14850),
            dec!(150),
            dec!(0),
            dec!(14850),
            Currency::ngn(),
            "CNVABC_NAIRA",
        );
        assert_eq!(tx.total_amount, dec!(15000));
        assert_eq!(tx.tx_type.as_str(), "CRYPTO_TO_NAIRA");
    }
}
