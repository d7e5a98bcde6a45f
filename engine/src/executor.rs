//! The settlement executor: the atomic core of the engine.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use stablesettle_common::{
    ConversionError, CryptoConversion, Money, Result, TransactionId, WalletId,
};
use stablesettle_ledger::{LedgerError, LedgerResult, LedgerStore, Transaction};

use crate::config::SettlementConfig;
use crate::metrics::SharedMetrics;

/// Executes the atomic settlement of a PROCESSING conversion.
///
/// One attempt is the full sequence: lock the crypto balance row, re-check
/// and stage the debit, lock the fiat wallet row (always in that order),
/// stage the credit, the journal row, and the record completion, then
/// commit. A write conflict aborts the whole attempt, which is retried from
/// scratch with exponential backoff up to the configured bound.
pub struct SettlementExecutor {
    store: Arc<LedgerStore>,
    config: SettlementConfig,
    metrics: SharedMetrics,
}

impl SettlementExecutor {
    /// Create a new executor.
    pub fn new(store: Arc<LedgerStore>, config: SettlementConfig, metrics: SharedMetrics) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    /// Settle a conversion against the given wallets.
    #[instrument(skip(self, conversion), fields(
        conversion_id = %conversion.id,
        reference = %conversion.reference
    ))]
    pub async fn settle(
        &self,
        conversion: &CryptoConversion,
        crypto_wallet: WalletId,
        fiat_wallet: WalletId,
    ) -> Result<TransactionId> {
        let fiat_reference = conversion.fiat_reference();

        // A journal row under this reference means a prior attempt of the
        // same conversion already committed; replaying the request must not
        // move balances again.
        if let Some(existing) = self.store.find_transaction_by_reference(&fiat_reference) {
            info!(
                transaction_id = %existing.id,
                "Settlement already committed for this reference"
            );
            return Ok(existing.id);
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            let outcome = tokio::time::timeout(
                self.config.statement_timeout,
                self.attempt(conversion, crypto_wallet, fiat_wallet, &fiat_reference),
            )
            .await;

            let ledger_error = match outcome {
                Ok(Ok(transaction_id)) => {
                    info!(
                        transaction_id = %transaction_id,
                        attempt,
                        "Settlement committed"
                    );
                    return Ok(transaction_id);
                }
                Ok(Err(e)) => e,
                Err(_) => {
                    error!(attempt, "Settlement attempt exceeded the statement timeout");
                    return Err(ConversionError::Unexpected(
                        "settlement attempt exceeded statement timeout".to_string(),
                    ));
                }
            };

            if !ledger_error.is_retryable() {
                warn!(attempt, error = %ledger_error, "Settlement aborted");
                return Err(map_ledger_error(ledger_error));
            }

            self.metrics.settlement_conflict();

            if attempt >= max_attempts {
                warn!(attempts = attempt, "Settlement retries exhausted");
                self.metrics.retries_exhausted_inc();
                return Err(ConversionError::TransactionConflict { attempts: attempt });
            }

            let backoff = self.config.backoff_base * 2u32.pow(attempt - 1);
            debug!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %ledger_error,
                "Retrying settlement after conflict"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
            self.metrics.settlement_retry();
        }
    }

    /// One full settlement attempt inside an explicit transaction scope.
    async fn attempt(
        &self,
        conversion: &CryptoConversion,
        crypto_wallet: WalletId,
        fiat_wallet: WalletId,
        fiat_reference: &str,
    ) -> LedgerResult<TransactionId> {
        let mut tx = self.store.begin_settlement();

        tx.lock_crypto_balance(crypto_wallet, &conversion.token)
            .await?;
        tx.debit_crypto(conversion.crypto_amount)?;

        let fiat = tx.lock_fiat_wallet(fiat_wallet).await?;
        let snapshot = tx.credit_fiat(Money::new(conversion.net_naira, fiat.currency.clone()))?;

        let journal_row = Transaction::crypto_to_naira(
            fiat_wallet,
            conversion.net_naira,
            conversion.fee_amount,
            snapshot.before,
            snapshot.after,
            fiat.currency,
            fiat_reference,
        );
        let transaction_id = journal_row.id;
        tx.stage_transaction(journal_row);
        tx.complete_conversion(conversion.id, transaction_id);

        tx.commit()?;
        Ok(transaction_id)
    }
}

/// Map a non-retryable ledger error to the caller-facing taxonomy.
fn map_ledger_error(error: LedgerError) -> ConversionError {
    match error {
        LedgerError::InsufficientFunds {
            required,
            available,
        } => ConversionError::InsufficientBalance {
            required,
            available,
        },
        LedgerError::LockTimeout(what) => ConversionError::LockTimeout(what),
        other => ConversionError::Unexpected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stablesettle_common::{
        ConversionStatus, Currency, Quote, TokenSymbol, UserId,
    };
    use stablesettle_ledger::Wallet;

    async fn seeded(
        usdc: rust_decimal::Decimal,
    ) -> (Arc<LedgerStore>, WalletId, WalletId, CryptoConversion) {
        let store = Arc::new(LedgerStore::new());
        let user = UserId::new("u1");
        let crypto_id = store.register_wallet(Wallet::new_crypto(user.clone(), "0xabc"));
        let naira_id =
            store.register_wallet(Wallet::new_fiat(user.clone(), Currency::ngn()).unwrap());
        store
            .credit_crypto_balance(crypto_id, &TokenSymbol::usdc(), usdc, "seed")
            .await;

        let now = stablesettle_common::time::now();
        let quote = Quote {
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
        };
        let conversion = CryptoConversion::from_quote(user, &quote);
        store.insert_conversion(conversion.clone());

        (store, crypto_id, naira_id, conversion)
    }

    fn executor(store: &Arc<LedgerStore>) -> SettlementExecutor {
        SettlementExecutor::new(
            Arc::clone(store),
            SettlementConfig {
                backoff_base: std::time::Duration::from_millis(5),
                ..SettlementConfig::default()
            },
            Arc::new(crate::metrics::EngineMetrics::new()),
        )
    }

    #[tokio::test]
    async fn test_settle_commits_once() {
        let (store, crypto_id, naira_id, conversion) = seeded(dec!(25)).await;
        let executor = executor(&store);

        let tx_id = executor
            .settle(&conversion, crypto_id, naira_id)
            .await
            .unwrap();

        let stored = store.conversion(conversion.id).unwrap();
        assert_eq!(stored.status, ConversionStatus::Completed);
        assert_eq!(stored.naira_transaction_id, Some(tx_id));
        assert_eq!(store.journal_len(), 1);
    }

    #[tokio::test]
    async fn test_settle_is_idempotent_per_reference() {
        let (store, crypto_id, naira_id, conversion) = seeded(dec!(25)).await;
        let executor = executor(&store);

        let first = executor
            .settle(&conversion, crypto_id, naira_id)
            .await
            .unwrap();
        // Replaying the whole request returns the committed row untouched.
        let second = executor
            .settle(&conversion, crypto_id, naira_id)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.journal_len(), 1);
        let crypto = store
            .crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        assert_eq!(crypto.balance, dec!(15));
    }

    #[tokio::test]
    async fn test_conflicts_then_success_leaves_one_row() {
        let (store, crypto_id, naira_id, conversion) = seeded(dec!(25)).await;
        let executor = executor(&store);

        store.faults().inject_commit_conflicts(2);
        let tx_id = executor
            .settle(&conversion, crypto_id, naira_id)
            .await
            .unwrap();

        assert_eq!(store.journal_len(), 1);
        assert_eq!(
            store.conversion(conversion.id).unwrap().naira_transaction_id,
            Some(tx_id)
        );
        let snapshot = executor.metrics.snapshot();
        assert_eq!(snapshot.settlement_conflicts, 2);
        assert_eq!(snapshot.settlement_retries, 2);
    }

    #[tokio::test]
    async fn test_exhausted_conflicts_fail_without_mutation() {
        let (store, crypto_id, naira_id, conversion) = seeded(dec!(25)).await;
        let executor = executor(&store);

        store.faults().inject_commit_conflicts(3);
        let result = executor.settle(&conversion, crypto_id, naira_id).await;

        assert!(matches!(
            result,
            Err(ConversionError::TransactionConflict { attempts: 3 })
        ));
        assert_eq!(store.journal_len(), 0);
        let crypto = store
            .crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        assert_eq!(crypto.balance, dec!(25));
        let naira = store.wallet(naira_id).await.unwrap();
        assert_eq!(naira.balance, dec!(0));
        assert_eq!(executor.metrics.snapshot().retries_exhausted, 1);
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_not_retried() {
        let (store, crypto_id, naira_id, conversion) = seeded(dec!(5)).await;
        let executor = executor(&store);

        let result = executor.settle(&conversion, crypto_id, naira_id).await;

        assert!(matches!(
            result,
            Err(ConversionError::InsufficientBalance { .. })
        ));
        assert_eq!(executor.metrics.snapshot().settlement_conflicts, 0);
        assert_eq!(store.journal_len(), 0);
    }

    #[tokio::test]
    async fn test_storage_error_aborts_immediately() {
        let (store, crypto_id, naira_id, conversion) = seeded(dec!(25)).await;
        let executor = executor(&store);

        store.faults().inject_commit_errors(1);
        let result = executor.settle(&conversion, crypto_id, naira_id).await;

        assert!(matches!(result, Err(ConversionError::Unexpected(_))));
        assert_eq!(executor.metrics.snapshot().settlement_retries, 0);
        assert_eq!(store.journal_len(), 0);
    }
}
