//! The public conversion surface.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use stablesettle_common::{
    ConversionError, ConversionFailure, CryptoConversion, Page, Quote, Result, TokenSymbol,
    UserId,
};
use stablesettle_ledger::LedgerStore;
use stablesettle_rates::{parse_amount, QuoteCalculator, RateStore};

use crate::config::EngineConfig;
use crate::executor::SettlementExecutor;
use crate::external::{
    BalanceGuard, CacheInvalidator, LedgerBalanceGuard, NoOpCacheInvalidator, StoreWalletLookup,
    WalletLookup,
};
use crate::lifecycle::ConversionLifecycle;
use crate::metrics::{EngineMetrics, SharedMetrics};

/// Result of a conversion request.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    /// The settled conversion record.
    pub conversion: CryptoConversion,
    /// User-facing message.
    pub message: String,
}

/// Orchestrates quoting, record creation, settlement, and post-commit
/// side effects.
pub struct ConversionService {
    store: Arc<LedgerStore>,
    calculator: QuoteCalculator,
    lifecycle: ConversionLifecycle,
    executor: SettlementExecutor,
    guard: Arc<dyn BalanceGuard>,
    wallets: Arc<dyn WalletLookup>,
    caches: Arc<dyn CacheInvalidator>,
    config: EngineConfig,
    metrics: SharedMetrics,
}

impl ConversionService {
    /// Create a service with store-backed collaborators.
    pub fn new(store: Arc<LedgerStore>, rates: Arc<RateStore>, config: EngineConfig) -> Self {
        let metrics: SharedMetrics = Arc::new(EngineMetrics::new());
        Self {
            calculator: QuoteCalculator::new(rates, config.quote.clone()),
            lifecycle: ConversionLifecycle::new(Arc::clone(&store)),
            executor: SettlementExecutor::new(
                Arc::clone(&store),
                config.settlement.clone(),
                Arc::clone(&metrics),
            ),
            guard: Arc::new(LedgerBalanceGuard::new(Arc::clone(&store))),
            wallets: Arc::new(StoreWalletLookup::new(Arc::clone(&store))),
            caches: Arc::new(NoOpCacheInvalidator),
            store,
            config,
            metrics,
        }
    }

    /// Replace the advisory balance guard.
    pub fn with_balance_guard(mut self, guard: Arc<dyn BalanceGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Replace the wallet lookup.
    pub fn with_wallet_lookup(mut self, wallets: Arc<dyn WalletLookup>) -> Self {
        self.wallets = wallets;
        self
    }

    /// Replace the cache invalidator.
    pub fn with_cache_invalidator(mut self, caches: Arc<dyn CacheInvalidator>) -> Self {
        self.caches = caches;
        self
    }

    /// Access the engine metrics.
    pub fn metrics(&self) -> SharedMetrics {
        Arc::clone(&self.metrics)
    }

    /// Quote a conversion without side effects.
    ///
    /// Validation order: amount, token, advisory balance, active rate. The
    /// balance check is best-effort; settlement re-validates under the row
    /// lock.
    #[instrument(skip(self), fields(user = %user_id, token = %token))]
    pub async fn get_quote(
        &self,
        user_id: &UserId,
        token: &TokenSymbol,
        amount: &str,
    ) -> Result<Quote> {
        let amount = parse_amount(amount)?;

        if !token.is_convertible() {
            return Err(ConversionError::UnsupportedToken(token.clone()));
        }

        let available = self.guard.available_balance(user_id, token).await;
        if available < amount {
            return Err(ConversionError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        let quote = self.calculator.quote(token, amount)?;
        self.metrics.quote_issued();
        Ok(quote)
    }

    /// Convert a user's token balance to naira.
    ///
    /// The quote is recomputed server-side here; a quote the caller obtained
    /// earlier is advisory display data, never an input. Every failure path
    /// finalizes the record FAILED before the error propagates — a
    /// conversion never ends PROCESSING from the caller's perspective.
    #[instrument(skip(self), fields(user = %user_id, token = %token))]
    pub async fn request_conversion(
        &self,
        user_id: &UserId,
        token: &TokenSymbol,
        amount: &str,
    ) -> Result<ConversionOutcome> {
        let quote = self.get_quote(user_id, token, amount).await?;

        let crypto_wallet = self.wallets.crypto_wallet(user_id).await?;
        let fiat_wallet = self
            .wallets
            .fiat_wallet(user_id, &self.config.quote.pair.quote)
            .await?;

        let conversion = self.lifecycle.create(user_id.clone(), &quote);
        self.metrics.conversion_initiated();

        match self
            .executor
            .settle(&conversion, crypto_wallet.id, fiat_wallet.id)
            .await
        {
            Ok(transaction_id) => {
                // The COMPLETED flip committed inside the settlement scope;
                // read the finalized record back.
                let settled = self.lifecycle.get(conversion.id).ok_or_else(|| {
                    ConversionError::Unexpected(format!(
                        "conversion {} missing after settlement",
                        conversion.id
                    ))
                })?;

                self.metrics.conversion_completed();
                self.invalidate_caches(user_id);

                info!(
                    conversion_id = %settled.id,
                    transaction_id = %transaction_id,
                    net_naira = %settled.net_naira,
                    "Conversion completed"
                );
                Ok(ConversionOutcome {
                    conversion: settled,
                    message: "Conversion completed successfully".to_string(),
                })
            }
            Err(error) => {
                self.metrics.conversion_failed();
                self.lifecycle.finalize_failed(
                    conversion.id,
                    ConversionFailure::new(error.failure_code(), error.user_message()),
                );
                warn!(
                    conversion_id = %conversion.id,
                    error = %error,
                    code = error.error_code(),
                    "Conversion failed"
                );
                Err(error)
            }
        }
    }

    /// A user's conversion history, newest first.
    pub fn conversion_history(
        &self,
        user_id: &UserId,
        page: usize,
        limit: usize,
    ) -> Page<CryptoConversion> {
        self.lifecycle.history(user_id, page, limit)
    }

    /// Post-commit cache invalidation. Best-effort: failures are logged and
    /// never fail the committed settlement.
    fn invalidate_caches(&self, user_id: &UserId) {
        if let Err(e) = self.caches.invalidate_wallet(user_id) {
            warn!(user = %user_id, error = %e, "Wallet cache invalidation failed");
        }
        if let Err(e) = self.caches.invalidate_transactions(user_id) {
            warn!(user = %user_id, error = %e, "Transaction cache invalidation failed");
        }
    }
}
