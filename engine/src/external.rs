//! External collaborator interfaces.
//!
//! The engine consumes these as black boxes: an advisory balance check, a
//! wallet directory, and post-commit cache invalidation. Store-backed
//! defaults are provided; production deployments swap in their own.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stablesettle_common::{ConversionError, Currency, Result, TokenSymbol, UserId, WalletId};
use stablesettle_ledger::LedgerStore;

/// Reference to a user's crypto wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoWalletRef {
    /// Wallet identifier.
    pub id: WalletId,
    /// Custody address.
    pub wallet_address: Option<String>,
}

/// Reference to a user's fiat wallet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FiatWalletRef {
    /// Wallet identifier.
    pub id: WalletId,
}

/// Advisory balance check.
///
/// Non-atomic by design: it rejects the obviously short request cheaply,
/// and the settlement transaction re-validates authoritatively under the
/// row lock.
#[async_trait]
pub trait BalanceGuard: Send + Sync {
    /// The user's current balance of a token, best-effort.
    async fn available_balance(&self, user_id: &UserId, token: &TokenSymbol) -> Decimal;

    /// Whether the user appears to hold at least `amount` of `token`.
    async fn has_sufficient_balance(
        &self,
        user_id: &UserId,
        token: &TokenSymbol,
        amount: Decimal,
    ) -> bool {
        self.available_balance(user_id, token).await >= amount
    }
}

/// Balance guard reading the ledger store directly.
pub struct LedgerBalanceGuard {
    store: Arc<LedgerStore>,
}

impl LedgerBalanceGuard {
    /// Create a guard over a store.
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BalanceGuard for LedgerBalanceGuard {
    async fn available_balance(&self, user_id: &UserId, token: &TokenSymbol) -> Decimal {
        let Some(wallet_id) = self.store.crypto_wallet_of(user_id) else {
            return Decimal::ZERO;
        };
        self.store
            .crypto_balance(wallet_id, token)
            .await
            .map(|b| b.balance)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Wallet directory.
#[async_trait]
pub trait WalletLookup: Send + Sync {
    /// Resolve the user's crypto wallet.
    async fn crypto_wallet(&self, user_id: &UserId) -> Result<CryptoWalletRef>;

    /// Resolve the user's fiat wallet for a currency.
    async fn fiat_wallet(&self, user_id: &UserId, currency: &Currency) -> Result<FiatWalletRef>;
}

/// Wallet lookup backed by the ledger store.
pub struct StoreWalletLookup {
    store: Arc<LedgerStore>,
}

impl StoreWalletLookup {
    /// Create a lookup over a store.
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WalletLookup for StoreWalletLookup {
    async fn crypto_wallet(&self, user_id: &UserId) -> Result<CryptoWalletRef> {
        let id = self.store.crypto_wallet_of(user_id).ok_or_else(|| {
            ConversionError::WalletNotFound {
                user_id: user_id.clone(),
                wallet: "crypto".to_string(),
            }
        })?;
        let wallet = self
            .store
            .wallet(id)
            .await
            .ok_or_else(|| ConversionError::WalletNotFound {
                user_id: user_id.clone(),
                wallet: "crypto".to_string(),
            })?;
        Ok(CryptoWalletRef {
            id,
            wallet_address: wallet.wallet_address,
        })
    }

    async fn fiat_wallet(&self, user_id: &UserId, currency: &Currency) -> Result<FiatWalletRef> {
        let id = self.store.fiat_wallet_of(user_id, currency).ok_or_else(|| {
            ConversionError::WalletNotFound {
                user_id: user_id.clone(),
                wallet: currency.code().to_string(),
            }
        })?;
        Ok(FiatWalletRef { id })
    }
}

/// Post-commit cache invalidation. Fire-and-forget: a returned error is
/// logged by the caller and never affects the committed settlement.
pub trait CacheInvalidator: Send + Sync {
    /// Invalidate the user's wallet caches.
    fn invalidate_wallet(&self, user_id: &UserId) -> std::result::Result<(), String>;

    /// Invalidate the user's transaction caches.
    fn invalidate_transactions(&self, user_id: &UserId) -> std::result::Result<(), String>;
}

/// Cache invalidator that does nothing.
pub struct NoOpCacheInvalidator;

impl CacheInvalidator for NoOpCacheInvalidator {
    fn invalidate_wallet(&self, _user_id: &UserId) -> std::result::Result<(), String> {
        Ok(())
    }

    fn invalidate_transactions(&self, _user_id: &UserId) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Cache invalidator that records calls, for tests.
#[cfg(any(test, feature = "test-utils"))]
pub struct RecordingCacheInvalidator {
    wallet_calls: parking_lot::Mutex<Vec<UserId>>,
    transaction_calls: parking_lot::Mutex<Vec<UserId>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingCacheInvalidator {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            wallet_calls: parking_lot::Mutex::new(Vec::new()),
            transaction_calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Number of wallet invalidations observed.
    pub fn wallet_invalidations(&self) -> usize {
        self.wallet_calls.lock().len()
    }

    /// Number of transaction invalidations observed.
    pub fn transaction_invalidations(&self) -> usize {
        self.transaction_calls.lock().len()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for RecordingCacheInvalidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl CacheInvalidator for RecordingCacheInvalidator {
    fn invalidate_wallet(&self, user_id: &UserId) -> std::result::Result<(), String> {
        self.wallet_calls.lock().push(user_id.clone());
        Ok(())
    }

    fn invalidate_transactions(&self, user_id: &UserId) -> std::result::Result<(), String> {
        self.transaction_calls.lock().push(user_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stablesettle_ledger::Wallet;

    #[tokio::test]
    async fn test_ledger_guard_reads_balance() {
        let store = Arc::new(LedgerStore::new());
        let user = UserId::new("u1");
        let wallet_id = store.register_wallet(Wallet::new_crypto(user.clone(), "0xabc"));
        store
            .credit_crypto_balance(wallet_id, &TokenSymbol::usdc(), dec!(12), "12000000")
            .await;

        let guard = LedgerBalanceGuard::new(store);

        assert_eq!(guard.available_balance(&user, &TokenSymbol::usdc()).await, dec!(12));
        assert!(guard.has_sufficient_balance(&user, &TokenSymbol::usdc(), dec!(12)).await);
        assert!(!guard.has_sufficient_balance(&user, &TokenSymbol::usdc(), dec!(13)).await);
        // Unknown user and unknown token both read as zero.
        assert_eq!(
            guard.available_balance(&UserId::new("ghost"), &TokenSymbol::usdc()).await,
            Decimal::ZERO
        );
        assert_eq!(
            guard.available_balance(&user, &TokenSymbol::usdt()).await,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_store_wallet_lookup() {
        let store = Arc::new(LedgerStore::new());
        let user = UserId::new("u1");
        store.register_wallet(Wallet::new_crypto(user.clone(), "0xabc"));
        store.register_wallet(Wallet::new_fiat(user.clone(), Currency::ngn()).unwrap());

        let lookup = StoreWalletLookup::new(store);

        let crypto = lookup.crypto_wallet(&user).await.unwrap();
        assert_eq!(crypto.wallet_address.as_deref(), Some("0xabc"));
        assert!(lookup.fiat_wallet(&user, &Currency::ngn()).await.is_ok());

        let missing = lookup.fiat_wallet(&user, &Currency::usd()).await;
        assert!(matches!(
            missing,
            Err(ConversionError::WalletNotFound { .. })
        ));
    }
}
