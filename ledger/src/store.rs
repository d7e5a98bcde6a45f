//! The ledger store and its settlement transaction scope.
//!
//! All shared mutable balance state lives here. Every writer of a wallet or
//! crypto-balance row goes through the row's lock — the settlement scope
//! below and the sync-path writer alike — so no code path can mutate a
//! balance another holds locked.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use stablesettle_common::{
    time, ConversionId, CryptoConversion, Currency, DurationExt, Money, Page, TokenSymbol,
    TransactionId, UserId, WalletId,
};

use crate::error::{LedgerError, LedgerResult};
use crate::faults::FaultInjector;
use crate::transaction::Transaction;
use crate::wallet::{CryptoBalance, Wallet, WalletKind};

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Row lock acquisition timeout.
    pub lock_timeout: std::time::Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout: time::constants::lock_acquisition_timeout().as_std(),
        }
    }
}

/// Before/after balance snapshot from a staged write.
#[derive(Debug, Clone, Copy)]
pub struct BalanceSnapshot {
    /// Balance before the write.
    pub before: Decimal,
    /// Balance after the write.
    pub after: Decimal,
}

/// In-memory ledger store with row-level locking.
pub struct LedgerStore {
    wallets: DashMap<WalletId, Arc<Mutex<Wallet>>>,
    user_wallets: DashMap<(UserId, WalletKind), WalletId>,
    crypto_balances: DashMap<(WalletId, TokenSymbol), Arc<Mutex<CryptoBalance>>>,
    journal: RwLock<Vec<Transaction>>,
    journal_refs: DashMap<String, TransactionId>,
    conversions: DashMap<ConversionId, CryptoConversion>,
    user_conversions: DashMap<UserId, Vec<ConversionId>>,
    faults: FaultInjector,
    config: StoreConfig,
}

impl LedgerStore {
    /// Create an empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with custom configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            wallets: DashMap::new(),
            user_wallets: DashMap::new(),
            crypto_balances: DashMap::new(),
            journal: RwLock::new(Vec::new()),
            journal_refs: DashMap::new(),
            conversions: DashMap::new(),
            user_conversions: DashMap::new(),
            faults: FaultInjector::new(),
            config,
        }
    }

    /// Access the fault injector.
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    // --- wallets -----------------------------------------------------------

    /// Register a wallet row.
    pub fn register_wallet(&self, wallet: Wallet) -> WalletId {
        let id = wallet.id;
        self.user_wallets
            .insert((wallet.user_id.clone(), wallet.kind), id);
        self.wallets.insert(id, Arc::new(Mutex::new(wallet)));
        id
    }

    /// Resolve a user's crypto wallet.
    pub fn crypto_wallet_of(&self, user_id: &UserId) -> Option<WalletId> {
        self.user_wallets
            .get(&(user_id.clone(), WalletKind::Crypto))
            .map(|e| *e.value())
    }

    /// Resolve a user's fiat wallet for a currency.
    pub fn fiat_wallet_of(&self, user_id: &UserId, currency: &Currency) -> Option<WalletId> {
        let kind = WalletKind::for_fiat(currency)?;
        self.user_wallets
            .get(&(user_id.clone(), kind))
            .map(|e| *e.value())
    }

    /// Read a wallet row.
    pub async fn wallet(&self, id: WalletId) -> Option<Wallet> {
        let cell = self.wallets.get(&id).map(|e| Arc::clone(e.value()))?;
        let row = cell.lock().await;
        Some(row.clone())
    }

    // --- crypto balances ---------------------------------------------------

    /// Credit a crypto balance row, creating it if absent.
    ///
    /// This is the sync-path writer: it takes the same row lock settlement
    /// takes, so a concurrent settlement and balance sync can never
    /// interleave their read-modify-write.
    pub async fn credit_crypto_balance(
        &self,
        wallet_id: WalletId,
        token: &TokenSymbol,
        delta: Decimal,
        raw_balance: impl Into<String>,
    ) -> CryptoBalance {
        let cell = Arc::clone(
            self.crypto_balances
                .entry((wallet_id, token.clone()))
                .or_insert_with(|| {
                    Arc::new(Mutex::new(CryptoBalance::new(
                        wallet_id,
                        token.clone(),
                        Decimal::ZERO,
                        "0",
                    )))
                })
                .value(),
        );

        let mut row = cell.lock().await;
        row.balance += delta;
        row.raw_balance = raw_balance.into();
        row.usd_value = row.balance * row.usd_price;
        row.last_updated = time::now();
        row.clone()
    }

    /// Read a crypto balance row.
    pub async fn crypto_balance(
        &self,
        wallet_id: WalletId,
        token: &TokenSymbol,
    ) -> Option<CryptoBalance> {
        let cell = self
            .crypto_balances
            .get(&(wallet_id, token.clone()))
            .map(|e| Arc::clone(e.value()))?;
        let row = cell.lock().await;
        Some(row.clone())
    }

    // --- journal -----------------------------------------------------------

    /// Find a journal row by its unique reference.
    pub fn find_transaction_by_reference(&self, reference: &str) -> Option<Transaction> {
        let id = *self.journal_refs.get(reference)?.value();
        self.journal.read().iter().find(|t| t.id == id).cloned()
    }

    /// All journal rows for a wallet, newest first.
    pub fn transactions_for_wallet(&self, wallet_id: WalletId) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self
            .journal
            .read()
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        rows
    }

    /// Total journal rows.
    pub fn journal_len(&self) -> usize {
        self.journal.read().len()
    }

    // --- conversions -------------------------------------------------------

    /// Insert a conversion record.
    pub fn insert_conversion(&self, conversion: CryptoConversion) {
        self.user_conversions
            .entry(conversion.user_id.clone())
            .or_default()
            .push(conversion.id);
        self.conversions.insert(conversion.id, conversion);
    }

    /// Read a conversion record.
    pub fn conversion(&self, id: ConversionId) -> Option<CryptoConversion> {
        self.conversions.get(&id).map(|e| e.value().clone())
    }

    /// Apply a mutation to a conversion record.
    pub fn update_conversion<R>(
        &self,
        id: ConversionId,
        f: impl FnOnce(&mut CryptoConversion) -> R,
    ) -> Option<R> {
        self.conversions.get_mut(&id).map(|mut e| f(e.value_mut()))
    }

    /// A user's conversions, newest first, paginated. Pages are 1-based.
    pub fn conversions_for_user(
        &self,
        user_id: &UserId,
        page: usize,
        limit: usize,
    ) -> Page<CryptoConversion> {
        let ids = self
            .user_conversions
            .get(user_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        let mut rows: Vec<CryptoConversion> = ids
            .iter()
            .filter_map(|id| self.conversion(*id))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = rows.len();
        let page = page.max(1);
        let limit = limit.max(1);
        let items = rows
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        Page::new(items, page, limit, total)
    }

    // --- settlement scope --------------------------------------------------

    /// Open a settlement transaction scope.
    ///
    /// The scope holds row locks from acquisition to commit, so everything
    /// it reads stays true until its writes land — the property serializable
    /// isolation gives the original storage engine. Dropping the scope
    /// without committing discards every staged write.
    pub fn begin_settlement(&self) -> SettlementTx<'_> {
        SettlementTx {
            store: self,
            crypto_lock: None,
            fiat_lock: None,
            staged_crypto: None,
            staged_fiat: None,
            staged_transaction: None,
            staged_completion: None,
        }
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

struct StagedCrypto {
    new_balance: Decimal,
    new_usd_value: Decimal,
}

struct StagedFiat {
    new_balance: Decimal,
    new_ledger_balance: Decimal,
}

/// An explicit settlement transaction handle.
///
/// Mutating calls stage writes against rows locked by this scope; nothing
/// touches the store until `commit`. Lock order is fixed globally: the
/// crypto-balance row strictly before the fiat-wallet row, in every code
/// path that takes both.
pub struct SettlementTx<'a> {
    store: &'a LedgerStore,
    crypto_lock: Option<OwnedMutexGuard<CryptoBalance>>,
    fiat_lock: Option<OwnedMutexGuard<Wallet>>,
    staged_crypto: Option<StagedCrypto>,
    staged_fiat: Option<StagedFiat>,
    staged_transaction: Option<Transaction>,
    staged_completion: Option<(ConversionId, TransactionId)>,
}

impl SettlementTx<'_> {
    /// Lock the crypto balance row and return its current state.
    pub async fn lock_crypto_balance(
        &mut self,
        wallet_id: WalletId,
        token: &TokenSymbol,
    ) -> LedgerResult<CryptoBalance> {
        if self.fiat_lock.is_some() {
            return Err(LedgerError::LockOrderViolation);
        }

        let cell = self
            .crypto_balances_cell(wallet_id, token)
            .ok_or_else(|| LedgerError::RowNotFound {
                what: format!("crypto balance {wallet_id}/{token}"),
            })?;

        let guard = tokio::time::timeout(self.store.config.lock_timeout, cell.lock_owned())
            .await
            .map_err(|_| {
                LedgerError::LockTimeout(format!("crypto balance {wallet_id}/{token}"))
            })?;

        debug!(wallet_id = %wallet_id, token = %token, "Crypto balance row locked");
        let row = guard.clone();
        self.crypto_lock = Some(guard);
        Ok(row)
    }

    /// Stage a debit against the locked crypto balance row.
    ///
    /// The non-negative check here is the authoritative one; the advisory
    /// pre-flight only narrows the race window it closes.
    pub fn debit_crypto(&mut self, amount: Decimal) -> LedgerResult<BalanceSnapshot> {
        let guard = self
            .crypto_lock
            .as_ref()
            .ok_or(LedgerError::MissingLock("crypto balance"))?;

        let before = guard.balance;
        let after = before - amount;
        if after < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: before,
            });
        }

        self.staged_crypto = Some(StagedCrypto {
            new_balance: after,
            new_usd_value: after * guard.usd_price,
        });
        Ok(BalanceSnapshot { before, after })
    }

    /// Lock the fiat wallet row and return its current state.
    ///
    /// Must run after `lock_crypto_balance`; the global lock order is what
    /// keeps concurrent settlements deadlock-free.
    pub async fn lock_fiat_wallet(&mut self, wallet_id: WalletId) -> LedgerResult<Wallet> {
        if self.crypto_lock.is_none() {
            return Err(LedgerError::LockOrderViolation);
        }

        let cell = self
            .store
            .wallets
            .get(&wallet_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| LedgerError::RowNotFound {
                what: format!("wallet {wallet_id}"),
            })?;

        let guard = tokio::time::timeout(self.store.config.lock_timeout, cell.lock_owned())
            .await
            .map_err(|_| LedgerError::LockTimeout(format!("wallet {wallet_id}")))?;

        debug!(wallet_id = %wallet_id, "Fiat wallet row locked");
        let row = guard.clone();
        self.fiat_lock = Some(guard);
        Ok(row)
    }

    /// Stage a credit against the locked fiat wallet row.
    ///
    /// `ledger_balance` is mirrored alongside `balance`, as on every journal
    /// write.
    pub fn credit_fiat(&mut self, amount: Money) -> LedgerResult<BalanceSnapshot> {
        let guard = self
            .fiat_lock
            .as_ref()
            .ok_or(LedgerError::MissingLock("fiat wallet"))?;

        if amount.currency != guard.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: guard.currency.clone(),
                actual: amount.currency,
            });
        }

        let before = guard.balance;
        let after = before + amount.value;
        self.staged_fiat = Some(StagedFiat {
            new_balance: after,
            new_ledger_balance: guard.ledger_balance + amount.value,
        });
        Ok(BalanceSnapshot { before, after })
    }

    /// Stage the journal insert.
    pub fn stage_transaction(&mut self, transaction: Transaction) {
        self.staged_transaction = Some(transaction);
    }

    /// Stage the PROCESSING -> COMPLETED flip of the conversion record.
    pub fn complete_conversion(&mut self, conversion_id: ConversionId, tx_id: TransactionId) {
        self.staged_completion = Some((conversion_id, tx_id));
    }

    /// Commit the scope: validate, then apply every staged write.
    ///
    /// A serialization conflict or any validation failure aborts with
    /// nothing applied; the caller retries or fails the conversion.
    pub fn commit(mut self) -> LedgerResult<()> {
        if let Some(fault) = self.store.faults.take_commit_fault() {
            warn!(error = %fault, "Commit aborted by storage fault");
            return Err(fault);
        }

        if let Some(tx) = &self.staged_transaction {
            if self.store.journal_refs.contains_key(&tx.reference) {
                return Err(LedgerError::DuplicateReference(tx.reference.clone()));
            }
        }

        if let Some((conversion_id, _)) = self.staged_completion {
            let processing = self
                .store
                .conversion(conversion_id)
                .map(|c| c.status.is_in_progress())
                .ok_or_else(|| LedgerError::RowNotFound {
                    what: format!("conversion {conversion_id}"),
                })?;
            if !processing {
                return Err(LedgerError::ConversionNotProcessing(conversion_id));
            }
        }

        if let (Some(staged), Some(guard)) = (self.staged_crypto.take(), self.crypto_lock.as_mut())
        {
            guard.balance = staged.new_balance;
            guard.usd_value = staged.new_usd_value;
            guard.last_updated = time::now();
        }

        if let (Some(staged), Some(guard)) = (self.staged_fiat.take(), self.fiat_lock.as_mut()) {
            guard.balance = staged.new_balance;
            guard.ledger_balance = staged.new_ledger_balance;
        }

        if let Some(tx) = self.staged_transaction.take() {
            self.store.journal_refs.insert(tx.reference.clone(), tx.id);
            info!(
                transaction_id = %tx.id,
                reference = %tx.reference,
                amount = %tx.amount,
                "Journal row committed"
            );
            self.store.journal.write().push(tx);
        }

        if let Some((conversion_id, tx_id)) = self.staged_completion.take() {
            let applied = self
                .store
                .update_conversion(conversion_id, |c| c.complete(tx_id));
            match applied {
                Some(Ok(())) => {}
                other => {
                    // Checked PROCESSING above while holding both row locks;
                    // reaching here means a writer bypassed the store's
                    // locking discipline.
                    warn!(
                        conversion_id = %conversion_id,
                        ?other,
                        "Conversion finalize anomaly at commit"
                    );
                    return Err(LedgerError::ConversionNotProcessing(conversion_id));
                }
            }
        }

        Ok(())
    }

    fn crypto_balances_cell(
        &self,
        wallet_id: WalletId,
        token: &TokenSymbol,
    ) -> Option<Arc<Mutex<CryptoBalance>>> {
        self.store
            .crypto_balances
            .get(&(wallet_id, token.clone()))
            .map(|e| Arc::clone(e.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stablesettle_common::{ConversionReference, Quote, TokenSymbol};

    async fn seed_user(store: &LedgerStore, user: &str, usdc: Decimal) -> (WalletId, WalletId) {
        let user_id = UserId::new(user);
        let crypto_id = store.register_wallet(Wallet::new_crypto(user_id.clone(), "0xseed"));
        let naira_id = store.register_wallet(
            Wallet::new_fiat(user_id, stablesettle_common::Currency::ngn()).unwrap(),
        );
        store
            .credit_crypto_balance(crypto_id, &TokenSymbol::usdc(), usdc, "seed")
            .await;
        (crypto_id, naira_id)
    }

    fn conversion_for(user: &str, amount: Decimal) -> CryptoConversion {
        let now = stablesettle_common::time::now();
        let gross = (amount * dec!(1500)).round_dp(2);
        let fee = (gross / dec!(100)).round_dp(2);
        let quote = Quote {
            token: TokenSymbol::usdc(),
            crypto_amount: amount,
            usd_value: amount,
            rate: dec!(1500),
            fee_percent: dec!(1),
            fee_amount: fee,
            naira_amount: gross,
            net_naira: gross - fee,
            quoted_at: now,
            expires_at: now + chrono::Duration::minutes(5),
        };
        CryptoConversion::from_quote(UserId::new(user), &quote)
    }

    fn test_conversion(user: &str) -> CryptoConversion {
        conversion_for(user, dec!(10))
    }

    async fn run_settlement(
        store: &LedgerStore,
        conversion: &CryptoConversion,
        crypto_id: WalletId,
        naira_id: WalletId,
    ) -> LedgerResult<TransactionId> {
        let mut tx = store.begin_settlement();
        tx.lock_crypto_balance(crypto_id, &conversion.token).await?;
        tx.debit_crypto(conversion.crypto_amount)?;
        let fiat = tx.lock_fiat_wallet(naira_id).await?;
        let snapshot = tx.credit_fiat(Money::new(
            conversion.net_naira,
            stablesettle_common::Currency::ngn(),
        ))?;
        let journal_row = Transaction::crypto_to_naira(
            naira_id,
            conversion.net_naira,
            conversion.fee_amount,
            snapshot.before,
            snapshot.after,
            fiat.currency,
            conversion.fiat_reference(),
        );
        let tx_id = journal_row.id;
        tx.stage_transaction(journal_row);
        tx.complete_conversion(conversion.id, tx_id);
        tx.commit()?;
        Ok(tx_id)
    }

    #[tokio::test]
    async fn test_commit_applies_all_writes() {
        let store = LedgerStore::new();
        let (crypto_id, naira_id) = seed_user(&store, "u1", dec!(25)).await;
        let conversion = test_conversion("u1");
        store.insert_conversion(conversion.clone());

        let tx_id = run_settlement(&store, &conversion, crypto_id, naira_id)
            .await
            .unwrap();

        let crypto = store
            .crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        assert_eq!(crypto.balance, dec!(15));
        assert_eq!(crypto.usd_value, dec!(15));

        let naira = store.wallet(naira_id).await.unwrap();
        assert_eq!(naira.balance, dec!(14850));
        assert_eq!(naira.ledger_balance, dec!(14850));

        let stored = store.conversion(conversion.id).unwrap();
        assert_eq!(stored.naira_transaction_id, Some(tx_id));
        assert_eq!(store.journal_len(), 1);
        assert!(store
            .find_transaction_by_reference(&conversion.fiat_reference())
            .is_some());
    }

    #[tokio::test]
    async fn test_dropped_scope_discards_staged_writes() {
        let store = LedgerStore::new();
        let (crypto_id, naira_id) = seed_user(&store, "u1", dec!(25)).await;

        {
            let mut tx = store.begin_settlement();
            tx.lock_crypto_balance(crypto_id, &TokenSymbol::usdc())
                .await
                .unwrap();
            tx.debit_crypto(dec!(10)).unwrap();
            tx.lock_fiat_wallet(naira_id).await.unwrap();
            tx.credit_fiat(Money::new(dec!(14850), stablesettle_common::Currency::ngn()))
                .unwrap();
            // Dropped without commit.
        }

        let crypto = store
            .crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        assert_eq!(crypto.balance, dec!(25));
        let naira = store.wallet(naira_id).await.unwrap();
        assert_eq!(naira.balance, dec!(0));
        assert_eq!(store.journal_len(), 0);
    }

    #[tokio::test]
    async fn test_debit_cannot_go_negative() {
        let store = LedgerStore::new();
        let (crypto_id, _) = seed_user(&store, "u1", dec!(5)).await;

        let mut tx = store.begin_settlement();
        tx.lock_crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        let result = tx.debit_crypto(dec!(10));

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_lock_order_is_enforced() {
        let store = LedgerStore::new();
        let (crypto_id, naira_id) = seed_user(&store, "u1", dec!(5)).await;

        // Fiat first is rejected.
        let mut tx = store.begin_settlement();
        let result = tx.lock_fiat_wallet(naira_id).await;
        assert!(matches!(result, Err(LedgerError::LockOrderViolation)));

        // Crypto after fiat is rejected too.
        let mut tx = store.begin_settlement();
        tx.lock_crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        tx.lock_fiat_wallet(naira_id).await.unwrap();
        let result = tx.lock_crypto_balance(crypto_id, &TokenSymbol::usdc()).await;
        assert!(matches!(result, Err(LedgerError::LockOrderViolation)));
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected_at_commit() {
        let store = LedgerStore::new();
        let (crypto_id, naira_id) = seed_user(&store, "u1", dec!(25)).await;
        let conversion = test_conversion("u1");
        store.insert_conversion(conversion.clone());

        run_settlement(&store, &conversion, crypto_id, naira_id)
            .await
            .unwrap();

        // Second settlement reusing the same fiat reference.
        let mut replay = test_conversion("u1");
        replay.reference = ConversionReference::from_string(conversion.reference.as_str());
        store.insert_conversion(replay.clone());

        let result = run_settlement(&store, &replay, crypto_id, naira_id).await;
        assert!(matches!(result, Err(LedgerError::DuplicateReference(_))));

        // The failed replay left no trace.
        assert_eq!(store.journal_len(), 1);
        let crypto = store
            .crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        assert_eq!(crypto.balance, dec!(15));
    }

    #[tokio::test]
    async fn test_injected_conflict_aborts_commit() {
        let store = LedgerStore::new();
        let (crypto_id, naira_id) = seed_user(&store, "u1", dec!(25)).await;
        let conversion = test_conversion("u1");
        store.insert_conversion(conversion.clone());

        store.faults().inject_commit_conflicts(1);
        let result = run_settlement(&store, &conversion, crypto_id, naira_id).await;
        assert!(matches!(
            result,
            Err(LedgerError::SerializationConflict(_))
        ));

        // Nothing applied.
        let crypto = store
            .crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        assert_eq!(crypto.balance, dec!(25));
        assert_eq!(store.journal_len(), 0);

        // The fault drained; the retry succeeds.
        run_settlement(&store, &conversion, crypto_id, naira_id)
            .await
            .unwrap();
        assert_eq!(store.journal_len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_settlements_serialize_on_the_crypto_row() {
        let store = Arc::new(LedgerStore::new());
        let (crypto_id, naira_id) = seed_user(&store, "u1", dec!(15)).await;

        let c1 = test_conversion("u1");
        let c2 = test_conversion("u1");
        store.insert_conversion(c1.clone());
        store.insert_conversion(c2.clone());

        let s1 = Arc::clone(&store);
        let s2 = Arc::clone(&store);
        let h1 =
            tokio::spawn(async move { run_settlement(&s1, &c1, crypto_id, naira_id).await });
        let h2 =
            tokio::spawn(async move { run_settlement(&s2, &c2, crypto_id, naira_id).await });

        let (r1, r2) = (h1.await.unwrap(), h2.await.unwrap());

        // Each debit of 10 fits the seeded 15 individually; their sum does
        // not. The row lock serializes them: exactly one lands.
        assert!(r1.is_ok() != r2.is_ok());
        let failure = if r1.is_ok() { r2 } else { r1 };
        assert!(matches!(
            failure,
            Err(LedgerError::InsufficientFunds { .. })
        ));

        let crypto = store
            .crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        assert_eq!(crypto.balance, dec!(5));
        assert_eq!(store.journal_len(), 1);

        let naira = store.wallet(naira_id).await.unwrap();
        assert_eq!(naira.balance, dec!(14850));
    }

    #[tokio::test]
    async fn test_lock_timeout_surfaces() {
        let store = Arc::new(LedgerStore::with_config(StoreConfig {
            lock_timeout: std::time::Duration::from_millis(50),
        }));
        let (crypto_id, _) = seed_user(&store, "u1", dec!(25)).await;

        let mut holder = store.begin_settlement();
        holder
            .lock_crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();

        let mut waiter = store.begin_settlement();
        let result = waiter
            .lock_crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await;

        assert!(matches!(result, Err(LedgerError::LockTimeout(_))));
        assert!(result.err().unwrap().is_retryable());
        drop(holder);
    }

    #[tokio::test]
    async fn test_conversion_pagination_newest_first() {
        let store = LedgerStore::new();
        for _ in 0..5 {
            store.insert_conversion(test_conversion("u1"));
        }

        let first = store.conversions_for_user(&UserId::new("u1"), 1, 2);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages(), 3);
        assert!(first.items[0].created_at >= first.items[1].created_at);

        let last = store.conversions_for_user(&UserId::new("u1"), 3, 2);
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_next());
    }

    proptest::proptest! {
        // Conservation across arbitrary amounts: a committed settlement
        // moves exactly the conversion's crypto amount and net naira, and a
        // short balance aborts with nothing moved.
        #[test]
        fn prop_settlement_conserves_balances(
            seed_cents in 1u64..10_000_000,
            convert_cents in 1u64..10_000_000,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let store = LedgerStore::new();
                let seed = Decimal::new(seed_cents as i64, 2);
                let amount = Decimal::new(convert_cents as i64, 2);
                let (crypto_id, naira_id) = seed_user(&store, "u1", seed).await;
                let conversion = conversion_for("u1", amount);
                store.insert_conversion(conversion.clone());

                let result = run_settlement(&store, &conversion, crypto_id, naira_id).await;

                let crypto = store
                    .crypto_balance(crypto_id, &TokenSymbol::usdc())
                    .await
                    .unwrap();
                let naira = store.wallet(naira_id).await.unwrap();

                if amount <= seed {
                    result.unwrap();
                    assert_eq!(seed - crypto.balance, amount);
                    assert_eq!(naira.balance, conversion.net_naira);
                    assert_eq!(naira.ledger_balance, conversion.net_naira);
                    assert_eq!(store.journal_len(), 1);
                } else {
                    assert!(matches!(
                        result,
                        Err(LedgerError::InsufficientFunds { .. })
                    ));
                    assert_eq!(crypto.balance, seed);
                    assert_eq!(naira.balance, Decimal::ZERO);
                    assert_eq!(store.journal_len(), 0);
                }
            });
        }
    }

    #[tokio::test]
    async fn test_currency_mismatch_rejected() {
        let store = LedgerStore::new();
        let (crypto_id, naira_id) = seed_user(&store, "u1", dec!(25)).await;

        let mut tx = store.begin_settlement();
        tx.lock_crypto_balance(crypto_id, &TokenSymbol::usdc())
            .await
            .unwrap();
        tx.lock_fiat_wallet(naira_id).await.unwrap();
        let result = tx.credit_fiat(Money::new(dec!(10), stablesettle_common::Currency::usd()));
        assert!(matches!(result, Err(LedgerError::CurrencyMismatch { .. })));
    }
}
