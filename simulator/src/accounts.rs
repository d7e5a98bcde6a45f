//! Simulated users for scenario runs.

use stablesettle_common::{Currency, UserId, WalletId};
use stablesettle_ledger::{LedgerStore, Wallet};

/// A simulated user with onboarded wallets.
pub struct SimulatedUser {
    /// User identifier.
    pub user_id: UserId,
    /// Crypto wallet.
    pub crypto_wallet: WalletId,
    /// Naira wallet.
    pub naira_wallet: WalletId,
}

/// User factory for scenario runs.
pub struct UserFactory;

impl UserFactory {
    /// Onboard N simulated users with zeroed wallets.
    ///
    /// Balances are seeded by scenario steps so every run starts from a
    /// known state.
    pub fn create_users(store: &LedgerStore, count: usize) -> Vec<SimulatedUser> {
        (0..count)
            .map(|i| {
                let user_id = UserId::new(format!("user-{i}"));
                let crypto_wallet = store.register_wallet(Wallet::new_crypto(
                    user_id.clone(),
                    format!("0xSIM{i:04}"),
                ));
                let naira_wallet = store.register_wallet(
                    Wallet::new_fiat(user_id.clone(), Currency::ngn())
                        .expect("NGN is a fiat wallet currency"),
                );
                SimulatedUser {
                    user_id,
                    crypto_wallet,
                    naira_wallet,
                }
            })
            .collect()
    }
}
