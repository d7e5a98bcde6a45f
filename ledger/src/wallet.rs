//! Wallet and balance rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stablesettle_common::{Currency, TokenSymbol, UserId, WalletId};

/// Wallet kinds. Each user holds at most one wallet of each kind, created
/// at onboarding and never deleted, only zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletKind {
    /// Naira fiat wallet.
    Naira,
    /// Custodied crypto wallet; token balances hang off it.
    Crypto,
    /// USD fiat wallet.
    Usd,
}

impl WalletKind {
    /// The wallet kind holding balances of the given fiat currency.
    pub fn for_fiat(currency: &Currency) -> Option<WalletKind> {
        match currency.code() {
            "NGN" => Some(WalletKind::Naira),
            "USD" => Some(WalletKind::Usd),
            _ => None,
        }
    }
}

/// A user wallet row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet identifier.
    pub id: WalletId,
    /// Owning user.
    pub user_id: UserId,
    /// Wallet kind.
    pub kind: WalletKind,
    /// Currency the balance is denominated in.
    pub currency: Currency,
    /// Available balance.
    pub balance: Decimal,
    /// Ledger balance, mirrored on every journal write.
    pub ledger_balance: Decimal,
    /// Custody address (crypto wallets only).
    pub wallet_address: Option<String>,
    /// When the wallet was created.
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a zero-balance fiat wallet.
    pub fn new_fiat(user_id: UserId, currency: Currency) -> Option<Self> {
        let kind = WalletKind::for_fiat(&currency)?;
        Some(Self {
            id: WalletId::new(),
            user_id,
            kind,
            currency,
            balance: Decimal::ZERO,
            ledger_balance: Decimal::ZERO,
            wallet_address: None,
            created_at: Utc::now(),
        })
    }

    /// Create a crypto wallet bound to a custody address.
    ///
    /// Token balances live in their own rows; the wallet's own balance
    /// fields carry the aggregate USD valuation.
    pub fn new_crypto(user_id: UserId, wallet_address: impl Into<String>) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            kind: WalletKind::Crypto,
            currency: Currency::usd(),
            balance: Decimal::ZERO,
            ledger_balance: Decimal::ZERO,
            wallet_address: Some(wallet_address.into()),
            created_at: Utc::now(),
        }
    }
}

/// A per-(wallet, token) balance row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoBalance {
    /// Owning crypto wallet.
    pub wallet_id: WalletId,
    /// Token symbol.
    pub token: TokenSymbol,
    /// Token balance.
    pub balance: Decimal,
    /// On-chain integer balance as reported by custody.
    pub raw_balance: String,
    /// USD unit price at last valuation.
    pub usd_price: Decimal,
    /// USD valuation of the balance.
    pub usd_value: Decimal,
    /// When the row was last written.
    pub last_updated: DateTime<Utc>,
}

impl CryptoBalance {
    /// Create a balance row.
    pub fn new(
        wallet_id: WalletId,
        token: TokenSymbol,
        balance: Decimal,
        raw_balance: impl Into<String>,
    ) -> Self {
        let usd_price = token.usd_price();
        Self {
            wallet_id,
            token,
            balance,
            raw_balance: raw_balance.into(),
            usd_price,
            usd_value: balance * usd_price,
            last_updated: Utc::now(),
        }
    }

    /// Check if the row covers the requested amount.
    pub fn has_sufficient(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}
