//! StableSettle Ledger
//!
//! Wallets, per-token balance rows, the append-only transaction journal,
//! and the settlement store that mutates them under explicit transaction
//! scopes with row locks and a fixed lock order.

pub mod error;
pub mod faults;
pub mod store;
pub mod transaction;
pub mod wallet;

pub use error::{LedgerError, LedgerResult};
pub use faults::FaultInjector;
pub use store::{BalanceSnapshot, LedgerStore, SettlementTx, StoreConfig};
pub use transaction::{Transaction, TransactionType};
pub use wallet::{CryptoBalance, Wallet, WalletKind};
