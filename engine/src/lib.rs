//! StableSettle Engine
//!
//! The conversion settlement engine: quotes a crypto-to-fiat conversion,
//! creates the durable conversion record, and settles it atomically —
//! debiting the crypto balance, crediting the fiat wallet, and writing the
//! journal row in one transaction scope, with bounded retries on write
//! conflicts.

pub mod config;
pub mod executor;
pub mod external;
pub mod lifecycle;
pub mod metrics;
pub mod service;

pub use config::{EngineConfig, SettlementConfig};
pub use executor::SettlementExecutor;
pub use external::{
    BalanceGuard, CacheInvalidator, CryptoWalletRef, FiatWalletRef, LedgerBalanceGuard,
    NoOpCacheInvalidator, StoreWalletLookup, WalletLookup,
};
pub use lifecycle::ConversionLifecycle;
pub use metrics::{EngineMetrics, MetricsSnapshot, SharedMetrics};
pub use service::{ConversionOutcome, ConversionService};
