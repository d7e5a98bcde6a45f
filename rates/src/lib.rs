//! StableSettle Rate Engine
//!
//! Exchange-rate storage and quote calculation for crypto-to-fiat
//! conversion.
//!
//! # Features
//!
//! - Single-active rate per currency pair, enforced atomically
//! - Append-only rate history for audit
//! - Pure quote calculation (peg valuation, gross, fee, net, expiry)
//!
//! # Example
//!
//! ```rust,ignore
//! use stablesettle_rates::{QuoteCalculator, RateSource, RateStore};
//! use stablesettle_common::{CurrencyPair, TokenSymbol};
//!
//! let store = Arc::new(RateStore::new());
//! store.set_active_rate(CurrencyPair::usd_ngn(), dec!(1500), dec!(1), "admin", RateSource::Manual)?;
//!
//! let calculator = QuoteCalculator::new(store.clone(), QuoteConfig::default());
//! let quote = calculator.quote(&TokenSymbol::usdc(), dec!(10))?;
//! ```

pub mod error;
pub mod model;
pub mod quote;
pub mod store;

pub use error::{RateError, RateResult};
pub use model::{ExchangeRate, RateSource};
pub use quote::{parse_amount, QuoteCalculator, QuoteConfig};
pub use store::RateStore;
