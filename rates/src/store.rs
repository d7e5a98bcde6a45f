//! Exchange-rate storage with a single-active invariant.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use stablesettle_common::CurrencyPair;
use tracing::info;

use crate::error::{RateError, RateResult};
use crate::model::{ExchangeRate, RateSource};

/// Append-only store of exchange rates.
///
/// Invariant: at most one row per currency pair has `is_active = true` at
/// any instant. `set_active_rate` flips the previous active row and inserts
/// the replacement under one write lock, so two concurrent operators cannot
/// leave two active rows behind.
pub struct RateStore {
    rates: RwLock<Vec<ExchangeRate>>,
}

impl RateStore {
    /// Create an empty rate store.
    pub fn new() -> Self {
        Self {
            rates: RwLock::new(Vec::new()),
        }
    }

    /// Atomically supersede the pair's active rate with a new one.
    pub fn set_active_rate(
        &self,
        pair: CurrencyPair,
        rate: Decimal,
        platform_fee_percent: Decimal,
        set_by: impl Into<String>,
        source: RateSource,
    ) -> RateResult<ExchangeRate> {
        if rate <= Decimal::ZERO {
            return Err(RateError::InvalidRate { rate });
        }
        if platform_fee_percent < Decimal::ZERO || platform_fee_percent >= Decimal::from(100) {
            return Err(RateError::InvalidFeePercent {
                fee_percent: platform_fee_percent,
            });
        }

        let row = ExchangeRate::new(pair.clone(), rate, platform_fee_percent, set_by, source);

        let mut rates = self.rates.write();
        for existing in rates.iter_mut() {
            if existing.pair == pair && existing.is_active {
                existing.is_active = false;
            }
        }
        rates.push(row.clone());
        drop(rates);

        info!(
            pair = %pair,
            rate = %row.rate,
            fee_percent = %row.platform_fee_percent,
            set_by = %row.set_by,
            "Active rate superseded"
        );

        Ok(row)
    }

    /// Get the pair's single active rate.
    pub fn active_rate(&self, pair: &CurrencyPair) -> RateResult<ExchangeRate> {
        self.rates
            .read()
            .iter()
            .filter(|r| r.is_active && &r.pair == pair)
            .max_by_key(|r| r.set_at)
            .cloned()
            .ok_or_else(|| RateError::NoActiveRate(pair.clone()))
    }

    /// Full rate history for a pair, newest first.
    pub fn history(&self, pair: &CurrencyPair) -> Vec<ExchangeRate> {
        let mut rows: Vec<ExchangeRate> = self
            .rates
            .read()
            .iter()
            .filter(|r| &r.pair == pair)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.set_at.cmp(&a.set_at));
        rows
    }

    /// Count of active rows for a pair. Always 0 or 1.
    pub fn active_count(&self, pair: &CurrencyPair) -> usize {
        self.rates
            .read()
            .iter()
            .filter(|r| r.is_active && &r.pair == pair)
            .count()
    }

    /// Total number of rows across all pairs.
    pub fn len(&self) -> usize {
        self.rates.read().len()
    }

    /// Check if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rates.read().is_empty()
    }
}

impl Default for RateStore {
    fn default() -> Self {
        Self::new()
    }
}
