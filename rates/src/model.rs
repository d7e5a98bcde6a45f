//! Exchange rate rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stablesettle_common::CurrencyPair;
use uuid::Uuid;

/// Where a rate row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateSource {
    /// Set by an operator.
    Manual,
    /// Pulled from an upstream rate feed.
    Feed,
}

impl RateSource {
    /// Get the source as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RateSource::Manual => "MANUAL",
            RateSource::Feed => "FEED",
        }
    }
}

/// One row of the exchange-rate history.
///
/// Rows are append-only: superseding a rate flips its `is_active` flag and
/// inserts a new row; nothing else about a row ever changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Row identifier.
    pub id: Uuid,
    /// Currency pair this rate prices.
    pub pair: CurrencyPair,
    /// Units of quote currency per unit of base currency.
    pub rate: Decimal,
    /// Platform fee percentage charged on conversions at this rate.
    pub platform_fee_percent: Decimal,
    /// Whether this is the pair's active rate.
    pub is_active: bool,
    /// Who set the rate.
    pub set_by: String,
    /// When the rate was set.
    pub set_at: DateTime<Utc>,
    /// Where the rate came from.
    pub source: RateSource,
}

impl ExchangeRate {
    /// Create a new active rate row.
    pub fn new(
        pair: CurrencyPair,
        rate: Decimal,
        platform_fee_percent: Decimal,
        set_by: impl Into<String>,
        source: RateSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pair,
            rate,
            platform_fee_percent,
            is_active: true,
            set_by: set_by.into(),
            set_at: Utc::now(),
            source,
        }
    }
}
