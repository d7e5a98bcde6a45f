//! Quote calculation.

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use stablesettle_common::{time, CurrencyPair, Quote, TokenSymbol};
use tracing::debug;

use crate::error::{RateError, RateResult};
use crate::store::RateStore;

/// Parse a caller-supplied amount string into a positive decimal.
pub fn parse_amount(raw: &str) -> RateResult<Decimal> {
    let amount: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| RateError::InvalidAmount(format!("'{raw}' is not a number")))?;

    if amount <= Decimal::ZERO {
        return Err(RateError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }

    Ok(amount)
}

/// Configuration for quote calculation.
#[derive(Debug, Clone)]
pub struct QuoteConfig {
    /// Pair every conversion settles through.
    pub pair: CurrencyPair,
    /// Quote validity window.
    pub validity: Duration,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            pair: CurrencyPair::usd_ngn(),
            validity: time::constants::quote_validity(),
        }
    }
}

/// Computes conversion quotes from the active rate.
///
/// Pure apart from the rate read: no balances are touched and nothing is
/// persisted. Quotes are advisory; the engine recomputes them at execution
/// time.
pub struct QuoteCalculator {
    store: Arc<RateStore>,
    config: QuoteConfig,
}

impl QuoteCalculator {
    /// Create a new calculator over a rate store.
    pub fn new(store: Arc<RateStore>, config: QuoteConfig) -> Self {
        Self { store, config }
    }

    /// Compute a quote for converting `amount` of `token` to naira.
    pub fn quote(&self, token: &TokenSymbol, amount: Decimal) -> RateResult<Quote> {
        if amount <= Decimal::ZERO {
            return Err(RateError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        if !token.is_convertible() {
            return Err(RateError::UnsupportedToken(token.clone()));
        }

        let rate = self.store.active_rate(&self.config.pair)?;
        let places = self.config.pair.quote.decimal_places();

        let usd_value = token.usd_value(amount);
        let gross = (usd_value * rate.rate).round_dp(places);
        let fee = (gross * rate.platform_fee_percent / Decimal::from(100)).round_dp(places);
        let net = gross - fee;

        let quoted_at = time::now();
        let quote = Quote {
            token: token.clone(),
            crypto_amount: amount,
            usd_value,
            rate: rate.rate,
            fee_percent: rate.platform_fee_percent,
            fee_amount: fee,
            naira_amount: gross,
            net_naira: net,
            quoted_at,
            expires_at: quoted_at + self.config.validity,
        };

        debug!(
            token = %token,
            amount = %amount,
            rate = %rate.rate,
            net = %net,
            "Quote computed"
        );

        Ok(quote)
    }
}
