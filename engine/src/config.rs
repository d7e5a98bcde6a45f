//! Engine configuration.

use std::time::Duration;

use stablesettle_common::{time, DurationExt};
use stablesettle_rates::QuoteConfig;

/// Settlement retry configuration.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Maximum settlement attempts per conversion, initial try included.
    pub max_attempts: u32,
    /// Retry backoff base; doubled after each conflicted attempt.
    pub backoff_base: Duration,
    /// Upper bound on one settlement attempt.
    pub statement_timeout: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            max_attempts: time::constants::MAX_SETTLEMENT_ATTEMPTS,
            backoff_base: time::constants::settlement_backoff_base().as_std(),
            statement_timeout: time::constants::statement_timeout().as_std(),
        }
    }
}

/// Main engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Settlement retry configuration.
    pub settlement: SettlementConfig,
    /// Quote configuration.
    pub quote: QuoteConfig,
    /// Log level.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settlement: SettlementConfig::default(),
            quote: QuoteConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(attempts) = std::env::var("SETTLE_MAX_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                config.settlement.max_attempts = attempts;
            }
        }

        if let Ok(backoff_ms) = std::env::var("SETTLE_BACKOFF_MS") {
            if let Ok(backoff_ms) = backoff_ms.parse() {
                config.settlement.backoff_base = Duration::from_millis(backoff_ms);
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.settlement.max_attempts == 0 {
            return Err("Settlement attempts cannot be 0".to_string());
        }

        if self.settlement.backoff_base.is_zero() {
            return Err("Settlement backoff base cannot be 0".to_string());
        }

        if self.settlement.statement_timeout.is_zero() {
            return Err("Statement timeout cannot be 0".to_string());
        }

        if self.quote.validity <= chrono::Duration::zero() {
            return Err("Quote validity cannot be 0".to_string());
        }

        Ok(())
    }
}
