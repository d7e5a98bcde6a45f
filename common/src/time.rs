//! Time utilities and timing constants for StableSettle.

use chrono::{DateTime, Duration, Utc};

/// Engine timing constants.
pub mod constants {
    use super::Duration;

    /// Maximum settlement attempts per conversion (initial try included).
    pub const MAX_SETTLEMENT_ATTEMPTS: u32 = 3;

    /// Quote validity window (5 minutes).
    pub fn quote_validity() -> Duration {
        Duration::minutes(5)
    }

    /// Settlement retry backoff base (100 milliseconds, doubled per retry).
    pub fn settlement_backoff_base() -> Duration {
        Duration::milliseconds(100)
    }

    /// Statement timeout bounding one settlement attempt (20 seconds).
    pub fn statement_timeout() -> Duration {
        Duration::seconds(20)
    }

    /// Row lock acquisition timeout (10 seconds).
    pub fn lock_acquisition_timeout() -> Duration {
        Duration::seconds(10)
    }
}

/// A timestamp with timezone (always UTC for StableSettle).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check if a timestamp has expired (is in the past).
pub fn is_expired(expiry: Timestamp) -> bool {
    now() > expiry
}

/// Calculate expiry time from now.
pub fn expires_in(duration: Duration) -> Timestamp {
    now() + duration
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}
