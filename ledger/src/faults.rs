//! Commit-time fault injection.
//!
//! Models the storage layer's failure modes so tests and the simulator can
//! exercise the settlement retry protocol: a serialization conflict is what
//! a database running at serializable isolation reports when concurrent
//! writers collide, and a storage error stands in for every non-retryable
//! failure class.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::LedgerError;

/// Injects failures into upcoming commits.
pub struct FaultInjector {
    commit_conflicts: AtomicU32,
    commit_errors: AtomicU32,
}

impl FaultInjector {
    /// Create an injector with no pending faults.
    pub fn new() -> Self {
        Self {
            commit_conflicts: AtomicU32::new(0),
            commit_errors: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` commits with a serialization conflict.
    pub fn inject_commit_conflicts(&self, n: u32) {
        self.commit_conflicts.fetch_add(n, Ordering::SeqCst);
    }

    /// Fail the next `n` commits with a non-retryable storage error.
    pub fn inject_commit_errors(&self, n: u32) {
        self.commit_errors.fetch_add(n, Ordering::SeqCst);
    }

    /// Consume one pending fault, if any.
    pub(crate) fn take_commit_fault(&self) -> Option<LedgerError> {
        if Self::try_consume(&self.commit_conflicts) {
            return Some(LedgerError::SerializationConflict(
                "injected write conflict".to_string(),
            ));
        }
        if Self::try_consume(&self.commit_errors) {
            return Some(LedgerError::Storage("injected storage failure".to_string()));
        }
        None
    }

    fn try_consume(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
            .is_ok()
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_drain() {
        let faults = FaultInjector::new();
        faults.inject_commit_conflicts(2);

        assert!(matches!(
            faults.take_commit_fault(),
            Some(LedgerError::SerializationConflict(_))
        ));
        assert!(matches!(
            faults.take_commit_fault(),
            Some(LedgerError::SerializationConflict(_))
        ));
        assert!(faults.take_commit_fault().is_none());
    }

    #[test]
    fn test_conflicts_consumed_before_errors() {
        let faults = FaultInjector::new();
        faults.inject_commit_conflicts(1);
        faults.inject_commit_errors(1);

        assert!(matches!(
            faults.take_commit_fault(),
            Some(LedgerError::SerializationConflict(_))
        ));
        assert!(matches!(
            faults.take_commit_fault(),
            Some(LedgerError::Storage(_))
        ));
        assert!(faults.take_commit_fault().is_none());
    }
}
