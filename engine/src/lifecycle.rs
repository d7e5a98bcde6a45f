//! Conversion record lifecycle management.

use std::sync::Arc;

use tracing::{info, warn};

use stablesettle_common::{
    ConversionFailure, ConversionId, CryptoConversion, Page, Quote, TransactionId, UserId,
};
use stablesettle_ledger::LedgerStore;

/// Creates and finalizes conversion records.
///
/// The record is the idempotency anchor: its reference is generated once at
/// creation and never changes across settlement retries, so the fiat
/// journal reference derived from it stays deterministic.
pub struct ConversionLifecycle {
    store: Arc<LedgerStore>,
}

impl ConversionLifecycle {
    /// Create a lifecycle manager over a store.
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Insert a PROCESSING record built from a server-side quote.
    pub fn create(&self, user_id: UserId, quote: &Quote) -> CryptoConversion {
        let conversion = CryptoConversion::from_quote(user_id, quote);
        info!(
            conversion_id = %conversion.id,
            reference = %conversion.reference,
            token = %conversion.token,
            amount = %conversion.crypto_amount,
            "Conversion record created"
        );
        self.store.insert_conversion(conversion.clone());
        conversion
    }

    /// Transition PROCESSING -> COMPLETED, linking the fiat transaction.
    ///
    /// Finalizing a record that already reached a final state is a no-op
    /// logged as an anomaly: the engine is the record's single writer, so
    /// this should never fire.
    pub fn finalize_completed(
        &self,
        id: ConversionId,
        transaction_id: TransactionId,
    ) -> Option<CryptoConversion> {
        let result = self.store.update_conversion(id, |c| {
            c.complete(transaction_id).map(|()| c.clone())
        });
        match result {
            Some(Ok(conversion)) => Some(conversion),
            Some(Err(invalid)) => {
                warn!(conversion_id = %id, error = %invalid, "Finalize anomaly: record already final");
                self.store.conversion(id)
            }
            None => {
                warn!(conversion_id = %id, "Finalize anomaly: record not found");
                None
            }
        }
    }

    /// Transition PROCESSING -> FAILED with failure details.
    ///
    /// Same anomaly semantics as `finalize_completed`.
    pub fn finalize_failed(
        &self,
        id: ConversionId,
        failure: ConversionFailure,
    ) -> Option<CryptoConversion> {
        let result = self
            .store
            .update_conversion(id, |c| c.fail(failure).map(|()| c.clone()));
        match result {
            Some(Ok(conversion)) => {
                info!(
                    conversion_id = %id,
                    code = ?conversion.failure.as_ref().map(|f| f.code),
                    "Conversion finalized FAILED"
                );
                Some(conversion)
            }
            Some(Err(invalid)) => {
                warn!(conversion_id = %id, error = %invalid, "Finalize anomaly: record already final");
                self.store.conversion(id)
            }
            None => {
                warn!(conversion_id = %id, "Finalize anomaly: record not found");
                None
            }
        }
    }

    /// Read a conversion record.
    pub fn get(&self, id: ConversionId) -> Option<CryptoConversion> {
        self.store.conversion(id)
    }

    /// A user's conversion history, newest first.
    pub fn history(&self, user_id: &UserId, page: usize, limit: usize) -> Page<CryptoConversion> {
        self.store.conversions_for_user(user_id, page, limit)
    }
}
