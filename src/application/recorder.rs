use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::ports::PaymentStoreBox;
use crate::error::{AllocationError, Result};
use chrono::Utc;
use tracing::{info, warn};

/// Validates payment records and hands them to the backing store.
///
/// Store operations are awaited one at a time, so a reference check and the
/// write that follows it see the same store state within one recorder.
pub struct PaymentRecorder {
    store: PaymentStoreBox,
}

impl PaymentRecorder {
    pub fn new(store: PaymentStoreBox) -> Self {
        Self { store }
    }

    /// Stores a new payment record.
    ///
    /// The record must pass [`PaymentRecord::validate`], start as `pending`
    /// or `confirmed`, and carry a reference not already in the store.
    /// Timestamps are stamped here.
    pub async fn record(&self, mut record: PaymentRecord) -> Result<PaymentRecord> {
        record.validate()?;

        if !record.status.is_initial() {
            return Err(AllocationError::ValidationError(
                "New payments must have status 'pending' or 'confirmed'".to_string(),
            ));
        }

        if self.store.exists(&record.reference).await? {
            warn!(reference = %record.reference, "rejected duplicate payment reference");
            return Err(AllocationError::DuplicateReference(record.reference));
        }

        let now = Utc::now().timestamp_millis();
        if record.created_at == 0 {
            record.created_at = now;
        }
        record.updated_at = now;

        self.store.store(record.clone()).await?;
        info!(
            reference = %record.reference,
            amount = %record.amount,
            allocations = record.fee_allocations.len(),
            status = %record.status,
            "recorded payment"
        );
        Ok(record)
    }

    /// Moves a stored payment to `status`, replacing its notes when given.
    pub async fn transition(
        &self,
        reference: &str,
        status: PaymentStatus,
        notes: Option<String>,
    ) -> Result<PaymentRecord> {
        let mut record = self
            .store
            .get(reference)
            .await?
            .ok_or_else(|| AllocationError::NotFound(reference.to_string()))?;

        if record.status != status && !record.status.can_transition_to(status) {
            return Err(AllocationError::InvalidTransition {
                from: record.status.to_string(),
                to: status.to_string(),
            });
        }

        let from = record.status;
        if notes.is_some() {
            record.notes = notes;
        }
        record.status = status;
        record.validate()?;
        record.updated_at = Utc::now().timestamp_millis();

        self.store.store(record.clone()).await?;
        info!(reference, %from, to = %status, "updated payment status");
        Ok(record)
    }

    /// Consumes the recorder and returns every stored record.
    pub async fn into_records(self) -> Result<Vec<PaymentRecord>> {
        self.store.get_all().await
    }
}
