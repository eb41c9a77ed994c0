use super::allocation::PaymentAllocation;
use super::payment::PaymentRecord;
use crate::error::Result;
use async_trait::async_trait;

/// Receives the derived allocation breakdown every time the engine's working
/// set changes.
pub trait AllocationSink: Send {
    fn publish(&mut self, allocations: &[PaymentAllocation]);
}

impl<F> AllocationSink for F
where
    F: FnMut(&[PaymentAllocation]) + Send,
{
    fn publish(&mut self, allocations: &[PaymentAllocation]) {
        self(allocations)
    }
}

/// Persistence for payment records, keyed by reference.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn store(&self, record: PaymentRecord) -> Result<()>;
    async fn get(&self, reference: &str) -> Result<Option<PaymentRecord>>;
    async fn exists(&self, reference: &str) -> Result<bool>;
    async fn get_all(&self) -> Result<Vec<PaymentRecord>>;
}

pub type AllocationSinkBox = Box<dyn AllocationSink>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
