use crate::domain::payment::PaymentRecord;
use crate::domain::ports::PaymentStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment records.
///
/// Records are keyed by reference, so `get_all` returns them in reference
/// order. Stands in for the hosted document store in tests and in the CLI.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<RwLock<BTreeMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`. Later duplicates win.
    pub fn with_records(records: impl IntoIterator<Item = PaymentRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.reference.clone(), r))
            .collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn store(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.reference.clone(), record);
        Ok(())
    }

    async fn get(&self, reference: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(reference).cloned())
    }

    async fn exists(&self, reference: &str) -> Result<bool> {
        let records = self.records.read().await;
        Ok(records.contains_key(reference))
    }

    async fn get_all(&self) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}
