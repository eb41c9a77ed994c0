use crate::domain::fee::FeeAssignment;
use crate::domain::payment::PaymentRecord;
use crate::error::Result;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::io::Read;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Reads JSON documents exported from the backing store.
///
/// A source may hold a single document or an array of them.
pub struct DocumentReader<R: Read> {
    source: R,
}

impl<R: Read> DocumentReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn fee_assignments(self) -> Result<Vec<FeeAssignment>> {
        self.documents()
    }

    pub fn payment_records(self) -> Result<Vec<PaymentRecord>> {
        self.documents()
    }

    fn documents<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let parsed: OneOrMany<T> = serde_json::from_reader(self.source)?;
        Ok(parsed.into())
    }
}
