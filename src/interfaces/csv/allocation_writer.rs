use crate::domain::allocation::PaymentAllocation;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AllocationRow<'a> {
    category_id: &'a str,
    category_name: &'a str,
    #[serde(rename = "type")]
    fee_type: &'a str,
    amount: String,
}

/// Writes payment allocations as CSV, one row per category.
pub struct AllocationWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AllocationWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header and every allocation, then flushes.
    ///
    /// The header is written even when there are no allocations.
    pub fn write_allocations(&mut self, allocations: &[PaymentAllocation]) -> Result<()> {
        if allocations.is_empty() {
            self.writer
                .write_record(["category_id", "category_name", "type", "amount"])?;
        }
        for allocation in allocations {
            self.writer.serialize(AllocationRow {
                category_id: &allocation.category_id,
                category_name: &allocation.category_name,
                fee_type: &allocation.fee_type,
                amount: allocation.amount.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
