//! Application layer.
//!
//! [`allocator::AllocationEngine`] splits a payment across outstanding fee
//! categories; it is synchronous and owned by a single payment-entry session.
//! [`recorder::PaymentRecorder`] validates the resulting payment record and
//! submits it through the async `PaymentStore` port.

pub mod allocator;
pub mod recorder;
