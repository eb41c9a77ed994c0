//! Domain types: money, fee obligations, allocations and payment records,
//! plus the ports the application layer talks through.

pub mod allocation;
pub mod fee;
pub mod money;
pub mod payment;
pub mod ports;
