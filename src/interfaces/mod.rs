//! Document formats at the edge of the crate: JSON in, CSV out.

pub mod csv;
pub mod json;
