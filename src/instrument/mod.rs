//! Instrumentation for comparing the indexed path with a full scan.
//!
//! - [`linear_scan`] / [`ScanStats`] - The baseline: read every block
//! - [`compare_delete`] / [`Comparison`] - Run both and report side by side

mod comparison;
mod scan;

pub use comparison::{compare_delete, Comparison};
pub use scan::{linear_scan, ScanStats};
