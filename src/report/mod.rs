//! Reporting utilities: run summary, ledger tables, elapsed time.

pub mod format;

pub use format::*;
