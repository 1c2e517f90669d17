//! Built-in model fitting.
//!
//! Responsibilities:
//!
//! - fit statistics (`chi`, `cstat`), evaluated in parallel
//! - the `FitOracle` implementation the CLI hands to the sweep

pub mod fitter;
pub mod statistic;

pub use fitter::*;
