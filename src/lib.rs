//! `steppar-errors` library crate.
//!
//! Profile-likelihood ("steppar") confidence bounds: each selected parameter is
//! frozen at a sequence of values on both sides of its best fit, the rest of the
//! model is re-optimized, and the bounds are read off the Δstat profile where it
//! crosses the target level.
//!
//! The binary (`steppar`) is a thin wrapper around this library so that:
//!
//! - the sweep is testable with synthetic fit oracles
//! - the built-in fitter is only one `FitOracle` among others

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod interp;
pub mod io;
pub mod math;
pub mod models;
pub mod oracle;
pub mod plot;
pub mod report;
pub mod steppar;
