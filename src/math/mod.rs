//! Mathematical utilities: weighted least squares and scalar root finding.

pub mod ols;
pub mod roots;

pub use ols::*;
pub use roots::*;
