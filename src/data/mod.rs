//! Data generation.

pub mod simulate;

pub use simulate::*;
