//! Component model implementations.
//!
//! Models are implemented as small, pure functions so that the fitter and the
//! simulator can stay generic.

pub mod model;

pub use model::*;
