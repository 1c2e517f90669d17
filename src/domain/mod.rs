//! Domain types used throughout the sweep.
//!
//! This module defines:
//!
//! - configuration enums (`StatMethod`, `InterpMethod`, `Selection`)
//! - parameter snapshots and profile samples (`ParameterState`, `Sample`)
//! - sweep outputs (`ErrorResult`, `ParameterProfile`, `HardCapFlags`)
//! - the model description file schema (`ModelFile`)

pub mod model;
pub mod types;

pub use model::*;
pub use types::*;
