//! Steppar: profile every selected parameter and turn the profiles into errors.
//!
//! - `search`: the adaptive stepper for one parameter and one direction
//! - `state`: `SweepState`, the only mutable state of a sweep
//! - `sweep`: `SweepController`, which orders parameters, handles hard caps,
//!   checkpoints results and restarts when a better optimum shows up
//!
//! A better optimum is not an error. It travels up as `SearchOutcome::NewOptimum`
//! and is handled by the controller as an ordinary branch.

pub mod search;
pub mod state;
pub mod sweep;

use thiserror::Error;

use crate::domain::{ConfigError, ParameterId};
use crate::error::AppError;
use crate::interp::InterpError;
use crate::oracle::OracleError;

pub use search::{DirectionPlan, DirectionSamples, SearchOutcome, search_direction};
pub use state::SweepState;
pub use sweep::{ProfileBundle, ProfileSink, SweepController, SweepReport, SweepRequest};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Store(AppError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("parameter {id}: {source}")]
    Interp {
        id: ParameterId,
        #[source]
        source: InterpError,
    },

    #[error("parameter {id}: step size {step} is not usable (no uncertainty and a zero best-fit value?)")]
    DegenerateStep { id: ParameterId, step: f64 },
}

impl From<AppError> for SweepError {
    fn from(err: AppError) -> Self {
        SweepError::Store(err)
    }
}
