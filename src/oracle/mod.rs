//! Fit Oracle: the model-fitting engine as seen by the sweep.
//!
//! The sweep never looks inside the optimizer. It only needs to:
//!
//! - list parameters (value, bounds, frozen/linked, uncertainty scale)
//! - freeze a parameter at a chosen value and re-optimize everything else
//! - take and restore snapshots of the best-fit state between probes
//!
//! Every call is blocking; `optimize` may be expensive.

use thiserror::Error;

use crate::domain::{ParameterId, ParameterState, StatMethod};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    #[error("unknown parameter {0}")]
    UnknownParameter(ParameterId),

    #[error("optimization failed: {0}")]
    FitFailed(String),

    #[error("statistic method '{0}' is not supported by this model")]
    UnsupportedStatistic(StatMethod),

    #[error("failed to save best fit: {0}")]
    Save(String),
}

pub trait FitOracle {
    /// Full fit state, enough to put the model back where it was.
    type Snapshot: Clone;

    /// All parameters in id order (ids are 1-based).
    fn parameters(&self) -> Vec<ParameterState>;

    fn parameter(&self, id: ParameterId) -> Result<ParameterState, OracleError> {
        self.parameters()
            .into_iter()
            .find(|p| p.id == id)
            .ok_or(OracleError::UnknownParameter(id))
    }

    fn set_frozen(&mut self, id: ParameterId, frozen: bool) -> Result<(), OracleError>;

    /// Set the parameter to `value` and freeze it there.
    fn set_frozen_value(&mut self, id: ParameterId, value: f64) -> Result<(), OracleError>;

    /// Optimize all free parameters; returns the fit statistic.
    fn optimize(&mut self) -> Result<f64, OracleError>;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: &Self::Snapshot);

    fn set_statistic(&mut self, method: StatMethod) -> Result<(), OracleError>;

    /// Hint for how many worker threads the optimizer may use.
    fn set_parallelism(&mut self, _cores: usize) {}

    /// Persist the current (best) fit, e.g. next to the model file.
    fn save_best_fit(&mut self) -> Result<(), OracleError> {
        Ok(())
    }
}
