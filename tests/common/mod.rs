//! Synthetic fit oracles for the sweep scenarios.

#![allow(dead_code)]

use steppar_errors::domain::{ParameterId, ParameterState, StatMethod};
use steppar_errors::error::AppError;
use steppar_errors::io::{Checkpoint, CheckpointEntry, CheckpointStore, MemoryCheckpointStore};
use steppar_errors::oracle::{FitOracle, OracleError};

/// One independent parabolic parameter: `Δstat = ((v - center) / scale)²`.
#[derive(Debug, Clone)]
pub struct ParabolaParam {
    pub name: String,
    pub center: f64,
    pub scale: f64,
    pub hard_min: f64,
    pub hard_max: f64,
    /// Uncertainty reported to the sweep, as a multiple of `scale`.
    pub reported: f64,
    pub frozen: bool,
}

impl ParabolaParam {
    pub fn new(name: &str, center: f64, scale: f64) -> Self {
        Self {
            name: name.to_string(),
            center,
            scale,
            hard_min: -100.0,
            hard_max: 100.0,
            reported: 1.0,
            frozen: false,
        }
    }

    pub fn hard_min(mut self, v: f64) -> Self {
        self.hard_min = v;
        self
    }

    pub fn reported(mut self, factor: f64) -> Self {
        self.reported = factor;
        self
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParabolaSnapshot {
    values: Vec<f64>,
    frozen: Vec<bool>,
}

/// `stat = base + Σ ((v_k - center_k) / scale_k)²`; `optimize` puts every free
/// parameter at its (clamped) center.
#[derive(Debug, Clone)]
pub struct ParabolaOracle {
    pub params: Vec<ParabolaParam>,
    pub values: Vec<f64>,
    pub base: f64,
    pub calls: usize,
    pub statistic: Option<StatMethod>,
    /// From this optimize call on (1-based), `base` drops by the given amount.
    pub drop_at: Option<(usize, f64)>,
    /// This optimize call (1-based) fails.
    pub fail_at: Option<usize>,
}

impl ParabolaOracle {
    pub fn new(params: Vec<ParabolaParam>) -> Self {
        let values = params.iter().map(|p| p.center).collect();
        Self {
            params,
            values,
            base: 100.0,
            calls: 0,
            statistic: None,
            drop_at: None,
            fail_at: None,
        }
    }

    pub fn with_drop_at(mut self, call: usize, amount: f64) -> Self {
        self.drop_at = Some((call, amount));
        self
    }

    pub fn with_failure_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    fn statistic(&self) -> f64 {
        let dropped = match self.drop_at {
            Some((call, amount)) if self.calls >= call => amount,
            _ => 0.0,
        };
        let profile: f64 = self
            .params
            .iter()
            .zip(&self.values)
            .map(|(p, v)| ((v - p.center) / p.scale).powi(2))
            .sum();
        self.base - dropped + profile
    }

    fn index(&self, id: ParameterId) -> Result<usize, OracleError> {
        id.checked_sub(1)
            .filter(|&j| j < self.params.len())
            .ok_or(OracleError::UnknownParameter(id))
    }
}

impl FitOracle for ParabolaOracle {
    type Snapshot = ParabolaSnapshot;

    fn parameters(&self) -> Vec<ParameterState> {
        self.params
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(j, (p, &value))| ParameterState {
                id: j + 1,
                name: p.name.clone(),
                value,
                frozen: p.frozen,
                linked: false,
                hard_min: p.hard_min,
                hard_max: p.hard_max,
                uncertainty: p.reported * p.scale,
            })
            .collect()
    }

    fn set_frozen(&mut self, id: ParameterId, frozen: bool) -> Result<(), OracleError> {
        let j = self.index(id)?;
        self.params[j].frozen = frozen;
        Ok(())
    }

    fn set_frozen_value(&mut self, id: ParameterId, value: f64) -> Result<(), OracleError> {
        let j = self.index(id)?;
        self.values[j] = value;
        self.params[j].frozen = true;
        Ok(())
    }

    fn optimize(&mut self) -> Result<f64, OracleError> {
        self.calls += 1;
        if self.fail_at == Some(self.calls) {
            return Err(OracleError::FitFailed(format!("scripted failure at call {}", self.calls)));
        }
        for (p, v) in self.params.iter().zip(self.values.iter_mut()) {
            if !p.frozen {
                *v = p.center.clamp(p.hard_min, p.hard_max);
            }
        }
        Ok(self.statistic())
    }

    fn snapshot(&self) -> Self::Snapshot {
        ParabolaSnapshot {
            values: self.values.clone(),
            frozen: self.params.iter().map(|p| p.frozen).collect(),
        }
    }

    fn restore(&mut self, snapshot: &Self::Snapshot) {
        self.values.clone_from(&snapshot.values);
        for (p, &f) in self.params.iter_mut().zip(&snapshot.frozen) {
            p.frozen = f;
        }
    }

    fn set_statistic(&mut self, method: StatMethod) -> Result<(), OracleError> {
        self.statistic = Some(method);
        Ok(())
    }
}

/// `scale · sqrt(level)`: the exact distance to the level crossing.
pub fn exact_error(scale: f64, level: f64) -> f64 {
    scale * level.sqrt()
}

/// Memory store that also records every write it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    inner: MemoryCheckpointStore,
    pub appends: usize,
    /// Ledger length held at the moment of each `clear`.
    pub cleared_ledgers: Vec<usize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clears(&self) -> usize {
        self.cleared_ledgers.len()
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.inner.checkpoint()
    }
}

impl CheckpointStore for RecordingStore {
    fn load(&self) -> Result<Option<Checkpoint>, AppError> {
        self.inner.load()
    }

    fn append(&mut self, entry: CheckpointEntry<'_>) -> Result<(), AppError> {
        self.appends += 1;
        self.inner.append(entry)
    }

    fn clear(&mut self) -> Result<(), AppError> {
        let held = self.inner.checkpoint().map_or(0, |cp| cp.ledger.len());
        self.cleared_ledgers.push(held);
        self.inner.clear()
    }
}
