//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - threaded through the sweep in-memory
//! - persisted in the checkpoint file and the ledger table
//! - reloaded later for reporting

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 1-based index of a model parameter, in model-file order.
pub type ParameterId = usize;

/// Errors in the run configuration. These abort before any fitting happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unrecognized statistic method '{0}' (expected 'cstat' or 'chi')")]
    UnknownStatistic(String),

    #[error("malformed parameter selection '{0}' (expected 'all' or a list like '1,3,5')")]
    MalformedSelection(String),

    #[error("selected parameter {id} does not exist (model has {count} parameters)")]
    SelectionOutOfRange { id: ParameterId, count: usize },

    #[error("parameter {0} is selected more than once")]
    DuplicateSelection(ParameterId),

    #[error("invalid confidence level {0} (must be finite and > 0)")]
    InvalidLevel(f64),
}

/// Fit statistic used by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatMethod {
    /// Poisson likelihood ratio (Cash statistic).
    Cstat,
    /// Gaussian χ².
    Chi,
}

impl StatMethod {
    /// Label used in plots and reports (`Δcstat`, `Δχ²`).
    pub fn delta_label(self) -> &'static str {
        match self {
            StatMethod::Cstat => "Δcstat",
            StatMethod::Chi => "Δχ²",
        }
    }
}

impl FromStr for StatMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cstat" => Ok(StatMethod::Cstat),
            "chi" => Ok(StatMethod::Chi),
            other => Err(ConfigError::UnknownStatistic(other.to_string())),
        }
    }
}

impl fmt::Display for StatMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatMethod::Cstat => write!(f, "cstat"),
            StatMethod::Chi => write!(f, "chi"),
        }
    }
}

/// How the sampled Δstat curve is turned into a continuous function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InterpMethod {
    /// Piecewise-linear lookup + bracketed root finding.
    Linear,
    /// Cubic interpolating spline + polynomial root extraction.
    Spline,
}

impl fmt::Display for InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpMethod::Linear => write!(f, "linear"),
            InterpMethod::Spline => write!(f, "spline"),
        }
    }
}

/// Which parameters the sweep should compute errors for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every free (unfrozen, unlinked) parameter.
    All,
    /// An explicit ordered list of parameter ids.
    List(Vec<ParameterId>),
}

impl FromStr for Selection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Selection::All);
        }

        let mut ids = Vec::new();
        for part in trimmed.split(',') {
            let id: ParameterId = part
                .trim()
                .parse()
                .map_err(|_| ConfigError::MalformedSelection(s.to_string()))?;
            if id == 0 {
                return Err(ConfigError::MalformedSelection(s.to_string()));
            }
            if ids.contains(&id) {
                return Err(ConfigError::DuplicateSelection(id));
            }
            ids.push(id);
        }
        Ok(Selection::List(ids))
    }
}

/// Snapshot of one model parameter as reported by the fit oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub id: ParameterId,
    pub name: String,
    pub value: f64,
    pub frozen: bool,
    pub linked: bool,
    pub hard_min: f64,
    pub hard_max: f64,
    /// 1σ-like scale from the last fit; non-positive when the fit could not estimate it.
    pub uncertainty: f64,
}

impl ParameterState {
    /// Free parameters are the ones the sweep may step.
    pub fn is_free(&self) -> bool {
        !self.frozen && !self.linked
    }

    /// Hard limit on the side `dir` points to.
    pub fn hard_limit(&self, dir: Direction) -> f64 {
        match dir {
            Direction::Lower => self.hard_min,
            Direction::Upper => self.hard_max,
        }
    }
}

/// Stepping direction away from the best-fit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Lower,
    Upper,
}

impl Direction {
    /// Order in which directions are searched.
    pub const ALL: [Direction; 2] = [Direction::Lower, Direction::Upper];

    pub fn sign(self) -> f64 {
        match self {
            Direction::Lower => -1.0,
            Direction::Upper => 1.0,
        }
    }

    /// Whether `value` lies beyond `limit` on this side.
    pub fn crosses(self, value: f64, limit: f64) -> bool {
        match self {
            Direction::Lower => value < limit,
            Direction::Upper => value > limit,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Lower => write!(f, "<== lower"),
            Direction::Upper => write!(f, "upper ==>"),
        }
    }
}

/// One profiled point: the parameter was frozen at `value` and the rest re-fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub delta_stat: f64,
}

/// Which hard limits were reached while stepping a parameter.
///
/// Flags only ever go from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardCapFlags {
    pub lower: bool,
    pub upper: bool,
}

/// Where each bound of an `ErrorResult` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapPolicy {
    /// Neither side capped: interpolate both bounds from all samples.
    Interpolate,
    /// Both sides capped: both bounds are the hard limits.
    BothLimits,
    /// Lower side capped: lower bound is the hard limit, upper is interpolated.
    LowerLimit,
    /// Upper side capped: upper bound is the hard limit, lower is interpolated.
    UpperLimit,
}

impl HardCapFlags {
    pub fn is_hit(&self, dir: Direction) -> bool {
        match dir {
            Direction::Lower => self.lower,
            Direction::Upper => self.upper,
        }
    }

    pub fn mark(&mut self, dir: Direction) {
        match dir {
            Direction::Lower => self.lower = true,
            Direction::Upper => self.upper = true,
        }
    }

    pub fn policy(&self) -> CapPolicy {
        match (self.lower, self.upper) {
            (false, false) => CapPolicy::Interpolate,
            (true, true) => CapPolicy::BothLimits,
            (true, false) => CapPolicy::LowerLimit,
            (false, true) => CapPolicy::UpperLimit,
        }
    }
}

/// Confidence bounds for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub id: ParameterId,
    pub name: String,
    pub best_fit: f64,
    /// Non-negative distance from `best_fit` to the lower bound.
    pub error_minus: f64,
    /// Non-negative distance from `best_fit` to the upper bound.
    pub error_plus: f64,
    pub hard_caps: HardCapFlags,
}

impl ErrorResult {
    pub fn lower_bound(&self) -> f64 {
        self.best_fit - self.error_minus
    }

    pub fn upper_bound(&self) -> f64 {
        self.best_fit + self.error_plus
    }
}

/// Raw profile of one parameter, kept next to its `ErrorResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProfile {
    pub id: ParameterId,
    pub best_fit: f64,
    /// Sorted by value, including the `(best_fit, 0)` anchor.
    pub samples: Vec<Sample>,
    pub hard_caps: HardCapFlags,
}

/// Identity of a sweep: results are only reusable under the same fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub parameters: Vec<ParameterId>,
    pub level: f64,
    pub statistic: StatMethod,
    pub interp: InterpMethod,
}

impl Fingerprint {
    pub fn matches(&self, other: &Fingerprint) -> bool {
        self.parameters == other.parameters
            && (self.level - other.level).abs() <= 1e-12 * self.level.abs().max(1.0)
            && self.statistic == other.statistic
            && self.interp == other.interp
    }
}

/// Tunables of the stepping/interpolation engine.
///
/// Built from CLI flags via `SweepConfig::new`; the remaining knobs keep their defaults.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Target Δstat (2.706 ↔ 90% for one parameter).
    pub level: f64,
    pub statistic: StatMethod,
    pub interp: InterpMethod,
    /// A probe that improves the reference by more than this is a new optimum.
    pub critical_delta: f64,
    /// Initial step multiplier; the base step is `uncertainty / step_multiplier`.
    pub step_multiplier: u32,
    /// Step size divisor applied on a refinement retry.
    pub refine_factor: f64,
    /// An overshoot within fewer fits than this triggers a refinement retry.
    pub min_fits_before_accept: usize,
    /// A direction stops once Δstat reaches `level + overshoot_margin`.
    pub overshoot_margin: f64,
    /// Distance to a hard limit under which a parameter counts as pegged.
    pub pegged_tolerance: f64,
    /// Number of points used to draw the interpolated curve.
    pub plot_grid_points: usize,
}

impl SweepConfig {
    pub fn new(level: f64, statistic: StatMethod, interp: InterpMethod) -> Self {
        Self {
            level,
            statistic,
            interp,
            critical_delta: 0.01,
            step_multiplier: 4,
            refine_factor: 4.0,
            min_fits_before_accept: 3,
            overshoot_margin: 0.1,
            pegged_tolerance: 1e-8,
            plot_grid_points: 400,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.level.is_finite() && self.level > 0.0) {
            return Err(ConfigError::InvalidLevel(self.level));
        }
        Ok(())
    }

    /// Δstat at which a direction stops stepping.
    pub fn stop_level(&self) -> f64 {
        self.level + self.overshoot_margin
    }
}
