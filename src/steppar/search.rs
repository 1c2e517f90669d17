//! Bound Search: step one parameter away from its best fit in one direction.
//!
//! Probe `k` sits at `best_fit + sign * k * step_size`, starting at
//! `k = step_multiplier`. Each probe freezes the parameter there, re-optimizes the
//! rest and records `Δstat = statistic - reference`. The direction ends when
//! Δstat reaches `level + overshoot_margin` or the next probe would cross the
//! hard limit.
//!
//! Two special cases:
//!
//! - Δstat below `-critical_delta`: the probe found a better optimum. The search
//!   stops immediately and reports `SearchOutcome::NewOptimum`.
//! - Δstat above `level` after fewer than `min_fits_before_accept` fits: the
//!   steps are too coarse. The step size is divided by `refine_factor` and the
//!   direction starts again at `k = 1`. Lower-direction samples collected so far
//!   are discarded; upper-direction samples are kept.

use tracing::{debug, info, warn};

use crate::domain::{Direction, ParameterId, Sample, SweepConfig};
use crate::oracle::{FitOracle, OracleError};
use crate::steppar::{SweepError, SweepState};

/// Where and how far to step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionPlan {
    pub id: ParameterId,
    pub direction: Direction,
    pub best_fit: f64,
    /// Hard limit on the side `direction` points to.
    pub hard_limit: f64,
    pub step_size: f64,
}

/// Raw result of one finished direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionSamples {
    /// In probe order (not necessarily sorted after a refinement retry).
    pub samples: Vec<Sample>,
    pub hard_cap_hit: bool,
    /// Oracle optimizations performed in this direction, retries included.
    pub fits: usize,
    pub refinements: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(DirectionSamples),
    /// A probe beat the reference; the oracle is left at that better fit,
    /// with the parameter unfrozen.
    NewOptimum { statistic: f64 },
}

/// Run the stepping loop for one direction.
///
/// `baseline` is restored before every probe, so probes do not leak into each other.
pub fn search_direction<O: FitOracle>(
    oracle: &mut O,
    baseline: &O::Snapshot,
    plan: &DirectionPlan,
    state: &mut SweepState,
    config: &SweepConfig,
) -> Result<SearchOutcome, SweepError> {
    let stop_level = config.stop_level();
    let sign = plan.direction.sign();

    let mut out = DirectionSamples::default();
    let mut step_size = plan.step_size;
    let mut step = config.step_multiplier;
    let mut fits = 0usize;
    let mut dstat = 0.0;

    info!(param = plan.id, "Initiating direction {}", plan.direction);

    while dstat < stop_level && !out.hard_cap_hit {
        oracle.restore(baseline);
        let value = plan.best_fit + sign * f64::from(step) * step_size;

        if plan.direction.crosses(value, plan.hard_limit) {
            warn!(
                param = plan.id,
                value,
                limit = plan.hard_limit,
                "Hard {} limit hit",
                match plan.direction {
                    Direction::Lower => "min",
                    Direction::Upper => "max",
                }
            );
            out.hard_cap_hit = true;
            break;
        }

        oracle.set_frozen_value(plan.id, value)?;
        let statistic = oracle.optimize()?;
        if !statistic.is_finite() {
            return Err(OracleError::FitFailed(format!(
                "non-finite statistic with parameter {} frozen at {value}",
                plan.id
            ))
            .into());
        }
        state.record_fit();
        out.fits += 1;
        fits += 1;
        dstat = statistic - state.reference();

        if dstat < -config.critical_delta {
            info!(param = plan.id, value, dstat, "New minimum statistic found");
            oracle.set_frozen(plan.id, false)?;
            return Ok(SearchOutcome::NewOptimum { statistic });
        }

        if dstat > config.level && fits < config.min_fits_before_accept {
            step_size /= config.refine_factor;
            if !(step_size > 0.0) || plan.best_fit + sign * step_size == plan.best_fit {
                return Err(SweepError::DegenerateStep {
                    id: plan.id,
                    step: step_size,
                });
            }
            warn!(
                param = plan.id,
                value,
                dstat,
                step_size,
                "Not enough points, refining step"
            );
            fits = 0;
            dstat = 0.0;
            step = 1;
            out.refinements += 1;
            if plan.direction == Direction::Lower {
                out.samples.clear();
            }
            continue;
        }

        out.samples.push(Sample {
            value,
            delta_stat: dstat,
        });
        debug!(
            param = plan.id,
            step,
            value,
            dstat,
            offset = plan.best_fit - value,
            "STEP"
        );
        step += 1;
    }

    Ok(SearchOutcome::Completed(out))
}
