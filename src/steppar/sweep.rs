//! Sweep Controller.
//!
//! For every selected parameter, in order:
//!
//! 1. search both directions (`search::search_direction`)
//! 2. classify the hard-cap outcome and read the bounds off the profile
//!    (`interp::find_bound`)
//! 3. append the result to the ledger and checkpoint it
//!
//! A new optimum found in step 1 throws away every result (in memory and in the
//! store), moves the reference to the better statistic and starts again from
//! the first parameter.
//!
//! Before any fitting, a checkpoint with the same fingerprint is either reused
//! as is (complete: "already computed", no oracle work at all) or resumed from
//! its cursor. A checkpoint with a different fingerprint is discarded.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    ConfigError, Direction, ErrorResult, Fingerprint, HardCapFlags, ParameterId, ParameterProfile,
    ParameterState, Sample, Selection, StatMethod, SweepConfig,
};
use crate::error::AppError;
use crate::interp::{BoundRequest, Interpolant, find_bound, sorted_samples};
use crate::io::checkpoint::{CheckpointEntry, CheckpointStore};
use crate::oracle::FitOracle;
use crate::steppar::search::{DirectionPlan, SearchOutcome, search_direction};
use crate::steppar::{SweepError, SweepState};

/// What to sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepRequest {
    pub selection: Selection,
    /// Parameter names frozen before anything else happens.
    pub blacklist: Vec<String>,
    /// Parallelism hint handed to the oracle (0 = oracle default).
    pub cores: usize,
}

impl SweepRequest {
    pub fn all() -> Self {
        Self {
            selection: Selection::All,
            blacklist: Vec::new(),
            cores: 0,
        }
    }
}

/// Everything a renderer needs to draw one parameter's profile.
#[derive(Debug, Clone, Copy)]
pub struct ProfileBundle<'a> {
    pub parameter: &'a ParameterState,
    pub result: &'a ErrorResult,
    pub profile: &'a ParameterProfile,
    /// `None` when both bounds came from hard limits.
    pub curve: Option<&'a Interpolant>,
    pub level: f64,
    pub statistic: StatMethod,
}

/// Receives a bundle per finished parameter. Failures are logged, never fatal.
pub trait ProfileSink {
    fn emit(&mut self, bundle: &ProfileBundle<'_>) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub ledger: Vec<ErrorResult>,
    pub profiles: Vec<ParameterProfile>,
    pub reference_statistic: f64,
    /// Oracle optimizations performed by this run.
    pub fit_count: usize,
    pub restarts: usize,
    /// The store already held a complete ledger; nothing was fitted.
    pub already_computed: bool,
    /// Cursor the run started from (non-zero when resuming).
    pub resumed_from: usize,
}

enum ParameterOutcome {
    Finished {
        result: ErrorResult,
        profile: ParameterProfile,
        curve: Option<Interpolant>,
    },
    NewOptimum(f64),
}

pub struct SweepController<'a, O: FitOracle, S: CheckpointStore> {
    oracle: &'a mut O,
    store: &'a mut S,
    config: SweepConfig,
    sink: Option<&'a mut dyn ProfileSink>,
}

impl<'a, O: FitOracle, S: CheckpointStore> SweepController<'a, O, S> {
    pub fn new(oracle: &'a mut O, store: &'a mut S, config: SweepConfig) -> Self {
        Self {
            oracle,
            store,
            config,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: &'a mut dyn ProfileSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn run(&mut self, request: &SweepRequest) -> Result<SweepReport, SweepError> {
        self.config.validate()?;
        let started = Utc::now();

        self.freeze_blacklist(&request.blacklist)?;
        let working = resolve_parameters(&self.oracle.parameters(), &request.selection)?;
        info!(parameters = ?working, "Free parameters: {}", working.len());

        let fingerprint = Fingerprint {
            parameters: working.clone(),
            level: self.config.level,
            statistic: self.config.statistic,
            interp: self.config.interp,
        };

        let checkpoint = match self.store.load()? {
            Some(cp) if !cp.fingerprint.matches(&fingerprint) => {
                warn!(
                    stored = ?cp.fingerprint,
                    "Checkpoint belongs to a different sweep; discarding it"
                );
                self.store.clear()?;
                None
            }
            other => other,
        };

        if let Some(cp) = checkpoint.as_ref().filter(|cp| cp.is_complete()) {
            warn!("Errors on this model were already computed");
            return Ok(SweepReport {
                ledger: cp.ledger.clone(),
                profiles: cp.profiles.clone(),
                reference_statistic: cp.reference_statistic,
                fit_count: 0,
                restarts: 0,
                already_computed: true,
                resumed_from: cp.cursor,
            });
        }

        self.oracle.set_statistic(self.config.statistic)?;
        if request.cores > 0 {
            self.oracle.set_parallelism(request.cores);
        }
        let initial = self.oracle.optimize()?;
        self.oracle.save_best_fit()?;
        info!(statistic = initial, method = %self.config.statistic, "Initial fit");

        let mut state = match checkpoint {
            Some(cp) if initial < cp.reference_statistic - self.config.critical_delta => {
                info!(
                    stored = cp.reference_statistic,
                    statistic = initial,
                    "Fresh fit beats the checkpoint; starting over"
                );
                self.store.clear()?;
                SweepState::new(initial)
            }
            Some(cp) => {
                if let Some(&next) = working.get(cp.cursor) {
                    info!(param = next, "Restarting steppar from parameter {next}");
                }
                SweepState::resume(cp, initial)
            }
            None => {
                info!("Initializing steppar");
                SweepState::new(initial)
            }
        };
        state.record_fit();
        let resumed_from = state.cursor();
        let mut baseline = self.oracle.snapshot();

        while let Some(&id) = working.get(state.cursor()) {
            self.oracle.restore(&baseline);
            let param = self.oracle.parameter(id)?;
            if !param.is_free() {
                info!(param = id, "Frozen or linked parameter, passing");
                state.skip();
                continue;
            }

            match self.profile_parameter(&param, &baseline, &mut state)? {
                ParameterOutcome::NewOptimum(statistic) => {
                    warn!(
                        param = id,
                        old = state.reference(),
                        new = statistic,
                        "Better fit found; restarting from the first parameter"
                    );
                    state.reset_for_optimum(statistic);
                    self.store.clear()?;
                    self.oracle.save_best_fit()?;
                    baseline = self.oracle.snapshot();
                }
                ParameterOutcome::Finished {
                    result,
                    profile,
                    curve,
                } => {
                    self.oracle.restore(&baseline);
                    info!(
                        param = id,
                        best_fit = result.best_fit,
                        minus = result.error_minus,
                        plus = result.error_plus,
                        hard_min_hit = result.hard_caps.lower,
                        hard_max_hit = result.hard_caps.upper,
                        "Errors on {}",
                        result.name
                    );
                    self.emit(&param, &result, &profile, curve.as_ref());

                    state.accept(result.clone(), profile.clone());
                    self.store.append(CheckpointEntry {
                        fingerprint: &fingerprint,
                        reference_statistic: state.reference(),
                        cursor: state.cursor(),
                        result: &result,
                        profile: &profile,
                    })?;
                }
            }
        }

        info!(
            fits = state.fit_count(),
            restarts = state.restarts(),
            "Finished in {}",
            crate::report::format_elapsed(Utc::now() - started)
        );

        let reference_statistic = state.reference();
        let fit_count = state.fit_count();
        let restarts = state.restarts();
        let (ledger, profiles) = state.into_parts();
        Ok(SweepReport {
            ledger,
            profiles,
            reference_statistic,
            fit_count,
            restarts,
            already_computed: false,
            resumed_from,
        })
    }

    fn freeze_blacklist(&mut self, blacklist: &[String]) -> Result<(), SweepError> {
        if blacklist.is_empty() {
            return Ok(());
        }
        let params = self.oracle.parameters();
        let mut frozen = Vec::new();
        for name in blacklist {
            let matching: Vec<&ParameterState> = params.iter().filter(|p| &p.name == name).collect();
            if matching.is_empty() {
                warn!("No parameter named '{name}' to blacklist");
            }
            for p in matching.into_iter().filter(|p| !p.frozen) {
                self.oracle.set_frozen(p.id, true)?;
                frozen.push(p.id);
            }
        }
        info!(blacklist = ?blacklist, frozen = ?frozen, "Blacklisted parameters frozen");
        Ok(())
    }

    fn profile_parameter(
        &mut self,
        param: &ParameterState,
        baseline: &O::Snapshot,
        state: &mut SweepState,
    ) -> Result<ParameterOutcome, SweepError> {
        let id = param.id;
        let best_fit = param.value;
        let mut caps = HardCapFlags::default();

        let mut step_size = param.uncertainty / f64::from(self.config.step_multiplier);
        if param.uncertainty <= 0.0 {
            if (best_fit - param.hard_min).abs() < self.config.pegged_tolerance {
                warn!(param = id, value = best_fit, "Parameter pegged at the hard lower limit");
                caps.mark(Direction::Lower);
            }
            if (best_fit - param.hard_max).abs() < self.config.pegged_tolerance {
                warn!(param = id, value = best_fit, "Parameter pegged at the hard upper limit");
                caps.mark(Direction::Upper);
            }
            step_size = (best_fit / 10.0).abs();
        }
        let pegged = caps.lower || caps.upper;
        if pegged && !usable_step(step_size) {
            // Pegged at a zero limit: step in fractions of the allowed range instead.
            let from_limits =
                (param.hard_max - param.hard_min) / (10.0 * f64::from(self.config.step_multiplier));
            if usable_step(from_limits) {
                step_size = from_limits;
            } else {
                warn!(param = id, value = best_fit, "No usable step, reporting both hard limits");
                caps.mark(Direction::Lower);
                caps.mark(Direction::Upper);
            }
        }
        let needs_steps = !(caps.lower && caps.upper);
        if needs_steps && !usable_step(step_size) {
            return Err(SweepError::DegenerateStep { id, step: step_size });
        }

        info!(param = id, initial_value = best_fit, "Starting steppar on parameter {}", param.name);

        let mut lower = Vec::new();
        let mut upper = Vec::new();
        for dir in Direction::ALL {
            if caps.is_hit(dir) {
                continue;
            }
            let plan = DirectionPlan {
                id,
                direction: dir,
                best_fit,
                hard_limit: param.hard_limit(dir),
                step_size,
            };
            match search_direction(self.oracle, baseline, &plan, state, &self.config)? {
                SearchOutcome::NewOptimum { statistic } => {
                    return Ok(ParameterOutcome::NewOptimum(statistic));
                }
                SearchOutcome::Completed(out) => {
                    if out.hard_cap_hit {
                        caps.mark(dir);
                    }
                    match dir {
                        Direction::Lower => lower = out.samples,
                        Direction::Upper => upper = out.samples,
                    }
                }
            }
        }

        let estimate = find_bound(
            &BoundRequest {
                lower: &lower,
                upper: &upper,
                best_fit,
                level: self.config.level,
                hard_caps: caps,
                hard_limits: (param.hard_min, param.hard_max),
            },
            self.config.interp,
        )
        .map_err(|source| SweepError::Interp { id, source })?;

        let mut samples = lower;
        samples.push(Sample {
            value: best_fit,
            delta_stat: 0.0,
        });
        samples.extend(upper);

        Ok(ParameterOutcome::Finished {
            result: ErrorResult {
                id,
                name: param.name.clone(),
                best_fit,
                error_minus: estimate.error_minus,
                error_plus: estimate.error_plus,
                hard_caps: caps,
            },
            profile: ParameterProfile {
                id,
                best_fit,
                samples: sorted_samples(&samples),
                hard_caps: caps,
            },
            curve: estimate.curve,
        })
    }

    fn emit(
        &mut self,
        param: &ParameterState,
        result: &ErrorResult,
        profile: &ParameterProfile,
        curve: Option<&Interpolant>,
    ) {
        let Some(sink) = self.sink.as_deref_mut() else {
            return;
        };
        let bundle = ProfileBundle {
            parameter: param,
            result,
            profile,
            curve,
            level: self.config.level,
            statistic: self.config.statistic,
        };
        if let Err(e) = sink.emit(&bundle) {
            warn!(param = param.id, "Could not render the profile plot: {e}");
        }
    }
}

fn usable_step(step: f64) -> bool {
    step.is_finite() && step > 0.0
}

/// Working list: free parameters, restricted to `selection` when it is a list.
///
/// Frozen entries of an explicit list are dropped with a warning, linked ones
/// with a note. Unknown or repeated ids are configuration errors.
pub fn resolve_parameters(
    params: &[ParameterState],
    selection: &Selection,
) -> Result<Vec<ParameterId>, ConfigError> {
    let ids = match selection {
        Selection::All => return Ok(params.iter().filter(|p| p.is_free()).map(|p| p.id).collect()),
        Selection::List(ids) => ids,
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(ids.len());
    for &id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateSelection(id));
        }
        let p = params
            .iter()
            .find(|p| p.id == id)
            .ok_or(ConfigError::SelectionOutOfRange {
                id,
                count: params.len(),
            })?;
        if p.frozen {
            warn!(param = id, "Parameter {id} {} is frozen but in the selection; removing it", p.name);
        } else if p.linked {
            info!(param = id, "Parameter {id} {} is linked; removing it from the selection", p.name);
        } else {
            out.push(id);
        }
    }
    Ok(out)
}
