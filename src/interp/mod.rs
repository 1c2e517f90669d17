//! Curve Interpolator: sampled `(value, Δstat)` points -> confidence bounds.
//!
//! Two interchangeable strategies, selected by `InterpMethod`:
//!
//! - `Linear`: piecewise-linear lookup + bracketed (Brent) root finding
//! - `Spline`: cubic interpolating spline + per-segment polynomial roots
//!
//! In both cases the bound on a side is the level crossing adjacent to the
//! best-fit value on that side. Sides whose hard limit was reached are not
//! interpolated; the distance to the limit is reported instead.

pub mod linear;
pub mod spline;

use thiserror::Error;

use crate::domain::{CapPolicy, Direction, HardCapFlags, InterpMethod, Sample};
use crate::math::RootError;

pub use linear::LinearLookup;
pub use spline::CubicSpline;

/// Degenerate or unusable interpolation input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpError {
    #[error("need at least 2 distinct samples to interpolate, got {0}")]
    TooFewSamples(usize),

    #[error("non-finite sample (value={value}, delta_stat={delta_stat})")]
    NonFiniteSample { value: f64, delta_stat: f64 },

    #[error("sampled curve never reaches level {level} on the {side:?} side of {best_fit}")]
    NoCrossing {
        side: Direction,
        level: f64,
        best_fit: f64,
    },

    #[error("spline system is singular")]
    SingularSpline,

    #[error(transparent)]
    Root(#[from] RootError),
}

/// A continuous approximation of Δstat(value).
#[derive(Debug, Clone)]
pub enum Interpolant {
    Linear(LinearLookup),
    Spline(CubicSpline),
}

impl Interpolant {
    /// Build the interpolant of `method` over `samples` (any order).
    pub fn build(method: InterpMethod, samples: &[Sample]) -> Result<Self, InterpError> {
        let (xs, ys) = sorted_unique(samples)?;
        match method {
            InterpMethod::Linear => Ok(Interpolant::Linear(LinearLookup::new(xs, ys))),
            InterpMethod::Spline => Ok(Interpolant::Spline(CubicSpline::fit(&xs, &ys)?)),
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Interpolant::Linear(lut) => lut.eval(x),
            Interpolant::Spline(spline) => spline.eval(x),
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        match self {
            Interpolant::Linear(lut) => lut.domain(),
            Interpolant::Spline(spline) => spline.domain(),
        }
    }

    /// Every value in the domain where the curve equals `level`, sorted.
    pub fn crossings(&self, level: f64) -> Result<Vec<f64>, InterpError> {
        match self {
            Interpolant::Linear(lut) => lut.crossings(level),
            Interpolant::Spline(spline) => Ok(spline.roots(level)),
        }
    }

    /// The crossing of `level` adjacent to `best_fit` on side `side`.
    pub fn crossing(&self, level: f64, best_fit: f64, side: Direction) -> Result<f64, InterpError> {
        let roots = self.crossings(level)?;
        let found = match side {
            Direction::Lower => roots.iter().rev().find(|&&r| r < best_fit),
            Direction::Upper => roots.iter().find(|&&r| r > best_fit),
        };
        found.copied().ok_or(InterpError::NoCrossing {
            side,
            level,
            best_fit,
        })
    }

    /// `n` evenly spaced points of the curve across its domain (for plots).
    pub fn grid(&self, n: usize) -> Vec<(f64, f64)> {
        let n = n.max(2);
        let (x0, x1) = self.domain();
        (0..n)
            .map(|i| {
                let x = x0 + (x1 - x0) * i as f64 / (n as f64 - 1.0);
                (x, self.eval(x))
            })
            .collect()
    }
}

/// Everything needed to turn one parameter's profile into bounds.
#[derive(Debug, Clone)]
pub struct BoundRequest<'a> {
    /// Samples recorded while stepping toward the lower limit.
    pub lower: &'a [Sample],
    /// Samples recorded while stepping toward the upper limit.
    pub upper: &'a [Sample],
    pub best_fit: f64,
    pub level: f64,
    pub hard_caps: HardCapFlags,
    /// `(hard_min, hard_max)` of the parameter.
    pub hard_limits: (f64, f64),
}

/// Bounds for one parameter plus the curve they were read from (if any).
#[derive(Debug, Clone)]
pub struct BoundEstimate {
    pub error_minus: f64,
    pub error_plus: f64,
    pub curve: Option<Interpolant>,
}

/// Compute `(error_minus, error_plus)` following the hard-cap policy.
///
/// The best-fit point `(best_fit, 0)` is always part of the interpolated curve.
/// A capped side contributes its distance to the hard limit; its samples are
/// left out of the curve.
///
/// Fails fast when a side that must be interpolated does not have enough samples
/// to bracket `level`.
pub fn find_bound(req: &BoundRequest<'_>, method: InterpMethod) -> Result<BoundEstimate, InterpError> {
    let (hard_min, hard_max) = req.hard_limits;
    let anchor = Sample {
        value: req.best_fit,
        delta_stat: 0.0,
    };

    let curve_samples = |lower: bool, upper: bool| -> Vec<Sample> {
        let mut out = Vec::with_capacity(req.lower.len() + req.upper.len() + 1);
        if lower {
            out.extend_from_slice(req.lower);
        }
        out.push(anchor);
        if upper {
            out.extend_from_slice(req.upper);
        }
        out
    };

    match req.hard_caps.policy() {
        CapPolicy::BothLimits => Ok(BoundEstimate {
            error_minus: req.best_fit - hard_min,
            error_plus: hard_max - req.best_fit,
            curve: None,
        }),
        CapPolicy::Interpolate => {
            let curve = Interpolant::build(method, &curve_samples(true, true))?;
            let lo = curve.crossing(req.level, req.best_fit, Direction::Lower)?;
            let hi = curve.crossing(req.level, req.best_fit, Direction::Upper)?;
            Ok(BoundEstimate {
                error_minus: req.best_fit - lo,
                error_plus: hi - req.best_fit,
                curve: Some(curve),
            })
        }
        CapPolicy::LowerLimit => {
            let curve = Interpolant::build(method, &curve_samples(false, true))?;
            let hi = curve.crossing(req.level, req.best_fit, Direction::Upper)?;
            Ok(BoundEstimate {
                error_minus: req.best_fit - hard_min,
                error_plus: hi - req.best_fit,
                curve: Some(curve),
            })
        }
        CapPolicy::UpperLimit => {
            let curve = Interpolant::build(method, &curve_samples(true, false))?;
            let lo = curve.crossing(req.level, req.best_fit, Direction::Lower)?;
            Ok(BoundEstimate {
                error_minus: req.best_fit - lo,
                error_plus: hard_max - req.best_fit,
                curve: Some(curve),
            })
        }
    }
}

/// Sort samples by value and drop repeated values (the first recorded one wins).
pub fn sorted_samples(samples: &[Sample]) -> Vec<Sample> {
    let mut sorted = samples.to_vec();
    // Stable: among equal values the earliest recorded sample stays first.
    sorted.sort_by(|a, b| a.value.total_cmp(&b.value));
    sorted.dedup_by(|b, a| a.value == b.value);
    sorted
}

fn sorted_unique(samples: &[Sample]) -> Result<(Vec<f64>, Vec<f64>), InterpError> {
    if let Some(bad) = samples
        .iter()
        .find(|s| !(s.value.is_finite() && s.delta_stat.is_finite()))
    {
        return Err(InterpError::NonFiniteSample {
            value: bad.value,
            delta_stat: bad.delta_stat,
        });
    }

    let sorted = sorted_samples(samples);
    if sorted.len() < 2 {
        return Err(InterpError::TooFewSamples(sorted.len()));
    }
    Ok(sorted.iter().map(|s| (s.value, s.delta_stat)).unzip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn parabola(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .map(|&v| Sample {
                value: v,
                delta_stat: ((v - 1.0) / 0.4).powi(2),
            })
            .collect()
    }

    fn request<'a>(lower: &'a [Sample], upper: &'a [Sample], caps: HardCapFlags) -> BoundRequest<'a> {
        BoundRequest {
            lower,
            upper,
            best_fit: 1.0,
            level: 2.706,
            hard_caps: caps,
            hard_limits: (0.5, 3.0),
        }
    }

    #[test]
    fn both_sides_interpolated_without_caps() {
        let lower = parabola(&[0.6, 0.5, 0.3]);
        let upper = parabola(&[1.4, 1.5, 1.7]);
        let expected = 0.4 * 2.706_f64.sqrt();

        let est = find_bound(&request(&lower, &upper, HardCapFlags::default()), InterpMethod::Spline).unwrap();
        assert_abs_diff_eq!(est.error_minus, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(est.error_plus, expected, epsilon = 1e-9);

        let est = find_bound(&request(&lower, &upper, HardCapFlags::default()), InterpMethod::Linear).unwrap();
        assert!(est.error_minus > 0.0 && est.error_plus > 0.0);
        let curve = est.curve.unwrap();
        assert_abs_diff_eq!(curve.eval(1.0 - est.error_minus), 2.706, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.eval(1.0 + est.error_plus), 2.706, epsilon = 1e-9);
    }

    #[test]
    fn both_caps_use_hard_limits_only() {
        let caps = HardCapFlags { lower: true, upper: true };
        let est = find_bound(&request(&[], &[], caps), InterpMethod::Linear).unwrap();
        assert_abs_diff_eq!(est.error_minus, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(est.error_plus, 2.0, epsilon = 1e-12);
        assert!(est.curve.is_none());
    }

    #[test]
    fn lower_cap_interpolates_upper_side_only() {
        // Lower samples never reach the level; they must not matter.
        let lower = parabola(&[0.8]);
        let upper = parabola(&[1.2, 1.4, 1.6, 1.8]);
        let caps = HardCapFlags { lower: true, upper: false };

        let est = find_bound(&request(&lower, &upper, caps), InterpMethod::Spline).unwrap();
        assert_abs_diff_eq!(est.error_minus, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(est.error_plus, 0.4 * 2.706_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn upper_cap_interpolates_lower_side_only() {
        let lower = parabola(&[0.8, 0.6, 0.4]);
        let upper = parabola(&[1.2]);
        let caps = HardCapFlags { lower: false, upper: true };

        let est = find_bound(&request(&lower, &upper, caps), InterpMethod::Linear).unwrap();
        assert_abs_diff_eq!(est.error_plus, 2.0, epsilon = 1e-12);
        let curve = est.curve.unwrap();
        assert_abs_diff_eq!(curve.eval(1.0 - est.error_minus), 2.706, epsilon = 1e-9);
    }

    #[test]
    fn too_few_samples_fail_fast() {
        let caps = HardCapFlags { lower: true, upper: false };
        let err = find_bound(&request(&[], &[], caps), InterpMethod::Linear).unwrap_err();
        assert_eq!(err, InterpError::TooFewSamples(1));
    }

    #[test]
    fn missing_crossing_is_an_error() {
        let lower = parabola(&[0.9]);
        let upper = parabola(&[1.1]);
        let err = find_bound(&request(&lower, &upper, HardCapFlags::default()), InterpMethod::Linear)
            .unwrap_err();
        assert!(matches!(err, InterpError::NoCrossing { side: Direction::Lower, .. }));
    }

    #[test]
    fn duplicate_values_keep_first_sample() {
        let samples = [
            Sample { value: 2.0, delta_stat: 1.0 },
            Sample { value: 1.0, delta_stat: 0.5 },
            Sample { value: 2.0, delta_stat: 9.0 },
        ];
        let sorted = sorted_samples(&samples);
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[1].delta_stat, 1.0);
    }
}
