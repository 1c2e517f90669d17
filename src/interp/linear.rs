//! Piecewise-linear Δstat lookup.
//!
//! Crossings of the target level are located segment by segment: a segment whose
//! end values straddle the level brackets exactly one crossing, which is then
//! refined with `brentq` on the linear interpolant.

use crate::interp::InterpError;
use crate::math::{RootOptions, brentq};

/// Monotonic-in-x lookup table over sorted, de-duplicated samples.
#[derive(Debug, Clone)]
pub struct LinearLookup {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearLookup {
    /// `xs` must be strictly increasing and have the same length (>= 2) as `ys`.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Self {
        Self { xs, ys }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the interpolant; outside the domain the end segments are extended.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let i = self.xs.partition_point(|&v| v <= x).clamp(1, n - 1) - 1;
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        y0 + (x - x0) / (x1 - x0) * (y1 - y0)
    }

    /// All `x` in the domain where the interpolant equals `level`, sorted.
    pub fn crossings(&self, level: f64) -> Result<Vec<f64>, InterpError> {
        let opts = RootOptions::default();
        let mut out: Vec<f64> = Vec::new();

        for i in 0..self.xs.len() - 1 {
            let g0 = self.ys[i] - level;
            let g1 = self.ys[i + 1] - level;
            if g0 == 0.0 {
                push_unique(&mut out, self.xs[i]);
            } else if g0 * g1 < 0.0 {
                let root = brentq(|x| self.eval(x) - level, self.xs[i], self.xs[i + 1], &opts)?;
                push_unique(&mut out, root);
            }
        }

        let last = self.xs.len() - 1;
        if self.ys[last] == level {
            push_unique(&mut out, self.xs[last]);
        }

        Ok(out)
    }
}

fn push_unique(out: &mut Vec<f64>, x: f64) {
    if out.last() != Some(&x) {
        out.push(x);
    }
}
