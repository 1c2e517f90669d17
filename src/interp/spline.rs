//! Cubic interpolating spline with "not-a-knot" end conditions.
//!
//! Second derivatives at the knots are obtained from a small dense linear system
//! (nalgebra LU). Each segment is then stored as a cubic in the local coordinate
//! `t = x - x_i`, which makes root extraction a per-segment polynomial problem.
//!
//! Degenerate sizes:
//! - 2 points: the straight line through them
//! - 3 points: the parabola through them (what not-a-knot reduces to)

use nalgebra::{DMatrix, DVector};

use crate::interp::InterpError;
use crate::math::{cubic_roots_in, eval_cubic};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    /// Ascending coefficients of each segment in `t = x - xs[i]`.
    coeffs: Vec<[f64; 4]>,
}

impl CubicSpline {
    /// `xs` must be strictly increasing and have the same length (>= 2) as `ys`.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self, InterpError> {
        let n = xs.len();
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let m = second_derivatives(&h, ys)?;

        let coeffs = (0..n - 1)
            .map(|i| {
                let hi = h[i];
                [
                    ys[i],
                    (ys[i + 1] - ys[i]) / hi - hi * (2.0 * m[i] + m[i + 1]) / 6.0,
                    m[i] / 2.0,
                    (m[i + 1] - m[i]) / (6.0 * hi),
                ]
            })
            .collect();

        Ok(Self {
            xs: xs.to_vec(),
            coeffs,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the spline; outside the domain the end cubics are extended.
    pub fn eval(&self, x: f64) -> f64 {
        let i = self.segment(x);
        eval_cubic(&self.coeffs[i], x - self.xs[i])
    }

    /// All `x` in the domain where the spline equals `level`, sorted.
    pub fn roots(&self, level: f64) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        for (i, c) in self.coeffs.iter().enumerate() {
            let shifted = [c[0] - level, c[1], c[2], c[3]];
            let h = self.xs[i + 1] - self.xs[i];
            for t in cubic_roots_in(&shifted, 0.0, h) {
                let x = self.xs[i] + t;
                let dup = out
                    .last()
                    .is_some_and(|&last| (last - x).abs() <= 1e-12 * x.abs().max(1.0));
                if !dup {
                    out.push(x);
                }
            }
        }
        out
    }

    fn segment(&self, x: f64) -> usize {
        let n = self.xs.len();
        self.xs.partition_point(|&v| v <= x).clamp(1, n - 1) - 1
    }
}

fn second_derivatives(h: &[f64], ys: &[f64]) -> Result<Vec<f64>, InterpError> {
    let n = ys.len();
    match n {
        2 => return Ok(vec![0.0; 2]),
        3 => {
            let dd2 = ((ys[2] - ys[1]) / h[1] - (ys[1] - ys[0]) / h[0]) / (h[0] + h[1]);
            return Ok(vec![2.0 * dd2; 3]);
        }
        _ => {}
    }

    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    // Third derivative continuous across the second knot...
    a[(0, 0)] = h[1];
    a[(0, 1)] = -(h[0] + h[1]);
    a[(0, 2)] = h[0];

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
    }

    // ...and across the second-to-last knot.
    a[(n - 1, n - 3)] = h[n - 2];
    a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
    a[(n - 1, n - 1)] = h[n - 3];

    let m = a.lu().solve(&rhs).ok_or(InterpError::SingularSpline)?;
    if m.iter().any(|v| !v.is_finite()) {
        return Err(InterpError::SingularSpline);
    }
    Ok(m.iter().copied().collect())
}
