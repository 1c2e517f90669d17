//! Scalar root finding.
//!
//! - `brentq`: Brent's method on a sign-changing bracket (inverse quadratic
//!   interpolation with bisection fallback).
//! - `cubic_roots_in`: all real roots of a cubic polynomial inside an interval,
//!   found by splitting the interval at the polynomial's critical points so that
//!   each piece is monotone, then bracketing each sign change.

use thiserror::Error;

/// Errors from bracketed root finding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RootError {
    #[error("no root in bracket: f({left})={f_left}, f({right})={f_right}")]
    NoBracket {
        left: f64,
        right: f64,
        f_left: f64,
        f_right: f64,
    },

    #[error("non-finite function value {value} at x = {x}")]
    NonFinite { x: f64, value: f64 },

    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),
}

/// Tolerances for `brentq`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOptions {
    pub max_iter: usize,
    pub xtol: f64,
    pub rtol: f64,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            xtol: 1e-12,
            rtol: 4.0 * f64::EPSILON,
        }
    }
}

/// Find a root of `f` inside `[left, right]`.
///
/// `f(left)` and `f(right)` must have opposite signs (or one of them be zero).
pub fn brentq<F>(f: F, left: f64, right: f64, opts: &RootOptions) -> Result<f64, RootError>
where
    F: Fn(f64) -> f64,
{
    let mut a = left;
    let mut b = right;
    let mut fa = finite(a, f(a))?;
    let mut fb = finite(b, f(b))?;

    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(RootError::NoBracket {
            left,
            right,
            f_left: fa,
            f_right: fb,
        });
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..opts.max_iter {
        if (fb > 0.0 && fc > 0.0) || (fb < 0.0 && fc < 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * opts.rtol * b.abs() + 0.5 * opts.xtol;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let qa = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * qa * (qa - r) - (b - a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let min1 = 3.0 * xm * q - (tol * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(xm) };
        fb = finite(b, f(b))?;
    }

    Err(RootError::MaxIterations(opts.max_iter))
}

fn finite(x: f64, value: f64) -> Result<f64, RootError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RootError::NonFinite { x, value })
    }
}

/// Evaluate `c[0] + c[1] t + c[2] t² + c[3] t³`.
pub fn eval_cubic(c: &[f64; 4], t: f64) -> f64 {
    ((c[3] * t + c[2]) * t + c[1]) * t + c[0]
}

/// Real roots of the cubic `c` (ascending coefficients) inside `[lo, hi]`, sorted.
pub fn cubic_roots_in(c: &[f64; 4], lo: f64, hi: f64) -> Vec<f64> {
    let scale = c.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);
    let zero_tol = 1e-14 * scale;

    let mut knots = vec![lo];
    for t in critical_points(c) {
        if t > lo && t < hi {
            knots.push(t);
        }
    }
    knots.push(hi);
    knots.sort_by(|a, b| a.total_cmp(b));

    let opts = RootOptions::default();
    let mut roots: Vec<f64> = Vec::new();
    for w in knots.windows(2) {
        let (u, v) = (w[0], w[1]);
        let pu = eval_cubic(c, u);
        let pv = eval_cubic(c, v);
        if pu.abs() <= zero_tol {
            push_unique(&mut roots, u);
        } else if pu * pv < 0.0 {
            if let Ok(r) = brentq(|t| eval_cubic(c, t), u, v, &opts) {
                push_unique(&mut roots, r);
            }
        }
    }
    if eval_cubic(c, hi).abs() <= zero_tol {
        push_unique(&mut roots, hi);
    }

    roots
}

/// Zeros of the derivative `c[1] + 2 c[2] t + 3 c[3] t²`.
fn critical_points(c: &[f64; 4]) -> Vec<f64> {
    let (a, b, q) = (3.0 * c[3], 2.0 * c[2], c[1]);
    if a.abs() <= f64::EPSILON * (b.abs() + q.abs()) {
        if b != 0.0 {
            return vec![-q / b];
        }
        return Vec::new();
    }
    let disc = b * b - 4.0 * a * q;
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    vec![(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)]
}

fn push_unique(roots: &mut Vec<f64>, r: f64) {
    let close = roots
        .last()
        .is_some_and(|&last| (last - r).abs() <= 1e-12 * r.abs().max(1.0));
    if !close {
        roots.push(r);
    }
}
