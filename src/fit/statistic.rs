//! Fit statistics over binned data.
//!
//! - `chi`: `Σ (y - μ)² / σ²`
//! - `cstat`: `2 Σ (μ - y + y ln(y/μ))` (Poisson likelihood ratio; `y = 0` bins add `2μ`)
//!
//! Per-bin terms are summed with rayon; callers pick the pool.

use rayon::prelude::*;

use crate::domain::{DataPoint, StatMethod};

/// Smallest model value used in `cstat` and in Poisson weights.
pub const MU_FLOOR: f64 = 1e-10;

pub fn evaluate(method: StatMethod, data: &[DataPoint], mu: &[f64]) -> f64 {
    match method {
        StatMethod::Chi => chi_square(data, mu),
        StatMethod::Cstat => cstat(data, mu),
    }
}

pub fn chi_square(data: &[DataPoint], mu: &[f64]) -> f64 {
    data.par_iter()
        .zip(mu.par_iter())
        .map(|(d, &m)| {
            let r = (d.y - m) / d.sigma();
            r * r
        })
        .sum()
}

pub fn cstat(data: &[DataPoint], mu: &[f64]) -> f64 {
    let half: f64 = data
        .par_iter()
        .zip(mu.par_iter())
        .map(|(d, &m)| {
            let m = m.max(MU_FLOOR);
            if d.y > 0.0 {
                m - d.y + d.y * (d.y / m).ln()
            } else {
                m
            }
        })
        .sum();
    2.0 * half
}
