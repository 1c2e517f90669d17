//! Model evaluation for the component sum.
//!
//! The fitter relies on two primitive operations:
//! - evaluate each component's basis at `x` (one design row)
//! - predict `μ(x)` given the parameter values (for statistics and simulation)

use std::f64::consts::PI;

use crate::domain::{ComponentKind, ComponentSpec};

/// Basis value `φ(x)` of one component (amplitude 1).
pub fn basis(kind: ComponentKind, x: f64) -> f64 {
    match kind {
        ComponentKind::Constant => 1.0,
        ComponentKind::Linear => x,
        ComponentKind::PowerLaw { index } => x.powf(-index),
        ComponentKind::Gaussian { center, width } => {
            let z = (x - center) / width;
            (-0.5 * z * z).exp() / (width * (2.0 * PI).sqrt())
        }
        ComponentKind::Exponential { scale } => (-x / scale).exp(),
    }
}

/// Fill a design row: `out[k] = φ_k(x)`.
///
/// # Panics
/// Panics if `out` is shorter than `components`.
pub fn fill_design_row(components: &[ComponentSpec], x: f64, out: &mut [f64]) {
    for (slot, c) in out.iter_mut().zip(components) {
        *slot = basis(c.kind, x);
    }
}

/// `μ(x) = Σ_k values[k] φ_k(x)`.
pub fn predict(components: &[ComponentSpec], values: &[f64], x: f64) -> f64 {
    components
        .iter()
        .zip(values)
        .map(|(c, v)| v * basis(c.kind, x))
        .sum()
}

/// Parameter values with links applied (`value = factor * value(to)`).
pub fn resolved_values(components: &[ComponentSpec]) -> Vec<f64> {
    let raw: Vec<f64> = components.iter().map(|c| c.parameter.value).collect();
    components
        .iter()
        .zip(&raw)
        .map(|(c, &v)| match c.parameter.link {
            Some(link) => raw.get(link.to.wrapping_sub(1)).map_or(v, |to| link.factor * to),
            None => v,
        })
        .collect()
}
