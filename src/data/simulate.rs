//! Synthetic data drawn from a model description.
//!
//! The model is evaluated at its current parameter values (links applied) on
//! the existing `x` grid, then each bin gets fresh noise:
//! - `cstat`: Poisson counts with mean `μ(x)`
//! - `chi`: Gaussian noise with the bin's `σ`
//!
//! The RNG is a seeded `StdRng`, so the same seed gives the same data set.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Poisson};

use crate::domain::{DataPoint, ModelFile, StatMethod};
use crate::error::AppError;
use crate::models::{predict, resolved_values};

/// Suffix of the simulated model file (`<name>_error.json`).
pub const SIMULATED_SUFFIX: &str = "_error.json";

/// Return a copy of `model` whose data were replaced by a simulated draw.
pub fn simulate(model: &ModelFile, statistic: StatMethod, seed: u64) -> Result<ModelFile, AppError> {
    if model.data.is_empty() {
        return Err(AppError::new(2, "Model has no data bins to simulate."));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let values = resolved_values(&model.components);

    let mut data = Vec::with_capacity(model.data.len());
    for point in &model.data {
        let mu = predict(&model.components, &values, point.x);
        if !mu.is_finite() {
            return Err(AppError::new(
                4,
                format!("Model prediction is not finite at x={}", point.x),
            ));
        }

        let simulated = match statistic {
            StatMethod::Cstat => {
                let counts = if mu > 0.0 {
                    Poisson::new(mu)
                        .map_err(|e| AppError::new(4, format!("Poisson distribution error: {e}")))?
                        .sample(&mut rng)
                } else {
                    0.0
                };
                DataPoint {
                    x: point.x,
                    y: counts,
                    error: None,
                }
            }
            StatMethod::Chi => {
                let sigma = point.error.unwrap_or_else(|| mu.max(1.0).sqrt());
                let noise = Normal::new(0.0, sigma)
                    .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
                DataPoint {
                    x: point.x,
                    y: mu + noise.sample(&mut rng),
                    error: Some(sigma),
                }
            }
        };
        data.push(simulated);
    }

    Ok(ModelFile {
        name: format!("{}_error", model.name),
        components: model.components.clone(),
        data,
    })
}
