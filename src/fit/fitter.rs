//! Built-in Fit Oracle for component-sum models.
//!
//! Given:
//! - the component basis values `E_ij` (links folded into their target's column)
//! - observed values `y_i`
//! - the current frozen/free split
//!
//! we solve for the free amplitudes:
//! - `chi`: one weighted least squares solve with `w_i = 1/σ_i²`
//! - `cstat`: iteratively reweighted least squares with `w_i = 1/μ_i`, whose fixed
//!   point is the Poisson maximum-likelihood solution for a linear model
//!
//! Hard limits are enforced by an active set: an amplitude that lands outside its
//! limits is clamped, held there, and the remaining ones are re-solved.

use std::path::PathBuf;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::domain::{ModelFile, ParameterId, ParameterState, StatMethod};
use crate::fit::statistic::{self, MU_FLOOR};
use crate::io::write_model_file;
use crate::math::{covariance, solve_least_squares};
use crate::models::basis;
use crate::oracle::{FitOracle, OracleError};

/// IRLS iteration cap for `cstat`.
const MAX_IRLS_ITERS: usize = 100;
const IRLS_TOL: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct FitSnapshot {
    values: Vec<f64>,
    frozen: Vec<bool>,
    uncertainties: Vec<f64>,
}

pub struct LinearModelFitter {
    model: ModelFile,
    /// `n × k` effective design: column `j` is `φ_j + Σ factor·φ_l` over parameters
    /// `l` linked to `j`; linked parameters have a zero column.
    design: DMatrix<f64>,
    statistic: StatMethod,
    uncertainties: Vec<f64>,
    pool: Option<rayon::ThreadPool>,
    best_fit_path: Option<PathBuf>,
}

impl LinearModelFitter {
    /// `model` must have passed `io::validate_model`.
    pub fn new(model: ModelFile) -> Self {
        let n = model.data.len();
        let k = model.components.len();
        let mut design = DMatrix::<f64>::zeros(n, k);

        for (i, d) in model.data.iter().enumerate() {
            for (j, c) in model.components.iter().enumerate() {
                let phi = basis(c.kind, d.x);
                match c.parameter.link {
                    Some(link) => design[(i, link.to - 1)] += link.factor * phi,
                    None => design[(i, j)] += phi,
                }
            }
        }

        Self {
            model,
            design,
            statistic: StatMethod::Cstat,
            uncertainties: vec![0.0; k],
            pool: None,
            best_fit_path: None,
        }
    }

    /// Where `save_best_fit` writes the model with best-fit values.
    pub fn with_best_fit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.best_fit_path = Some(path.into());
        self
    }

    /// The model with current parameter values (links applied).
    pub fn model(&self) -> &ModelFile {
        &self.model
    }

    fn is_linked(&self, j: usize) -> bool {
        self.model.components[j].parameter.link.is_some()
    }

    fn is_free(&self, j: usize) -> bool {
        let p = &self.model.components[j].parameter;
        !p.frozen && p.link.is_none()
    }

    fn index(&self, id: ParameterId) -> Result<usize, OracleError> {
        id.checked_sub(1)
            .filter(|&j| j < self.model.components.len())
            .ok_or(OracleError::UnknownParameter(id))
    }

    fn values(&self) -> Vec<f64> {
        self.model.components.iter().map(|c| c.parameter.value).collect()
    }

    fn mu(&self, values: &[f64]) -> Vec<f64> {
        let v = DVector::from_iterator(
            values.len(),
            values
                .iter()
                .enumerate()
                .map(|(j, &x)| if self.is_linked(j) { 0.0 } else { x }),
        );
        (&self.design * v).iter().copied().collect()
    }

    fn evaluate(&self, mu: &[f64]) -> f64 {
        let run = || statistic::evaluate(self.statistic, &self.model.data, mu);
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn weights(&self, mu: &[f64]) -> Vec<f64> {
        match self.statistic {
            StatMethod::Chi => self
                .model
                .data
                .iter()
                .map(|d| 1.0 / (d.sigma() * d.sigma()))
                .collect(),
            StatMethod::Cstat => mu
                .iter()
                .zip(&self.model.data)
                .map(|(&m, d)| {
                    let m = if m > 0.0 { m } else { d.y.max(1.0) };
                    1.0 / m.max(MU_FLOOR)
                })
                .collect(),
        }
    }

    /// One bounded weighted solve. Returns the free columns that ended up
    /// interior (not clamped), which are the ones with a covariance.
    fn solve_bounded(&self, values: &mut [f64], w: &[f64]) -> Result<Vec<usize>, OracleError> {
        let k = values.len();
        let n = w.len();
        let mut clamped = vec![false; k];

        loop {
            let cols: Vec<usize> = (0..k).filter(|&j| self.is_free(j) && !clamped[j]).collect();
            if cols.is_empty() {
                return Ok(cols);
            }

            let mut xw = DMatrix::<f64>::zeros(n, cols.len());
            let mut yw = DVector::<f64>::zeros(n);
            for i in 0..n {
                let sw = w[i].sqrt();
                let offset: f64 = (0..k)
                    .filter(|j| !cols.contains(j) && !self.is_linked(*j))
                    .map(|j| values[j] * self.design[(i, j)])
                    .sum();
                for (c, &j) in cols.iter().enumerate() {
                    xw[(i, c)] = self.design[(i, j)] * sw;
                }
                yw[i] = (self.model.data[i].y - offset) * sw;
            }

            let p = solve_least_squares(&xw, &yw)
                .ok_or_else(|| OracleError::FitFailed("weighted least squares is singular".to_string()))?;

            let mut violated = false;
            for (c, &j) in cols.iter().enumerate() {
                let spec = &self.model.components[j].parameter;
                values[j] = p[c];
                if p[c] < spec.hard_min || p[c] > spec.hard_max {
                    values[j] = p[c].clamp(spec.hard_min, spec.hard_max);
                    clamped[j] = true;
                    violated = true;
                }
            }
            if !violated {
                return Ok(cols);
            }
        }
    }

    fn update_uncertainties(&mut self, interior: &[usize], w: &[f64]) {
        let k = self.uncertainties.len();
        let n = w.len();
        for j in 0..k {
            self.uncertainties[j] = if self.is_free(j) { -1.0 } else { 0.0 };
        }
        if interior.is_empty() {
            return;
        }

        let mut xw = DMatrix::<f64>::zeros(n, interior.len());
        for i in 0..n {
            let sw = w[i].sqrt();
            for (c, &j) in interior.iter().enumerate() {
                xw[(i, c)] = self.design[(i, j)] * sw;
            }
        }
        match covariance(&xw) {
            Some(cov) => {
                for (c, &j) in interior.iter().enumerate() {
                    let var = cov[(c, c)];
                    self.uncertainties[j] = if var > 0.0 { var.sqrt() } else { -1.0 };
                }
            }
            None => debug!("covariance unavailable, uncertainties left unset"),
        }
    }

    fn store_values(&mut self, values: &[f64]) {
        for (c, &v) in self.model.components.iter_mut().zip(values) {
            c.parameter.value = v;
        }
        let resolved = crate::models::resolved_values(&self.model.components);
        for (c, v) in self.model.components.iter_mut().zip(resolved) {
            c.parameter.value = v;
        }
    }
}

impl FitOracle for LinearModelFitter {
    type Snapshot = FitSnapshot;

    fn parameters(&self) -> Vec<ParameterState> {
        self.model
            .components
            .iter()
            .zip(&self.uncertainties)
            .enumerate()
            .map(|(j, (c, &uncertainty))| ParameterState {
                id: j + 1,
                name: c.parameter.name.clone(),
                value: c.parameter.value,
                frozen: c.parameter.frozen,
                linked: c.parameter.link.is_some(),
                hard_min: c.parameter.hard_min,
                hard_max: c.parameter.hard_max,
                uncertainty,
            })
            .collect()
    }

    fn set_frozen(&mut self, id: ParameterId, frozen: bool) -> Result<(), OracleError> {
        let j = self.index(id)?;
        self.model.components[j].parameter.frozen = frozen;
        Ok(())
    }

    fn set_frozen_value(&mut self, id: ParameterId, value: f64) -> Result<(), OracleError> {
        let j = self.index(id)?;
        let p = &mut self.model.components[j].parameter;
        p.value = value;
        p.frozen = true;
        Ok(())
    }

    fn optimize(&mut self) -> Result<f64, OracleError> {
        let mut values = self.values();
        let mut mu = self.mu(&values);
        let mut stat = self.evaluate(&mu);

        let iterations = match self.statistic {
            StatMethod::Chi => 1,
            StatMethod::Cstat => MAX_IRLS_ITERS,
        };

        let mut w = self.weights(&mu);
        let mut interior = Vec::new();
        for iter in 0..iterations {
            interior = self.solve_bounded(&mut values, &w)?;
            mu = self.mu(&values);
            let next = self.evaluate(&mu);
            let converged = (stat - next).abs() <= IRLS_TOL * next.abs().max(1.0);
            stat = next;
            if converged && iter > 0 {
                break;
            }
            w = self.weights(&mu);
        }

        if !stat.is_finite() {
            return Err(OracleError::FitFailed(format!("statistic is {stat}")));
        }
        if self.statistic == StatMethod::Cstat && iterations > 1 {
            // Weights at the solution, for the Fisher information.
            w = self.weights(&mu);
        }

        self.store_values(&values);
        self.update_uncertainties(&interior, &w);
        Ok(stat)
    }

    fn snapshot(&self) -> Self::Snapshot {
        FitSnapshot {
            values: self.values(),
            frozen: self.model.components.iter().map(|c| c.parameter.frozen).collect(),
            uncertainties: self.uncertainties.clone(),
        }
    }

    fn restore(&mut self, snapshot: &Self::Snapshot) {
        for ((c, &v), &f) in self
            .model
            .components
            .iter_mut()
            .zip(&snapshot.values)
            .zip(&snapshot.frozen)
        {
            c.parameter.value = v;
            c.parameter.frozen = f;
        }
        self.uncertainties.clone_from(&snapshot.uncertainties);
    }

    fn set_statistic(&mut self, method: StatMethod) -> Result<(), OracleError> {
        if method == StatMethod::Cstat && self.model.data.iter().any(|d| d.y < 0.0) {
            return Err(OracleError::UnsupportedStatistic(method));
        }
        self.statistic = method;
        Ok(())
    }

    fn set_parallelism(&mut self, cores: usize) {
        if cores == 0 {
            self.pool = None;
            return;
        }
        match rayon::ThreadPoolBuilder::new().num_threads(cores).build() {
            Ok(pool) => self.pool = Some(pool),
            Err(e) => warn!("Could not build a {cores}-thread pool, using the global one: {e}"),
        }
    }

    fn save_best_fit(&mut self) -> Result<(), OracleError> {
        match &self.best_fit_path {
            Some(path) => write_model_file(path, &self.model).map_err(|e| OracleError::Save(e.to_string())),
            None => Ok(()),
        }
    }
}
