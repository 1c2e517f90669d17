//! Read/write model description files (JSON, schema in `domain::ModelFile`).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::domain::{ComponentKind, ModelFile};
use crate::error::AppError;
use crate::io::write_atomically;

pub fn read_model_file(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model file '{}': {e}", path.display())))?;
    let model: ModelFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid model file '{}': {e}", path.display())))?;
    validate_model(&model)
        .map_err(|e| AppError::new(2, format!("Invalid model file '{}': {e}", path.display())))?;
    Ok(model)
}

pub fn write_model_file(path: &Path, model: &ModelFile) -> Result<(), AppError> {
    write_atomically(path, |w| {
        serde_json::to_writer_pretty(&mut *w, model)?;
        Ok(())
    })
    .map_err(|e| AppError::new(2, format!("Failed to write model file '{}': {e}", path.display())))
}

/// `dir/<name><suffix>`, the naming used for every file derived from a model.
pub fn sibling_path(model_path: &Path, model: &ModelFile, suffix: &str) -> PathBuf {
    let dir = model_path.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{}{suffix}", model.name))
}

pub fn validate_model(model: &ModelFile) -> Result<(), String> {
    if model.name.trim().is_empty() || model.name.contains(['/', '\\']) {
        return Err(format!("model name '{}' cannot be used in file names", model.name));
    }
    if model.components.is_empty() {
        return Err("model has no components".to_string());
    }
    if model.data.is_empty() {
        return Err("model has no data".to_string());
    }

    for (i, c) in model.components.iter().enumerate() {
        let id = i + 1;
        let p = &c.parameter;
        if !(p.value.is_finite() && p.hard_min.is_finite() && p.hard_max.is_finite()) {
            return Err(format!("parameter {id} ({}) has non-finite value or limits", p.name));
        }
        if p.hard_min > p.hard_max || p.value < p.hard_min || p.value > p.hard_max {
            return Err(format!(
                "parameter {id} ({}) value {} outside hard limits [{}, {}]",
                p.name, p.value, p.hard_min, p.hard_max
            ));
        }
        if let Some(link) = p.link {
            let target = link
                .to
                .checked_sub(1)
                .and_then(|k| model.components.get(k))
                .ok_or_else(|| format!("parameter {id} is linked to missing parameter {}", link.to))?;
            if link.to == id || target.parameter.link.is_some() {
                return Err(format!("parameter {id} has a circular or chained link"));
            }
            if !link.factor.is_finite() {
                return Err(format!("parameter {id} has a non-finite link factor"));
            }
        }
        match c.kind {
            ComponentKind::Gaussian { width, .. } if !(width > 0.0) => {
                return Err(format!("component {id}: gaussian width must be > 0"));
            }
            ComponentKind::Exponential { scale } if scale == 0.0 || !scale.is_finite() => {
                return Err(format!("component {id}: exponential scale must be non-zero"));
            }
            ComponentKind::PowerLaw { .. } if model.data.iter().any(|d| d.x <= 0.0) => {
                return Err(format!("component {id}: power law needs x > 0 everywhere"));
            }
            _ => {}
        }
    }

    for (i, d) in model.data.iter().enumerate() {
        if !(d.x.is_finite() && d.y.is_finite()) {
            return Err(format!("data point {i} is not finite"));
        }
        if let Some(err) = d.error {
            if !(err.is_finite() && err > 0.0) {
                return Err(format!("data point {i} has a non-positive error"));
            }
        }
    }

    Ok(())
}
