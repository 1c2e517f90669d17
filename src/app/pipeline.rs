//! Shared workflows behind the CLI subcommands.
//!
//! Each function does the file plumbing around one core operation:
//!
//! - `run_errors`: model file -> built-in fitter -> checkpointed sweep -> ledger
//! - `run_simulate`: model file -> simulated data -> `<name>_error.json`
//! - `load_report`: checkpoint (or ledger table) -> stored results
//!
//! Presentation (printing) stays in `app`.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::data::{SIMULATED_SUFFIX, simulate};
use crate::domain::{
    ErrorResult, InterpMethod, ParameterProfile, StatMethod, SweepConfig,
};
use crate::error::AppError;
use crate::fit::LinearModelFitter;
use crate::io::{
    CheckpointStore, JsonCheckpointStore, read_checkpoint, read_ledger_table, read_model_file,
    sibling_path, write_model_file,
};
use crate::plot::SvgProfileSink;
use crate::steppar::{SweepController, SweepReport, SweepRequest};

pub const CHECKPOINT_SUFFIX: &str = "_steppar.json";
pub const LEDGER_SUFFIX: &str = "_list.txt";
pub const BEST_FIT_SUFFIX: &str = "_bestfit.json";
pub const PLOT_DIR_SUFFIX: &str = "_plots";

/// Everything `steppar errors` needs, already parsed and validated.
#[derive(Debug, Clone)]
pub struct ErrorsRunConfig {
    pub model: PathBuf,
    pub sweep: SweepConfig,
    pub request: SweepRequest,
    pub plot: bool,
    pub fresh: bool,
}

#[derive(Debug, Clone)]
pub struct ErrorsRun {
    pub model_name: String,
    pub report: SweepReport,
    pub checkpoint_path: PathBuf,
    pub ledger_path: PathBuf,
    pub plot_dir: Option<PathBuf>,
}

/// Run the checkpointed sweep on a model file with the built-in fitter.
pub fn run_errors(config: &ErrorsRunConfig) -> Result<ErrorsRun, AppError> {
    let model = read_model_file(&config.model)?;
    let model_name = model.name.clone();

    let checkpoint_path = sibling_path(&config.model, &model, CHECKPOINT_SUFFIX);
    let ledger_path = sibling_path(&config.model, &model, LEDGER_SUFFIX);
    let best_fit_path = sibling_path(&config.model, &model, BEST_FIT_SUFFIX);
    let plot_dir = config
        .plot
        .then(|| sibling_path(&config.model, &model, PLOT_DIR_SUFFIX));

    let mut fitter = LinearModelFitter::new(model).with_best_fit_path(best_fit_path);
    let mut store = JsonCheckpointStore::new(&checkpoint_path).with_ledger_table(&ledger_path);
    if config.fresh {
        info!(path = %checkpoint_path.display(), "Discarding checkpoint (--fresh)");
        store.clear()?;
    }

    let mut sink = plot_dir
        .as_ref()
        .map(|dir| SvgProfileSink::new(dir, config.sweep.plot_grid_points));

    let mut controller = SweepController::new(&mut fitter, &mut store, config.sweep.clone());
    if let Some(sink) = sink.as_mut() {
        controller = controller.with_sink(sink);
    }
    let report = controller.run(&config.request)?;

    Ok(ErrorsRun {
        model_name,
        report,
        checkpoint_path,
        ledger_path,
        plot_dir,
    })
}

/// Simulate a data set from the model and write it next to it (or to `output`).
pub fn run_simulate(
    model_path: &Path,
    statistic: StatMethod,
    seed: u64,
    output: Option<&Path>,
) -> Result<PathBuf, AppError> {
    let model = read_model_file(model_path)?;
    let simulated = simulate(&model, statistic, seed)?;

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => sibling_path(model_path, &model, SIMULATED_SUFFIX),
    };
    write_model_file(&path, &simulated)?;
    info!(path = %path.display(), seed, method = %statistic, "Simulated data written");
    Ok(path)
}

/// Results stored for a model by a previous `steppar errors` run.
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub model_name: String,
    pub ledger: Vec<ErrorResult>,
    /// Empty when only the ledger table was found.
    pub profiles: Vec<ParameterProfile>,
    /// `(level, statistic, interpolation)` when a checkpoint was found.
    pub settings: Option<(f64, StatMethod, InterpMethod)>,
}

pub fn load_report(model_path: &Path) -> Result<StoredReport, AppError> {
    let model = read_model_file(model_path)?;
    let checkpoint_path = sibling_path(model_path, &model, CHECKPOINT_SUFFIX);
    let ledger_path = sibling_path(model_path, &model, LEDGER_SUFFIX);

    if let Some(cp) = read_checkpoint(&checkpoint_path)? {
        if !cp.is_complete() {
            warn!(
                done = cp.cursor,
                total = cp.fingerprint.parameters.len(),
                "Checkpoint is partial; showing the parameters finished so far"
            );
        }
        return Ok(StoredReport {
            model_name: model.name,
            settings: Some((cp.fingerprint.level, cp.fingerprint.statistic, cp.fingerprint.interp)),
            ledger: cp.ledger,
            profiles: cp.profiles,
        });
    }

    if ledger_path.exists() {
        return Ok(StoredReport {
            model_name: model.name,
            ledger: read_ledger_table(&ledger_path)?,
            profiles: Vec::new(),
            settings: None,
        });
    }

    Err(AppError::new(
        2,
        format!(
            "No stored errors for model '{}' (looked for '{}' and '{}').",
            model.name,
            checkpoint_path.display(),
            ledger_path.display()
        ),
    ))
}
