//! `steppar errors` workflow on a model file: built-in fitter + JSON checkpoint.

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;

use steppar_errors::app::pipeline::{self, ErrorsRunConfig};
use steppar_errors::domain::{
    ComponentKind, ComponentSpec, DataPoint, InterpMethod, ModelFile, ParameterSpec, StatMethod,
    SweepConfig,
};
use steppar_errors::io::{read_checkpoint, read_ledger_table, read_model_file, write_model_file};
use steppar_errors::steppar::SweepRequest;

const LEVEL: f64 = 2.706;

/// Constant model, 16 bins alternating 9.5 / 10.5 with σ = 1:
/// best fit 10, 1σ = 0.25, Δχ² exactly parabolic.
fn constant_model() -> ModelFile {
    ModelFile {
        name: "flat".to_string(),
        components: vec![ComponentSpec {
            kind: ComponentKind::Constant,
            parameter: ParameterSpec {
                name: "norm".to_string(),
                value: 1.0,
                frozen: false,
                link: None,
                hard_min: 0.0,
                hard_max: 1000.0,
            },
        }],
        data: (0..16)
            .map(|i| DataPoint {
                x: f64::from(i),
                y: if i % 2 == 0 { 9.5 } else { 10.5 },
                error: Some(1.0),
            })
            .collect(),
    }
}

fn write_model(dir: &Path) -> PathBuf {
    let path = dir.join("flat.json");
    write_model_file(&path, &constant_model()).unwrap();
    path
}

fn run_config(model: PathBuf, plot: bool) -> ErrorsRunConfig {
    ErrorsRunConfig {
        model,
        sweep: SweepConfig::new(LEVEL, StatMethod::Chi, InterpMethod::Spline),
        request: SweepRequest::all(),
        plot,
        fresh: false,
    }
}

#[test]
fn errors_run_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());

    let run = pipeline::run_errors(&run_config(model.clone(), true)).unwrap();

    let r = &run.report.ledger[0];
    assert_abs_diff_eq!(r.best_fit, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(r.error_minus, 0.25 * LEVEL.sqrt(), epsilon = 1e-6);
    assert_abs_diff_eq!(r.error_plus, 0.25 * LEVEL.sqrt(), epsilon = 1e-6);
    assert_abs_diff_eq!(run.report.reference_statistic, 4.0, epsilon = 1e-9);

    assert_eq!(run.checkpoint_path, dir.path().join("flat_steppar.json"));
    let cp = read_checkpoint(&run.checkpoint_path).unwrap().unwrap();
    assert!(cp.is_complete());
    assert_eq!(cp.ledger, run.report.ledger);

    let table = read_ledger_table(&run.ledger_path).unwrap();
    assert_eq!(table.len(), 1);
    assert_abs_diff_eq!(table[0].error_plus, r.error_plus, epsilon = 1e-8);

    let best = read_model_file(&dir.path().join("flat_bestfit.json")).unwrap();
    assert_abs_diff_eq!(best.components[0].parameter.value, 10.0, epsilon = 1e-9);

    let plot_dir = run.plot_dir.unwrap();
    assert!(plot_dir.join("1.svg").exists());
}

#[test]
fn rerun_reuses_the_checkpoint_and_fresh_discards_it() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());

    let first = pipeline::run_errors(&run_config(model.clone(), false)).unwrap();
    assert!(!first.report.already_computed);
    assert!(first.plot_dir.is_none());

    let second = pipeline::run_errors(&run_config(model.clone(), false)).unwrap();
    assert!(second.report.already_computed);
    assert_eq!(second.report.fit_count, 0);
    assert_eq!(second.report.ledger, first.report.ledger);

    let mut fresh = run_config(model, false);
    fresh.fresh = true;
    let third = pipeline::run_errors(&fresh).unwrap();
    assert!(!third.report.already_computed);
    assert!(third.report.fit_count > 0);
}

#[test]
fn report_reads_back_the_stored_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());

    assert_eq!(pipeline::load_report(&model).unwrap_err().exit_code(), 2);

    let run = pipeline::run_errors(&run_config(model.clone(), false)).unwrap();
    let stored = pipeline::load_report(&model).unwrap();

    assert_eq!(stored.model_name, "flat");
    assert_eq!(stored.ledger, run.report.ledger);
    assert_eq!(stored.profiles.len(), 1);
    assert_eq!(
        stored.settings,
        Some((LEVEL, StatMethod::Chi, InterpMethod::Spline))
    );
}

#[test]
fn simulate_writes_a_sibling_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());

    let path = pipeline::run_simulate(&model, StatMethod::Cstat, 3, None).unwrap();
    assert_eq!(path, dir.path().join("flat_error.json"));

    let simulated = read_model_file(&path).unwrap();
    assert_eq!(simulated.data.len(), 16);
    assert!(simulated.data.iter().all(|d| d.y.fract() == 0.0));
}

#[test]
fn missing_model_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = pipeline::run_errors(&run_config(dir.path().join("nope.json"), false)).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
