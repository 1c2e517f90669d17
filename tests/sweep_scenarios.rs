//! End-to-end sweeps over synthetic oracles with an in-memory checkpoint store.

mod common;

use approx::assert_abs_diff_eq;

use common::{ParabolaOracle, ParabolaParam, RecordingStore, exact_error};
use steppar_errors::domain::{InterpMethod, Selection, StatMethod, SweepConfig};
use steppar_errors::io::{CheckpointStore, MemoryCheckpointStore};
use steppar_errors::steppar::{SweepController, SweepError, SweepReport, SweepRequest};

const LEVEL: f64 = 2.706;

fn config(interp: InterpMethod) -> SweepConfig {
    SweepConfig::new(LEVEL, StatMethod::Chi, interp)
}

fn two_parabolas() -> Vec<ParabolaParam> {
    vec![
        ParabolaParam::new("norm", 1.0, 0.4),
        ParabolaParam::new("slope", 2.0, 0.5),
    ]
}

fn sweep<S: CheckpointStore>(
    oracle: &mut ParabolaOracle,
    store: &mut S,
    interp: InterpMethod,
    request: &SweepRequest,
) -> Result<SweepReport, SweepError> {
    SweepController::new(oracle, store, config(interp)).run(request)
}

#[test]
fn spline_recovers_parabola_bounds_exactly() {
    let mut oracle = ParabolaOracle::new(two_parabolas());
    let mut store = MemoryCheckpointStore::new();

    let report = sweep(&mut oracle, &mut store, InterpMethod::Spline, &SweepRequest::all()).unwrap();

    assert_eq!(report.ledger.len(), 2);
    assert_eq!(report.restarts, 0);
    assert_abs_diff_eq!(report.reference_statistic, 100.0, epsilon = 1e-12);

    let norm = &report.ledger[0];
    assert_eq!((norm.id, norm.name.as_str()), (1, "norm"));
    assert_abs_diff_eq!(norm.best_fit, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(norm.error_minus, exact_error(0.4, LEVEL), epsilon = 1e-9);
    assert_abs_diff_eq!(norm.error_plus, exact_error(0.4, LEVEL), epsilon = 1e-9);

    let slope = &report.ledger[1];
    assert_abs_diff_eq!(slope.error_minus, exact_error(0.5, LEVEL), epsilon = 1e-9);
    assert_abs_diff_eq!(slope.error_plus, exact_error(0.5, LEVEL), epsilon = 1e-9);
    assert!(!slope.hard_caps.lower && !slope.hard_caps.upper);
}

#[test]
fn linear_bounds_are_close_to_the_parabola() {
    let mut oracle = ParabolaOracle::new(two_parabolas());
    let mut store = MemoryCheckpointStore::new();

    let report = sweep(&mut oracle, &mut store, InterpMethod::Linear, &SweepRequest::all()).unwrap();

    for (r, scale) in report.ledger.iter().zip([0.4, 0.5]) {
        assert_abs_diff_eq!(r.error_minus, exact_error(scale, LEVEL), epsilon = 0.01 * scale);
        assert_abs_diff_eq!(r.error_plus, exact_error(scale, LEVEL), epsilon = 0.01 * scale);
        // Chords lie above a convex curve: linear bounds come out a bit tight.
        assert!(r.error_plus <= exact_error(scale, LEVEL));
    }

    // Profiles carry the anchor and are sorted.
    let profile = &report.profiles[0];
    assert!(profile.samples.iter().any(|s| s.value == 1.0 && s.delta_stat == 0.0));
    assert!(profile.samples.windows(2).all(|w| w[0].value < w[1].value));
}

#[test]
fn hard_lower_limit_caps_the_lower_bound() {
    let mut oracle = ParabolaOracle::new(vec![ParabolaParam::new("norm", 1.0, 0.4).hard_min(0.5)]);
    let mut store = MemoryCheckpointStore::new();

    let report = sweep(&mut oracle, &mut store, InterpMethod::Spline, &SweepRequest::all()).unwrap();

    let r = &report.ledger[0];
    assert!(r.hard_caps.lower);
    assert!(!r.hard_caps.upper);
    assert_abs_diff_eq!(r.error_minus, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(r.lower_bound(), 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(r.error_plus, exact_error(0.4, LEVEL), epsilon = 1e-9);
}

#[test]
fn pegged_at_zero_limit_still_produces_a_result() {
    // Best fit sits on a zero-valued lower limit and the oracle reports no uncertainty.
    let params = vec![
        ParabolaParam::new("norm", 1.0, 0.4),
        ParabolaParam::new("bkg", 0.0, 0.5).hard_min(0.0).reported(-1.0),
    ];
    let mut oracle = ParabolaOracle::new(params);
    let mut store = MemoryCheckpointStore::new();

    let report = sweep(&mut oracle, &mut store, InterpMethod::Linear, &SweepRequest::all()).unwrap();

    assert_eq!(report.ledger.len(), 2);
    let bkg = &report.ledger[1];
    assert!(bkg.hard_caps.lower);
    assert!(!bkg.hard_caps.upper);
    assert_abs_diff_eq!(bkg.error_minus, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(bkg.error_plus, exact_error(0.5, LEVEL), epsilon = 0.01);

    let norm = &report.ledger[0];
    assert_abs_diff_eq!(norm.error_plus, exact_error(0.4, LEVEL), epsilon = 0.01 * 0.4);
}

#[test]
fn better_fit_restarts_the_sweep() {
    let mut oracle = ParabolaOracle::new(two_parabolas()).with_drop_at(2, 10.0);
    let mut store = RecordingStore::new();

    let report = sweep(&mut oracle, &mut store, InterpMethod::Spline, &SweepRequest::all()).unwrap();

    assert!(report.restarts >= 1);
    assert!(store.clears() >= 1);
    assert_abs_diff_eq!(report.reference_statistic, 90.0, epsilon = 1e-9);
    assert_eq!(report.ledger.len(), 2);
    assert_eq!(report.ledger.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

    let norm = &report.ledger[0];
    assert_abs_diff_eq!(norm.best_fit, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(norm.error_plus, exact_error(0.4, LEVEL), epsilon = 1e-6);
    assert_abs_diff_eq!(
        report.ledger[1].error_minus,
        exact_error(0.5, LEVEL),
        epsilon = 1e-6
    );

    let stored = store.checkpoint().unwrap();
    assert_eq!(stored.ledger, report.ledger);
    assert_abs_diff_eq!(stored.reference_statistic, 90.0, epsilon = 1e-9);
}

#[test]
fn restart_inside_a_later_parameter_discards_finished_results() {
    // 1 initial fit + 8 probes for the first parameter; the drop hits the third probe of the second.
    let mut oracle = ParabolaOracle::new(two_parabolas()).with_drop_at(12, 10.0);
    let mut store = RecordingStore::new();

    let report = sweep(&mut oracle, &mut store, InterpMethod::Spline, &SweepRequest::all()).unwrap();

    assert!(report.restarts >= 1);
    assert!(store.cleared_ledgers.iter().any(|&held| held >= 1));
    assert_abs_diff_eq!(report.reference_statistic, 90.0, epsilon = 1e-9);
    assert_eq!(report.ledger.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

    for (r, (center, scale)) in report.ledger.iter().zip([(1.0, 0.4), (2.0, 0.5)]) {
        assert_abs_diff_eq!(r.best_fit, center, epsilon = 1e-9);
        assert_abs_diff_eq!(r.error_minus, exact_error(scale, LEVEL), epsilon = 1e-6);
        assert_abs_diff_eq!(r.error_plus, exact_error(scale, LEVEL), epsilon = 1e-6);
    }

    let stored = store.checkpoint().unwrap();
    assert_eq!(stored.ledger, report.ledger);
    assert!(stored.is_complete());
}

#[test]
fn second_run_is_a_no_op() {
    let mut store = RecordingStore::new();

    let mut first = ParabolaOracle::new(two_parabolas());
    let report1 = sweep(&mut first, &mut store, InterpMethod::Linear, &SweepRequest::all()).unwrap();
    assert!(!report1.already_computed);
    assert!(first.calls > 0);
    let appends = store.appends;

    let mut second = ParabolaOracle::new(two_parabolas());
    let report2 = sweep(&mut second, &mut store, InterpMethod::Linear, &SweepRequest::all()).unwrap();

    assert!(report2.already_computed);
    assert_eq!(second.calls, 0);
    assert_eq!(report2.fit_count, 0);
    assert_eq!(report2.ledger, report1.ledger);
    assert_eq!(store.appends, appends);
}

#[test]
fn interrupted_run_resumes_where_it_stopped() {
    let mut reference_store = MemoryCheckpointStore::new();
    let mut uninterrupted = ParabolaOracle::new(two_parabolas());
    let full = sweep(
        &mut uninterrupted,
        &mut reference_store,
        InterpMethod::Linear,
        &SweepRequest::all(),
    )
    .unwrap();

    // 1 initial fit + 8 probes for the first parameter; fail inside the second.
    let mut store = MemoryCheckpointStore::new();
    let mut failing = ParabolaOracle::new(two_parabolas()).with_failure_at(11);
    let err = sweep(&mut failing, &mut store, InterpMethod::Linear, &SweepRequest::all()).unwrap_err();
    assert!(matches!(err, SweepError::Oracle(_)));

    let partial = store.load().unwrap().unwrap();
    assert_eq!(partial.cursor, 1);
    assert_eq!(partial.ledger.len(), 1);
    assert!(!partial.is_complete());

    let mut resumed_oracle = ParabolaOracle::new(two_parabolas());
    let resumed = sweep(
        &mut resumed_oracle,
        &mut store,
        InterpMethod::Linear,
        &SweepRequest::all(),
    )
    .unwrap();

    assert_eq!(resumed.resumed_from, 1);
    assert_eq!(resumed.ledger, full.ledger);
    assert!(resumed_oracle.calls < uninterrupted.calls);
}

#[test]
fn changed_settings_discard_the_checkpoint() {
    let mut store = MemoryCheckpointStore::new();
    let mut first = ParabolaOracle::new(two_parabolas());
    sweep(&mut first, &mut store, InterpMethod::Linear, &SweepRequest::all()).unwrap();

    let mut second = ParabolaOracle::new(two_parabolas());
    let report = sweep(&mut second, &mut store, InterpMethod::Spline, &SweepRequest::all()).unwrap();

    assert!(!report.already_computed);
    assert!(second.calls > 0);
    assert_eq!(store.checkpoint().unwrap().fingerprint.interp, InterpMethod::Spline);
}

#[test]
fn too_small_uncertainty_triggers_refinement() {
    // A reported uncertainty of 2σ overshoots the level on the very first probe.
    let params = vec![ParabolaParam::new("norm", 1.0, 0.4).reported(2.0)];
    let mut oracle = ParabolaOracle::new(params);
    let mut store = MemoryCheckpointStore::new();

    let report = sweep(&mut oracle, &mut store, InterpMethod::Linear, &SweepRequest::all()).unwrap();

    let r = &report.ledger[0];
    assert_abs_diff_eq!(r.error_minus, exact_error(0.4, LEVEL), epsilon = 2e-3);
    assert_abs_diff_eq!(r.error_plus, exact_error(0.4, LEVEL), epsilon = 2e-3);
    // Refined steps are σ/8, so many more probes than the plain 4 per side.
    assert!(oracle.calls > 20);
}

#[test]
fn selection_and_blacklist_limit_the_sweep() {
    let params = vec![
        ParabolaParam::new("norm", 1.0, 0.4),
        ParabolaParam::new("slope", 2.0, 0.5),
        ParabolaParam::new("cutoff", 3.0, 0.6).frozen(),
    ];
    let mut oracle = ParabolaOracle::new(params);
    let mut store = MemoryCheckpointStore::new();

    let request = SweepRequest {
        selection: Selection::List(vec![2, 1, 3]),
        blacklist: vec!["norm".to_string()],
        cores: 0,
    };
    let report = sweep(&mut oracle, &mut store, InterpMethod::Linear, &request).unwrap();

    assert_eq!(report.ledger.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2]);
    assert!(oracle.params[0].frozen);
}

#[test]
fn out_of_range_selection_fails_before_fitting() {
    let mut oracle = ParabolaOracle::new(two_parabolas());
    let mut store = MemoryCheckpointStore::new();
    let request = SweepRequest {
        selection: Selection::List(vec![1, 9]),
        blacklist: Vec::new(),
        cores: 0,
    };

    let err = sweep(&mut oracle, &mut store, InterpMethod::Linear, &request).unwrap_err();
    assert!(matches!(err, SweepError::Config(_)));
    assert_eq!(oracle.calls, 0);
}
