//! Formatted terminal output for sweep results.
//!
//! We keep formatting code in one place so:
//! - the sweep code stays free of presentation concerns
//! - output changes are localized (and covered by golden tests)

use chrono::TimeDelta;

use crate::domain::{ErrorResult, SweepConfig};
use crate::steppar::SweepReport;

/// Format the run summary (configuration + sweep bookkeeping).
pub fn format_sweep_summary(model_name: &str, report: &SweepReport, config: &SweepConfig) -> String {
    let mut out = String::new();

    out.push_str("=== steppar - profile errors ===\n");
    out.push_str(&format!("Model: {model_name}\n"));
    out.push_str(&format!(
        "Statistic: {} | reference={:.6} | level {}={}\n",
        config.statistic,
        report.reference_statistic,
        config.statistic.delta_label(),
        config.level
    ));
    out.push_str(&format!("Interpolation: {}\n", config.interp));

    if report.already_computed {
        out.push_str("Status: already computed (no fits performed)\n");
    } else {
        out.push_str(&format!(
            "Fits: {} | restarts: {}",
            report.fit_count, report.restarts
        ));
        if report.resumed_from > 0 {
            out.push_str(&format!(" | resumed after {} parameter(s)", report.resumed_from));
        }
        out.push('\n');
    }
    out.push('\n');

    out
}

/// Format the ledger as an aligned table.
pub fn format_ledger(results: &[ErrorResult]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:<16} {:>14} {:>12} {:>12} {:>14} {:>14} {:<4}",
            "id", "name", "best_fit", "-error", "+error", "lower", "upper", "caps"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:->4} {:-<16} {:->14} {:->12} {:->12} {:->14} {:->14} {:-<4}",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in results {
        out.push_str(
            format!(
                "{:>4} {:<16} {:>14.6} {:>12.6} {:>12.6} {:>14.6} {:>14.6} {:<4}",
                r.id,
                truncate(&r.name, 16),
                r.best_fit,
                r.error_minus,
                r.error_plus,
                r.lower_bound(),
                r.upper_bound(),
                caps_label(r),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// `1h 02m 03.456s`, `2m 05.000s`, `0.250s`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let ms = elapsed.num_milliseconds().max(0);
    let (h, rem) = (ms / 3_600_000, ms % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    let (s, ms) = (rem / 1000, rem % 1000);
    match (h, m) {
        (0, 0) => format!("{s}.{ms:03}s"),
        (0, _) => format!("{m}m {s:02}.{ms:03}s"),
        _ => format!("{h}h {m:02}m {s:02}.{ms:03}s"),
    }
}

fn caps_label(r: &ErrorResult) -> &'static str {
    match (r.hard_caps.lower, r.hard_caps.upper) {
        (false, false) => "",
        (true, false) => "min",
        (false, true) => "max",
        (true, true) => "both",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
