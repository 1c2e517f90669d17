//! The ledger as a whitespace-separated text table (`<model>_list.txt`).
//!
//! ```text
//! # statistic: cstat | reference statistic: 812.113 | confidence level: 2.706 | updated: ...
//! # para_nb name best_fit_value error_min error_max hard_min_hit hard_max_hit
//! 1 norm 1.000000000 0.658000000 0.658000000 0 0
//! ```
//!
//! Names containing whitespace are written with `_` so rows stay splittable.

use std::io::Write;
use std::path::Path;

use crate::domain::{ErrorResult, HardCapFlags};
use crate::error::AppError;
use crate::io::checkpoint::Checkpoint;
use crate::io::write_atomically;

pub const LEDGER_COLUMNS: &str =
    "para_nb name best_fit_value error_min error_max hard_min_hit hard_max_hit";

pub fn write_ledger_table(path: &Path, checkpoint: &Checkpoint) -> Result<(), AppError> {
    write_atomically(path, |w| {
        writeln!(
            w,
            "# statistic: {} | reference statistic: {} | confidence level: {} | updated: {}",
            checkpoint.fingerprint.statistic,
            checkpoint.reference_statistic,
            checkpoint.fingerprint.level,
            checkpoint.updated.to_rfc3339(),
        )?;
        writeln!(w, "# {LEDGER_COLUMNS}")?;
        for r in &checkpoint.ledger {
            writeln!(
                w,
                "{} {} {:.9} {:.9} {:.9} {} {}",
                r.id,
                table_name(&r.name),
                r.best_fit,
                r.error_minus,
                r.error_plus,
                u8::from(r.hard_caps.lower),
                u8::from(r.hard_caps.upper),
            )?;
        }
        Ok(())
    })
    .map_err(|e| AppError::new(2, format!("Failed to write ledger table '{}': {e}", path.display())))
}

pub fn read_ledger_table(path: &Path) -> Result<Vec<ErrorResult>, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read ledger table '{}': {e}", path.display())))?;

    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = parse_row(line).ok_or_else(|| {
            AppError::new(
                2,
                format!("Invalid ledger row at {}:{}: '{line}'", path.display(), lineno + 1),
            )
        })?;
        out.push(row);
    }
    Ok(out)
}

fn parse_row(line: &str) -> Option<ErrorResult> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [id, name, best, minus, plus, lo, hi] = fields.as_slice() else {
        return None;
    };
    Some(ErrorResult {
        id: id.parse().ok()?,
        name: name.to_string(),
        best_fit: best.parse().ok()?,
        error_minus: minus.parse().ok()?,
        error_plus: plus.parse().ok()?,
        hard_caps: HardCapFlags {
            lower: parse_flag(lo)?,
            upper: parse_flag(hi)?,
        },
    })
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "0" | "False" | "false" => Some(false),
        "1" | "True" | "true" => Some(true),
        _ => None,
    }
}

fn table_name(name: &str) -> String {
    if name.is_empty() {
        return "-".to_string();
    }
    name.split_whitespace().collect::<Vec<_>>().join("_")
}
