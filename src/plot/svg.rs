//! SVG diagnostic figures, one per profiled parameter.
//!
//! The figure shows:
//! - the probed samples (markers)
//! - the interpolated Δstat curve
//! - the target level and the two bounds
//! - the `best^{+plus}_{-minus}` annotation
//!
//! Rendering is best-effort: the sweep logs a failure and moves on.

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::AppError;
use crate::steppar::{ProfileBundle, ProfileSink};

/// Writes `<dir>/<id>.svg` for every finished parameter.
#[derive(Debug, Clone)]
pub struct SvgProfileSink {
    dir: PathBuf,
    size: (u32, u32),
    grid_points: usize,
}

impl SvgProfileSink {
    pub fn new(dir: impl Into<PathBuf>, grid_points: usize) -> Self {
        Self {
            dir: dir.into(),
            size: (800, 600),
            grid_points,
        }
    }

    pub fn figure_path(&self, id: usize) -> PathBuf {
        self.dir.join(format!("{id}.svg"))
    }
}

impl ProfileSink for SvgProfileSink {
    fn emit(&mut self, bundle: &ProfileBundle<'_>) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create plot directory '{}': {e}", self.dir.display()),
            )
        })?;

        let path = self.figure_path(bundle.parameter.id);
        draw_profile(&path, bundle, self.size, self.grid_points).map_err(|e| {
            AppError::new(2, format!("Failed to draw '{}': {e}", path.display()))
        })
    }
}

fn draw_profile(
    path: &Path,
    bundle: &ProfileBundle<'_>,
    size: (u32, u32),
    grid_points: usize,
) -> Result<(), Box<dyn Error>> {
    let samples: Vec<(f64, f64)> = bundle
        .profile
        .samples
        .iter()
        .filter(|s| s.value.is_finite() && s.delta_stat.is_finite())
        .map(|s| (s.value, s.delta_stat))
        .collect();
    let result = bundle.result;
    let (lower, upper) = (result.lower_bound(), result.upper_bound());

    let (x0, x1) = x_bounds(&samples, lower, upper);
    let (y0, y1) = y_bounds(&samples, bundle.level);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Parameter {} : {}", result.id, result.name),
            ("sans-serif", 22).into_font(),
        )
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc(result.name.as_str())
        .y_desc(bundle.statistic.delta_label())
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&|v| format!("{v:.4}"))
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    let curve_color = RGBColor(31, 119, 180);
    let level_color = RGBColor(214, 39, 40);
    let bound_color = RGBColor(44, 160, 44);

    if let Some(curve) = bundle.curve {
        let points: Vec<(f64, f64)> = curve
            .grid(grid_points)
            .into_iter()
            .filter(|&(x, y)| x >= x0 && x <= x1 && y.is_finite())
            .map(|(x, y)| (x, y.clamp(y0, y1)))
            .collect();
        chart.draw_series(LineSeries::new(points, &curve_color))?;
    }

    chart.draw_series(LineSeries::new(
        [(x0, bundle.level), (x1, bundle.level)],
        &level_color,
    ))?;

    for bound in [lower, upper] {
        if bound >= x0 && bound <= x1 {
            chart.draw_series(LineSeries::new(
                [(bound, y0), (bound, bundle.level)],
                &bound_color,
            ))?;
        }
    }

    chart.draw_series(
        samples
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLACK.filled())),
    )?;

    let annotation = format!(
        "{:.5}^{{+{:.5}}}_{{-{:.5}}}",
        result.best_fit, result.error_plus, result.error_minus
    );
    chart.draw_series(std::iter::once(Text::new(
        annotation,
        (x0 + 0.05 * (x1 - x0), y1 - 0.05 * (y1 - y0)),
        ("sans-serif", 16).into_font(),
    )))?;

    root.present()?;
    Ok(())
}

/// X range covering the samples, plus the bounds when they are not far outside.
fn x_bounds(samples: &[(f64, f64)], lower: f64, upper: f64) -> (f64, f64) {
    let mut lo = samples.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let mut hi = samples.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    if !(lo.is_finite() && hi.is_finite()) {
        lo = lower;
        hi = upper;
    }
    let span = (hi - lo).max(f64::EPSILON);
    for b in [lower, upper] {
        if b.is_finite() && b >= lo - span && b <= hi + span {
            lo = lo.min(b);
            hi = hi.max(b);
        }
    }
    pad(lo, hi)
}

fn y_bounds(samples: &[(f64, f64)], level: f64) -> (f64, f64) {
    let lo = samples.iter().map(|p| p.1).fold(0.0_f64, f64::min);
    let hi = samples.iter().map(|p| p.1).fold(level, f64::max);
    pad(lo, hi)
}

fn pad(lo: f64, hi: f64) -> (f64, f64) {
    let span = (hi - lo).abs();
    let p = if span > 0.0 { span * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    (lo - p, hi + p)
}
