//! ASCII plotting of Δstat profiles for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - profile samples: `o`
//! - interpolated curve: `-` line
//! - target level: `=` row
//! - bounds: `|` on the level row

use crate::domain::Sample;

/// What to draw for one parameter.
#[derive(Debug, Clone, Copy)]
pub struct AsciiProfile<'a> {
    pub name: &'a str,
    pub samples: &'a [Sample],
    pub curve: Option<&'a [(f64, f64)]>,
    pub level: f64,
    /// `(lower, upper)` bounds.
    pub bounds: Option<(f64, f64)>,
    /// Axis label of Δstat (e.g. `Δcstat`).
    pub label: &'a str,
}

/// Render a profile plot. Returns an empty string when there is nothing to draw.
pub fn render_profile_plot(profile: &AsciiProfile<'_>, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max)) = x_range(profile.samples) else {
        return String::new();
    };
    let (y_min, y_max) = y_range(profile.samples, profile.level);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let level_row = map_y(profile.level, y_min, y_max, height);
    for cell in grid[level_row].iter_mut() {
        *cell = '=';
    }

    if let Some(curve) = profile.curve {
        let clipped: Vec<(f64, f64)> = curve
            .iter()
            .copied()
            .filter(|&(x, y)| x >= x_min && x <= x_max && y >= y_min && y <= y_max)
            .collect();
        draw_curve(&mut grid, &clipped, x_min, x_max, y_min, y_max);
    }

    if let Some((lo, hi)) = profile.bounds {
        for b in [lo, hi] {
            if b >= x_min && b <= x_max {
                grid[level_row][map_x(b, x_min, x_max, width)] = '|';
            }
        }
    }

    for s in profile.samples {
        let x = map_x(s.value, x_min, x_max, width);
        let y = map_y(s.delta_stat, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Profile: {} | value=[{x_min:.3}, {x_max:.3}] | {}=[{y_min:.2}, {y_max:.2}] | level={}\n",
        profile.name, profile.label, profile.level
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(samples: &[Sample]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for s in samples {
        min_x = min_x.min(s.value);
        max_x = max_x.max(s.value);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(samples: &[Sample], level: f64) -> (f64, f64) {
    let mut min_y = level.min(0.0);
    let mut max_y = level.max(0.0);
    for s in samples {
        if s.delta_stat.is_finite() {
            min_y = min_y.min(s.delta_stat);
            max_y = max_y.max(s.delta_stat);
        }
    }
    (min_y, max_y)
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else if grid[yy][x] == ' ' {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
