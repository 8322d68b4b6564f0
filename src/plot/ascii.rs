//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Two plot kinds:
//! - magnitude: observed |S21| in dB as `o`, fitted curve as `-`
//! - parameter vs temperature: one digit marker per power series

use num_complex::Complex64;

use crate::domain::{IndexMode, ResonanceParams};
use crate::model::predict;
use crate::sweep::{SweepTable, power_key_to_dbm, temp_key_to_k};

/// Render the measured magnitude with the fitted curve overlaid.
pub fn render_magnitude_plot(
    freqs: &[f64],
    s21: &[Complex64],
    fit: Option<&ResonanceParams>,
    width: usize,
    height: usize,
) -> String {
    let Some((f_min, f_max)) = axis_range(freqs) else {
        return "Plot: no data\n".to_string();
    };

    let obs: Vec<(f64, f64)> = freqs
        .iter()
        .zip(s21.iter())
        .map(|(&f, s)| (f, db(s.norm())))
        .collect();

    let curve: Option<Vec<(f64, f64)>> = fit.map(|p| {
        predict(p, freqs)
            .iter()
            .zip(freqs.iter())
            .map(|(s, &f)| (f, db(s.norm())))
            .collect()
    });

    let (y_min, y_max) = y_range(&obs, curve.as_deref()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let width = width.max(10);
    let height = height.max(5);
    let mut grid = vec![vec![' '; width]; height];

    if let Some(curve) = &curve {
        draw_curve(&mut grid, curve, f_min, f_max, y_min, y_max);
    }
    for &(f, y) in &obs {
        let x = map_x(f, f_min, f_max, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: freq=[{:.6}, {:.6}] GHz | |S21|=[{y_min:.2}, {y_max:.2}] dB\n",
        f_min / 1e9,
        f_max / 1e9
    ));
    push_grid(&mut out, grid);
    out
}

/// Render one pivoted parameter against temperature.
///
/// Each power column becomes its own series, marked `1`–`9` (then `*` when a
/// sweep has more than nine powers). The legend maps markers back to dBm.
pub fn render_param_plot(table: &SweepTable, index: IndexMode, width: usize, height: usize) -> String {
    let mut points_by_series: Vec<(char, f64, Vec<(f64, f64)>)> = Vec::new();
    for (col, &pk) in table.power_keys.iter().enumerate() {
        let marker = series_marker(col);
        let series: Vec<(f64, f64)> = table
            .column(col)
            .into_iter()
            .filter_map(|(tk, v)| v.map(|v| (temp_key_to_k(tk, index), v)))
            .collect();
        if !series.is_empty() {
            points_by_series.push((marker, power_key_to_dbm(pk), series));
        }
    }

    let all: Vec<(f64, f64)> = points_by_series
        .iter()
        .flat_map(|(_, _, s)| s.iter().copied())
        .collect();

    let Some((t_min, t_max)) = axis_range(&all.iter().map(|&(t, _)| t).collect::<Vec<_>>()) else {
        return format!("Plot: {} — no populated cells\n", table.param.label());
    };
    let (y_min, y_max) = y_range(&all, None).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let width = width.max(10);
    let height = height.max(5);
    let mut grid = vec![vec![' '; width]; height];

    for (marker, _, series) in &points_by_series {
        for &(t, y) in series {
            let x = map_x(t, t_min, t_max, width);
            let yy = map_y(y, y_min, y_max, height);
            grid[yy][x] = *marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | temp=[{t_min:.4}, {t_max:.4}] K | y=[{y_min:.4e}, {y_max:.4e}]\n",
        table.param.label()
    ));
    push_grid(&mut out, grid);
    for (marker, power, _) in &points_by_series {
        out.push_str(&format!("  {marker} = {power:.1} dBm\n"));
    }
    out
}

fn series_marker(col: usize) -> char {
    match col {
        0..=8 => char::from_digit(col as u32 + 1, 10).unwrap_or('*'),
        _ => '*',
    }
}

fn db(mag: f64) -> f64 {
    20.0 * mag.max(1e-300).log10()
}

fn axis_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for &v in values {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v.is_finite() && max_v.is_finite() && max_v > min_v {
        Some((min_v, max_v))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if let Some(curve) = curve {
        for &(_, y) in curve {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
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

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamKind;

    #[test]
    fn param_plot_golden_snapshot_small() {
        // Two temps, one power, values 1.0 and 2.0.
        let table = SweepTable {
            param: ParamKind::Qi,
            temp_keys_mk: vec![100, 200],
            power_keys: vec![-5000],
            values: vec![Some(1.0), Some(2.0)],
        };

        let txt = render_param_plot(&table, IndexMode::Block, 10, 5);
        let expected = concat!(
            "Plot: qi | temp=[0.1000, 0.2000] K | y=[9.5000e-1, 2.0500e0]\n",
            "         1\n",
            "          \n",
            "          \n",
            "          \n",
            "1         \n",
            "  1 = -50.0 dBm\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn magnitude_plot_marks_points_and_curve() {
        let p = ResonanceParams {
            df: 0.0,
            f0: 5.0e9,
            qc: 3.0e4,
            qi: 1.0e5,
            gain0: 0.8,
            gain1: 0.0,
            gain2: 0.0,
            pgain0: 0.0,
            pgain1: 0.0,
        };
        let half = 5.0 * p.f0 / p.q0();
        let n = 64;
        let freqs: Vec<f64> = (0..n)
            .map(|i| p.f0 - half + 2.0 * half * i as f64 / (n as f64 - 1.0))
            .collect();
        let s21 = predict(&p, &freqs);

        let txt = render_magnitude_plot(&freqs, &s21, Some(&p), 40, 12);
        assert!(txt.contains('o'));
        assert!(txt.starts_with("Plot: freq=["));
        // Deterministic: same input, same output.
        assert_eq!(txt, render_magnitude_plot(&freqs, &s21, Some(&p), 40, 12));
    }

    #[test]
    fn empty_table_renders_placeholder() {
        let table = SweepTable {
            param: ParamKind::F0,
            temp_keys_mk: vec![],
            power_keys: vec![],
            values: vec![],
        };
        let txt = render_param_plot(&table, IndexMode::Block, 10, 5);
        assert!(txt.contains("no populated cells"));
    }
}
