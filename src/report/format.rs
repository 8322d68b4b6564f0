//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{ResonatorFit, SweepConfig};
use crate::fit::fitter::BatchOutcome;
use crate::io::discover::Discovery;
use crate::sweep::{SweepTable, SweepTables, power_key_to_dbm, temp_key_to_k};

/// Maximum pivot rows shown per parameter preview.
const PREVIEW_ROWS: usize = 8;

/// Maximum pivot columns shown per parameter preview.
const PREVIEW_COLS: usize = 8;

/// Rank the fits with the worst goodness of fit (highest reduced chi-squared).
pub fn rank_worst(fits: &[ResonatorFit], top_n: usize) -> Vec<ResonatorFit> {
    let mut sorted = fits.to_vec();
    sorted.sort_by(|a, b| {
        b.quality
            .redchi
            .partial_cmp(&a.quality.redchi)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

/// Format the full run summary (discovery + fit counts + sweep coverage).
pub fn format_run_summary(
    config: &SweepConfig,
    discovery: &Discovery,
    n_parsed: usize,
    outcome: &BatchOutcome,
    tables: &SweepTables,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== qsweep - resonator sweep fit: {} ===\n", config.name));
    out.push_str(&format!("Directory: {}\n", config.data_dir.display()));
    out.push_str(&format!(
        "Files: {} matched | {} unparsable names | {} parsed | {} fitted | {} failed\n",
        discovery.files.len(),
        discovery.skipped.len(),
        n_parsed,
        outcome.fits.len(),
        outcome.failures.len(),
    ));

    if let Some((t_lo, t_hi, p_lo, p_hi)) = sweep_ranges(&outcome.fits) {
        out.push_str(&format!(
            "Sweep: temp=[{t_lo:.4}, {t_hi:.4}]K | power=[{p_lo:.1}, {p_hi:.1}]dBm\n"
        ));
    }

    if let Some(first) = tables.tables.first() {
        let grid = first.n_rows() * first.n_cols();
        out.push_str(&format!(
            "Grid: {} temps x {} powers = {} cells | {} set | {} gaps | {} collisions\n",
            first.n_rows(),
            first.n_cols(),
            grid,
            first.n_set(),
            grid - first.n_set(),
            tables.collisions,
        ));
    }

    for (path, reason) in &discovery.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", path.display()));
    }
    for failure in &outcome.failures {
        out.push_str(&format!("  (fit failed {}) {}\n", failure.source.display(), failure.message));
    }

    out
}

fn sweep_ranges(fits: &[ResonatorFit]) -> Option<(f64, f64, f64, f64)> {
    if fits.is_empty() {
        return None;
    }
    let mut t_lo = f64::INFINITY;
    let mut t_hi = f64::NEG_INFINITY;
    let mut p_lo = f64::INFINITY;
    let mut p_hi = f64::NEG_INFINITY;
    for f in fits {
        t_lo = t_lo.min(f.temp_k);
        t_hi = t_hi.max(f.temp_k);
        p_lo = p_lo.min(f.power_dbm);
        p_hi = p_hi.max(f.power_dbm);
    }
    Some((t_lo, t_hi, p_lo, p_hi))
}

/// Format one fitted record (used by `qsweep fit`).
pub fn format_fit(fit: &ResonatorFit) -> String {
    let p = &fit.params;
    let mut out = String::new();

    out.push_str(&format!("Fit: {}\n", fit.source.display()));
    out.push_str(&format!(
        "- temp: {:.4} K (itemp {} mK) | power: {:.1} dBm\n",
        fit.temp_k, fit.itemp_mk, fit.power_dbm
    ));
    out.push_str(&format!("- f0    : {:.3} Hz\n", p.f0));
    out.push_str(&format!("- df    : {:.3} Hz\n", p.df));
    out.push_str(&format!("- qi    : {:.1}\n", p.qi));
    out.push_str(&format!("- qc    : {:.1}\n", p.qc));
    out.push_str(&format!("- q0    : {:.1}\n", p.q0()));
    out.push_str(&format!("- gain0 : {:.6}\n", p.gain0));
    out.push_str(&format!(
        "- redchi: {:.3e} ({} iters, converged={})\n",
        fit.quality.redchi, fit.quality.iterations, fit.quality.converged
    ));

    if let Some(mc) = &fit.mc {
        out.push_str(&format!(
            "- mc ({} samples): f0 = {:.3} +/- {:.3} Hz | qi = {:.1} +/- {:.1} | qc = {:.1} +/- {:.1}\n",
            mc.samples, mc.f0_mean, mc.f0_err, mc.qi_mean, mc.qi_err, mc.qc_mean, mc.qc_err
        ));
    }

    out
}

/// Format head-of-table previews for every pivoted parameter.
pub fn format_table_previews(tables: &SweepTables) -> String {
    let mut out = String::new();
    for table in &tables.tables {
        out.push_str(&format_table_preview(table, tables));
        out.push('\n');
    }
    out
}

fn format_table_preview(table: &SweepTable, tables: &SweepTables) -> String {
    let mut out = String::new();

    let n_rows = table.n_rows().min(PREVIEW_ROWS);
    let n_cols = table.n_cols().min(PREVIEW_COLS);

    out.push_str(&format!(
        "{} [{} x {}, {} set]:\n",
        table.param.label(),
        table.n_rows(),
        table.n_cols(),
        table.n_set()
    ));

    // Header: power columns.
    out.push_str("  temp_k  ");
    for col in 0..n_cols {
        out.push_str(&format!("{:>12.1}", power_key_to_dbm(table.power_keys[col])));
    }
    if n_cols < table.n_cols() {
        out.push_str("  ...");
    }
    out.push('\n');

    for row in 0..n_rows {
        out.push_str(&format!("  {:<8.4}", temp_key_to_k(table.temp_keys_mk[row], tables.index)));
        for col in 0..n_cols {
            match table.get(row, col) {
                Some(v) => out.push_str(&format!("{v:>12.5e}")),
                None => out.push_str(&format!("{:>12}", "-")),
            }
        }
        out.push('\n');
    }
    if n_rows < table.n_rows() {
        out.push_str(&format!("  ... {} more rows\n", table.n_rows() - n_rows));
    }

    out
}

/// Format the worst-fit ranking table.
pub fn format_worst_fits(worst: &[ResonatorFit]) -> String {
    let mut out = String::new();
    out.push_str("Worst fits (by redchi):\n");
    if worst.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }

    out.push_str(&format!(
        "  {:<10} {:>8} {:>14} {:>12} {:>12}  {}\n",
        "temp_k", "power", "f0", "qi", "redchi", "source"
    ));
    for f in worst {
        out.push_str(&format!(
            "  {:<10.4} {:>8.1} {:>14.0} {:>12.0} {:>12.3e}  {}\n",
            f.temp_k,
            f.power_dbm,
            f.params.f0,
            f.params.qi,
            f.quality.redchi,
            f.source.display(),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitQuality, ResonanceParams};
    use std::path::PathBuf;

    fn fit_with_redchi(redchi: f64) -> ResonatorFit {
        ResonatorFit {
            source: PathBuf::from(format!("r_{redchi}.s2p")),
            temp_k: 0.1,
            itemp_mk: 100,
            power_dbm: -50.0,
            params: ResonanceParams {
                df: 0.0,
                f0: 5.0e9,
                qc: 3.0e4,
                qi: 1.0e5,
                gain0: 1.0,
                gain1: 0.0,
                gain2: 0.0,
                pgain0: 0.0,
                pgain1: 0.0,
            },
            quality: FitQuality {
                sse: redchi,
                redchi,
                n_points: 100,
                iterations: 3,
                converged: true,
            },
            mc: None,
        }
    }

    #[test]
    fn worst_ranking_sorts_descending_and_truncates() {
        let fits = vec![fit_with_redchi(1.0), fit_with_redchi(5.0), fit_with_redchi(2.0)];
        let worst = rank_worst(&fits, 2);
        assert_eq!(worst.len(), 2);
        assert!((worst[0].quality.redchi - 5.0).abs() < 1e-12);
        assert!((worst[1].quality.redchi - 2.0).abs() < 1e-12);
    }
}
