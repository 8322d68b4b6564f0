//! Per-record and batch fitting.
//!
//! `fit_record` runs guess → Levenberg–Marquardt → diagnostics for one sweep.
//! `fit_collection` maps that over a whole directory of records in parallel;
//! a record that refuses to fit becomes a `FitFailure` note instead of
//! aborting the batch.

use std::path::PathBuf;

use rayon::prelude::*;

use crate::domain::{
    FitQuality, PARAM_LEN, ResonanceParams, ResonatorFit, ResonatorRecord, SweepConfig,
};
use crate::error::AppError;
use crate::fit::guess::initial_guess;
use crate::fit::lm::{LmOptions, ParamSpace, minimize};
use crate::fit::mc;
use crate::model;
use crate::sweep::temp_key_mk;

/// A record that could not be fitted (reported, not fatal).
#[derive(Debug, Clone)]
pub struct FitFailure {
    pub source: PathBuf,
    pub message: String,
}

/// Outcome of a batch fit, in input (sorted file) order.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub fits: Vec<ResonatorFit>,
    pub failures: Vec<FitFailure>,
}

/// Bounds and finite-difference scales around an initial guess.
///
/// Physical constraints only: `f0` stays inside the measured span, quality
/// factors stay positive, the baseline magnitude stays positive. Everything
/// else is free.
pub fn param_space(g: &ResonanceParams, freqs: &[f64]) -> ParamSpace {
    let f_lo = freqs.first().copied().unwrap_or(g.f0);
    let f_hi = freqs.last().copied().unwrap_or(g.f0);
    let span = (f_hi - f_lo).abs().max(1.0);
    let linewidth = (g.f0 / g.q0()).max(1e-3);

    ParamSpace {
        //          df     f0    qc     qi     gain0  gain1  gain2  pgain0  pgain1
        lower: vec![
            -span,
            f_lo,
            1.0,
            1.0,
            1e-12,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
            -2.0 * std::f64::consts::PI,
            f64::NEG_INFINITY,
        ],
        upper: vec![
            span,
            f_hi,
            1e9,
            1e9,
            f64::INFINITY,
            f64::INFINITY,
            f64::INFINITY,
            2.0 * std::f64::consts::PI,
            f64::INFINITY,
        ],
        scales: vec![
            linewidth,
            g.f0.abs(),
            g.qc.abs(),
            g.qi.abs(),
            g.gain0.abs(),
            g.gain0.abs(),
            g.gain0.abs(),
            1.0,
            10.0,
        ],
    }
}

/// Fit the complex I/Q model to a single record.
pub fn fit_record(
    record: &ResonatorRecord,
    opts: &LmOptions,
) -> Result<(ResonanceParams, FitQuality), AppError> {
    let g = initial_guess(&record.freq_hz, &record.s21)?;
    refit(record, &g, opts)
}

/// Run the optimizer from an explicit starting point.
///
/// Shared with the Monte Carlo pass, which restarts from the converged fit.
pub fn refit(
    record: &ResonatorRecord,
    start: &ResonanceParams,
    opts: &LmOptions,
) -> Result<(ResonanceParams, FitQuality), AppError> {
    let space = param_space(start, &record.freq_hz);
    let m = 2 * record.len();

    let freqs = &record.freq_hz;
    let s21 = &record.s21;
    let residual = |x: &[f64], out: &mut [f64]| {
        let p = ResonanceParams::from_vec(x);
        model::fill_residuals(&p, freqs, s21, out);
    };

    let out = minimize(residual, &start.to_vec(), &space, m, opts)?;
    let params = ResonanceParams::from_vec(&out.params);

    let dof = m.saturating_sub(PARAM_LEN).max(1);
    let quality = FitQuality {
        sse: out.sse,
        redchi: out.sse / dof as f64,
        n_points: record.len(),
        iterations: out.iterations,
        converged: out.converged,
    };

    Ok((params, quality))
}

/// Fit every record, in parallel, preserving input order.
pub fn fit_collection(records: &[ResonatorRecord], config: &SweepConfig) -> BatchOutcome {
    let opts = LmOptions {
        max_iters: config.max_iters,
        tol: config.tol,
    };

    let results: Vec<Result<ResonatorFit, FitFailure>> = records
        .par_iter()
        .map(|rec| match fit_record(rec, &opts) {
            Ok((params, quality)) => {
                let mc = if config.mc_samples > 0 {
                    mc::mc_stats(rec, &params, &quality, config.mc_samples, config.mc_seed)
                } else {
                    None
                };
                Ok(ResonatorFit {
                    source: rec.path.clone(),
                    temp_k: rec.temp_k,
                    itemp_mk: temp_key_mk(rec.temp_k, config.index_mode, config.bucket_mk),
                    power_dbm: rec.power_dbm,
                    params,
                    quality,
                    mc,
                })
            }
            Err(e) => Err(FitFailure {
                source: rec.path.clone(),
                message: e.to_string(),
            }),
        })
        .collect();

    let mut fits = Vec::new();
    let mut failures = Vec::new();
    for r in results {
        match r {
            Ok(f) => fits.push(f),
            Err(f) => failures.push(f),
        }
    }

    BatchOutcome { fits, failures }
}
