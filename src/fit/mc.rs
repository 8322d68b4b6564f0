//! Monte Carlo parameter uncertainties via residual bootstrap.
//!
//! After the deterministic fit converges, we estimate the per-point noise
//! level from the residuals, synthesize `samples` perturbed datasets
//! (model + gaussian noise on I and Q), refit each from the converged
//! parameters, and report the mean and spread of the refitted `f0`, `df`,
//! `qi`, `qc`.
//!
//! Seeding is derived from the run seed plus the record's path, so a batch
//! run is reproducible regardless of rayon's scheduling order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use num_complex::Complex64;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{FitQuality, McStats, ResonanceParams, ResonatorRecord};
use crate::fit::fitter::refit;
use crate::fit::lm::LmOptions;
use crate::model::predict;

/// Refit iteration cap per bootstrap sample; starts at the converged optimum,
/// so a short leash is enough.
const MC_MAX_ITERS: usize = 40;

/// Minimum successful refits required to report statistics.
const MIN_SUCCESSES: usize = 2;

/// Bootstrap one record. Returns `None` when too few samples refit cleanly.
pub fn mc_stats(
    record: &ResonatorRecord,
    params: &ResonanceParams,
    quality: &FitQuality,
    samples: usize,
    seed: u64,
) -> Option<McStats> {
    if samples == 0 || record.is_empty() {
        return None;
    }

    // Per-point noise sigma from the converged fit (stacked re/im residuals).
    let m = 2 * record.len();
    let sigma = (quality.sse / m as f64).sqrt();

    let mut rng = StdRng::seed_from_u64(record_seed(seed, record));
    let noise = Normal::new(0.0, sigma.max(1e-300)).ok()?;

    let base = predict(params, &record.freq_hz);
    let opts = LmOptions {
        max_iters: MC_MAX_ITERS,
        tol: 1e-10,
    };

    let mut f0s = Vec::with_capacity(samples);
    let mut dfs = Vec::with_capacity(samples);
    let mut qis = Vec::with_capacity(samples);
    let mut qcs = Vec::with_capacity(samples);

    for _ in 0..samples {
        let s21: Vec<Complex64> = base
            .iter()
            .map(|s| *s + Complex64::new(noise.sample(&mut rng), noise.sample(&mut rng)))
            .collect();

        let perturbed = ResonatorRecord {
            s21,
            freq_hz: record.freq_hz.clone(),
            name: record.name.clone(),
            path: record.path.clone(),
            temp_k: record.temp_k,
            power_dbm: record.power_dbm,
        };

        if let Ok((p, q)) = refit(&perturbed, params, &opts) {
            if q.converged {
                f0s.push(p.f0);
                dfs.push(p.df);
                qis.push(p.qi);
                qcs.push(p.qc);
            }
        }
    }

    if f0s.len() < MIN_SUCCESSES {
        return None;
    }

    let (f0_mean, f0_err) = mean_std(&f0s);
    let (df_mean, df_err) = mean_std(&dfs);
    let (qi_mean, qi_err) = mean_std(&qis);
    let (qc_mean, qc_err) = mean_std(&qcs);

    Some(McStats {
        samples: f0s.len(),
        f0_mean,
        f0_err,
        df_mean,
        df_err,
        qi_mean,
        qi_err,
        qc_mean,
        qc_err,
    })
}

/// Combine the run seed with the record identity.
fn record_seed(seed: u64, record: &ResonatorRecord) -> u64 {
    let mut h = DefaultHasher::new();
    seed.hash(&mut h);
    record.path.hash(&mut h);
    h.finish()
}

/// Sample mean and (n-1) standard deviation.
fn mean_std(v: &[f64]) -> (f64, f64) {
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    if v.len() < 2 {
        return (mean, 0.0);
    }
    let var = v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fitter::fit_record;
    use std::path::PathBuf;

    fn synth_record() -> (ResonatorRecord, ResonanceParams) {
        let truth = ResonanceParams {
            df: 0.0,
            f0: 5.0e9,
            qc: 30_000.0,
            qi: 100_000.0,
            gain0: 0.8,
            gain1: 0.0,
            gain2: 0.0,
            pgain0: 0.2,
            pgain1: 0.0,
        };
        let half = 10.0 * truth.f0 / truth.q0();
        let n = 201;
        let freqs: Vec<f64> = (0..n)
            .map(|i| truth.f0 - half + 2.0 * half * i as f64 / (n as f64 - 1.0))
            .collect();
        let s21 = predict(&truth, &freqs);
        (
            ResonatorRecord {
                name: "RES-1".to_string(),
                path: PathBuf::from("RES-1_-50_DBM_TEMP_0.113.S2P"),
                temp_k: 0.113,
                power_dbm: -50.0,
                freq_hz: freqs,
                s21,
            },
            truth,
        )
    }

    #[test]
    fn bootstrap_is_deterministic_for_a_seed() {
        let (rec, _) = synth_record();
        let (params, quality) = fit_record(&rec, &LmOptions::default()).unwrap();

        let a = mc_stats(&rec, &params, &quality, 8, 42).unwrap();
        let b = mc_stats(&rec, &params, &quality, 8, 42).unwrap();
        assert_eq!(a.f0_mean.to_bits(), b.f0_mean.to_bits());
        assert_eq!(a.qi_err.to_bits(), b.qi_err.to_bits());
    }

    #[test]
    fn bootstrap_mean_tracks_the_fit() {
        let (rec, truth) = synth_record();
        let (params, quality) = fit_record(&rec, &LmOptions::default()).unwrap();

        let mc = mc_stats(&rec, &params, &quality, 8, 7).unwrap();
        // Noiseless data: residual sigma is ~0, so samples barely move.
        let linewidth = truth.f0 / truth.q0();
        assert!((mc.f0_mean - params.f0).abs() < 0.1 * linewidth);
        assert!(mc.samples >= MIN_SUCCESSES);
    }

    #[test]
    fn zero_samples_disables_the_pass() {
        let (rec, _) = synth_record();
        let (params, quality) = fit_record(&rec, &LmOptions::default()).unwrap();
        assert!(mc_stats(&rec, &params, &quality, 0, 1).is_none());
    }
}
