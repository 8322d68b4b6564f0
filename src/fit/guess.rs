//! Deterministic starting parameters for the fit.
//!
//! The optimizer only converges reliably when started near the dip, so we
//! estimate every parameter directly from the data:
//!
//! - baseline gain/phase from the outer 10% of the span (off-resonance tails)
//! - `f0` at the minimum of |S21|
//! - total Q from the half-power bandwidth
//! - the qi/qc split from the resonance depth: at `f0`, `|S21| = gain·q0/qi`
//!
//! No randomness anywhere; identical data yields identical guesses.

use num_complex::Complex64;

use crate::domain::ResonanceParams;
use crate::error::AppError;
use crate::model::mid_freq;

/// Minimum number of frequency points we accept for a guess/fit.
pub const MIN_POINTS: usize = 16;

/// Estimate starting parameters from a measured sweep.
pub fn initial_guess(freqs: &[f64], s21: &[Complex64]) -> Result<ResonanceParams, AppError> {
    let n = freqs.len();
    if n < MIN_POINTS || s21.len() != n {
        return Err(AppError::no_data(format!(
            "Too few points for a fit: n={n} (need >= {MIN_POINTS})."
        )));
    }

    let fm = mid_freq(freqs);
    let mags: Vec<f64> = s21.iter().map(|s| s.norm()).collect();

    // Edge windows: at least 3 points, at most 10% of the span per side.
    let k = (n / 10).max(3).min(n / 2);

    let edge_l = 0..k;
    let edge_r = (n - k)..n;

    let mag_l = mean(&mags[edge_l.clone()]);
    let mag_r = mean(&mags[edge_r.clone()]);
    let ffm_l = mean_ffm(freqs, edge_l.clone(), fm);
    let ffm_r = mean_ffm(freqs, edge_r.clone(), fm);

    let gain0 = 0.5 * (mag_l + mag_r);
    if !(gain0.is_finite() && gain0 > 0.0) {
        return Err(AppError::no_data("Baseline magnitude estimate is not positive."));
    }
    let gain1 = if (ffm_r - ffm_l).abs() > 1e-15 {
        (mag_r - mag_l) / (ffm_r - ffm_l)
    } else {
        0.0
    };

    // Baseline phase: circular means of the edge windows, joined by the
    // shortest angular path so a 2π wrap between edges doesn't flip the slope.
    let ph_l = mean_angle(&s21[edge_l]);
    let ph_r = mean_angle(&s21[edge_r]);
    let dphi = wrap_to_pi(ph_r - ph_l);
    let pgain1 = if (ffm_r - ffm_l).abs() > 1e-15 {
        dphi / (ffm_r - ffm_l)
    } else {
        0.0
    };
    let pgain0 = wrap_to_pi(ph_l - pgain1 * ffm_l);

    // Dip location and depth.
    let (min_idx, min_mag) = argmin(&mags);
    let f0 = freqs[min_idx];
    let depth = (min_mag / gain0).clamp(1e-6, 0.99);

    // Half-power bandwidth around the dip.
    let bw = half_power_bandwidth(freqs, &mags, min_idx, gain0, min_mag)
        .unwrap_or((freqs[n - 1] - freqs[0]).abs() / 10.0);
    let q0 = (f0 / bw.max(1e-9)).max(10.0);

    // depth = q0/qi at resonance, and 1/qc = 1/q0 - 1/qi.
    let qi = q0 / depth;
    let qc = q0 / (1.0 - depth);

    Ok(ResonanceParams {
        df: 0.0,
        f0,
        qc,
        qi,
        gain0,
        gain1,
        gain2: 0.0,
        pgain0,
        pgain1,
    })
}

fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

fn mean_ffm(freqs: &[f64], range: std::ops::Range<usize>, fm: f64) -> f64 {
    let vals: Vec<f64> = freqs[range].iter().map(|&f| (f - fm) / fm).collect();
    mean(&vals)
}

/// Circular mean of the samples' phases.
fn mean_angle(s: &[Complex64]) -> f64 {
    let sum: Complex64 = s.iter().map(|z| *z / z.norm().max(1e-300)).sum();
    sum.arg()
}

fn wrap_to_pi(a: f64) -> f64 {
    let mut a = a % (2.0 * std::f64::consts::PI);
    if a > std::f64::consts::PI {
        a -= 2.0 * std::f64::consts::PI;
    } else if a < -std::f64::consts::PI {
        a += 2.0 * std::f64::consts::PI;
    }
    a
}

fn argmin(v: &[f64]) -> (usize, f64) {
    let mut idx = 0;
    let mut best = f64::INFINITY;
    for (i, &x) in v.iter().enumerate() {
        if x < best {
            best = x;
            idx = i;
        }
    }
    (idx, best)
}

/// Width between the half-power crossings on either side of the dip.
///
/// The half-power level in magnitude is `sqrt((baseline² + min²)/2)`.
/// Returns `None` when either side never crosses (truncated dip).
fn half_power_bandwidth(
    freqs: &[f64],
    mags: &[f64],
    min_idx: usize,
    baseline: f64,
    min_mag: f64,
) -> Option<f64> {
    let level = ((baseline * baseline + min_mag * min_mag) / 2.0).sqrt();

    let mut lo = None;
    for i in (0..min_idx).rev() {
        if mags[i] >= level {
            lo = Some(freqs[i]);
            break;
        }
    }
    let mut hi = None;
    for i in (min_idx + 1)..mags.len() {
        if mags[i] >= level {
            hi = Some(freqs[i]);
            break;
        }
    }

    match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => Some(hi - lo),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::predict;

    fn synth(p: &ResonanceParams, n: usize, halfspan_linewidths: f64) -> (Vec<f64>, Vec<Complex64>) {
        let half = halfspan_linewidths * p.f0 / p.q0();
        let freqs: Vec<f64> = (0..n)
            .map(|i| p.f0 - half + 2.0 * half * i as f64 / (n as f64 - 1.0))
            .collect();
        let s21 = predict(p, &freqs);
        (freqs, s21)
    }

    #[test]
    fn guess_recovers_ballpark_parameters() {
        let truth = ResonanceParams {
            df: 0.0,
            f0: 5.0e9,
            qc: 30_000.0,
            qi: 120_000.0,
            gain0: 0.8,
            gain1: 0.0,
            gain2: 0.0,
            pgain0: 0.3,
            pgain1: 0.0,
        };
        let (freqs, s21) = synth(&truth, 401, 10.0);
        let g = initial_guess(&freqs, &s21).unwrap();

        assert!((g.f0 - truth.f0).abs() < truth.f0 / truth.q0());
        assert!((g.gain0 - truth.gain0).abs() < 0.1 * truth.gain0);
        // Order-of-magnitude agreement is all the optimizer needs.
        assert!(g.qi > truth.qi / 5.0 && g.qi < truth.qi * 5.0, "qi guess {}", g.qi);
        assert!(g.qc > truth.qc / 5.0 && g.qc < truth.qc * 5.0, "qc guess {}", g.qc);
    }

    #[test]
    fn guess_rejects_short_sweeps() {
        let freqs = vec![1.0; 4];
        let s21 = vec![Complex64::new(1.0, 0.0); 4];
        let err = initial_guess(&freqs, &s21).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn wrap_to_pi_stays_in_range() {
        for a in [-10.0, -3.2, 0.0, 3.2, 10.0, 100.0] {
            let w = wrap_to_pi(a);
            assert!(w >= -std::f64::consts::PI - 1e-12 && w <= std::f64::consts::PI + 1e-12);
        }
    }
}
