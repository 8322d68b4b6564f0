//! Complex transmission model evaluation.
//!
//! The fitter relies on two primitive operations:
//! - predict S21 over the measured frequency axis (for residuals/plots)
//! - stack complex residuals into a real vector (for least squares)
//!
//! Model, with `ffm = (f - fm)/fm` (fm = mid-span frequency), `ff = (f - f0)/f0`
//! and `1/q0 = 1/qi + 1/qc`:
//!
//! ```text
//! gain  = gain0 + gain1·ffm + ½·gain2·ffm²
//! pgain = exp(i·(pgain0 + pgain1·ffm))
//! S21   = gain · pgain · (1/qi + 2i·(ff + df/f0)) / (1/q0 + 2i·ff)
//! ```
//!
//! The baseline polynomial is expanded around the middle of the measured span
//! rather than `f0`, so baseline and resonance parameters stay decoupled when
//! the dip sits off-center.

use num_complex::Complex64;

use crate::domain::ResonanceParams;

/// Baseline expansion point: the mid-span sample's frequency.
pub fn mid_freq(freqs: &[f64]) -> f64 {
    if freqs.is_empty() {
        return f64::NAN;
    }
    freqs[freqs.len() / 2]
}

/// Predict S21 at a single frequency.
pub fn predict_one(p: &ResonanceParams, f: f64, fm: f64) -> Complex64 {
    let ffm = (f - fm) / fm;
    let gain = p.gain0 + p.gain1 * ffm + 0.5 * p.gain2 * ffm * ffm;
    let pgain = Complex64::new(0.0, p.pgain0 + p.pgain1 * ffm).exp();

    let q0 = 1.0 / (1.0 / p.qi + 1.0 / p.qc);
    let ff = (f - p.f0) / p.f0;

    let num = Complex64::new(1.0 / p.qi, 2.0 * (ff + p.df / p.f0));
    let den = Complex64::new(1.0 / q0, 2.0 * ff);

    gain * pgain * num / den
}

/// Predict S21 over a frequency axis.
pub fn predict(p: &ResonanceParams, freqs: &[f64]) -> Vec<Complex64> {
    let fm = mid_freq(freqs);
    freqs.iter().map(|&f| predict_one(p, f, fm)).collect()
}

/// Fill `out` with stacked residuals: `out[2i] = Re(obs - model)`,
/// `out[2i+1] = Im(obs - model)`.
///
/// # Panics
/// Panics if `out.len() != 2 * freqs.len()` or `s21.len() != freqs.len()`.
/// Callers size these buffers.
pub fn fill_residuals(p: &ResonanceParams, freqs: &[f64], s21: &[Complex64], out: &mut [f64]) {
    assert_eq!(s21.len(), freqs.len());
    assert_eq!(out.len(), 2 * freqs.len());

    let fm = mid_freq(freqs);
    for (i, (&f, &obs)) in freqs.iter().zip(s21.iter()).enumerate() {
        let r = obs - predict_one(p, f, fm);
        out[2 * i] = r.re;
        out[2 * i + 1] = r.im;
    }
}

/// Sum of squared stacked residuals.
pub fn sse(p: &ResonanceParams, freqs: &[f64], s21: &[Complex64]) -> f64 {
    let fm = mid_freq(freqs);
    freqs
        .iter()
        .zip(s21.iter())
        .map(|(&f, &obs)| (obs - predict_one(p, f, fm)).norm_sqr())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> ResonanceParams {
        ResonanceParams {
            df: 0.0,
            f0: 5.0e9,
            qc: 30_000.0,
            qi: 90_000.0,
            gain0: 0.7,
            gain1: 0.0,
            gain2: 0.0,
            pgain0: 0.0,
            pgain1: 0.0,
        }
    }

    #[test]
    fn on_resonance_depth_is_q0_over_qi() {
        let p = base_params();
        // Center the span on f0 so fm == f0 and the baseline term is exactly gain0.
        let freqs: Vec<f64> = (0..101).map(|i| 5.0e9 - 1.0e6 + i as f64 * 2.0e4).collect();
        let fm = mid_freq(&freqs);
        let s = predict_one(&p, p.f0, fm);

        let expected = p.gain0 * p.q0() / p.qi;
        assert!((s.norm() - expected).abs() < 1e-9, "|S21(f0)| = {}", s.norm());
    }

    #[test]
    fn far_off_resonance_magnitude_approaches_baseline() {
        let p = base_params();
        let freqs: Vec<f64> = (0..3).map(|i| 5.0e9 + i as f64 * 1.0e3).collect();
        let fm = mid_freq(&freqs);
        // 500 linewidths away from the dip.
        let far = p.f0 * (1.0 + 500.0 / p.q0());
        let s = predict_one(&p, far, fm);
        // gain1/gain2 are zero, so only the resonance term can move the magnitude.
        assert!((s.norm() - p.gain0).abs() < 0.01 * p.gain0);
    }

    #[test]
    fn residual_vector_is_zero_on_model_data() {
        let p = base_params();
        let freqs: Vec<f64> = (0..64).map(|i| 4.9995e9 + i as f64 * 1.5e4).collect();
        let s21 = predict(&p, &freqs);

        let mut out = vec![f64::NAN; 2 * freqs.len()];
        fill_residuals(&p, &freqs, &s21, &mut out);
        assert!(out.iter().all(|v| v.abs() < 1e-12));
        assert!(sse(&p, &freqs, &s21) < 1e-20);
    }
}
