//! Synthetic sweep generation.
//!
//! Produces a full (temperature × power) grid of instrument files for a made-up
//! resonator, with the warts of a real run:
//!
//! - temperatures jittered by a fraction of a millikelvin between settings
//! - a configurable fraction of grid cells dropped (ruined/duplicate sweeps)
//! - gaussian noise on I and Q
//! - `qi` falling and `f0` pulling down as the stage warms, `qi` creeping up
//!   with readout power
//!
//! Everything is driven by one seed, so a generated dataset is reproducible
//! bit for bit. Files are produced in memory first; tests consume them
//! without touching the filesystem.

use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::ResonanceParams;
use crate::error::AppError;
use crate::model::predict;

/// Knobs for one synthetic sweep.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub name: String,
    pub seed: u64,

    pub temp_min_k: f64,
    pub temp_max_k: f64,
    pub temp_step_mk: f64,

    pub power_min_dbm: f64,
    pub power_max_dbm: f64,
    pub power_step_dbm: f64,

    /// Frequency points per sweep.
    pub n_points: usize,
    /// Noise sigma on I and Q (linear units).
    pub noise: f64,
    /// Probability of dropping a grid cell entirely.
    pub dropout: f64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            name: "RES-1".to_string(),
            seed: 42,
            temp_min_k: 0.100,
            temp_max_k: 0.350,
            temp_step_mk: 25.0,
            power_min_dbm: -50.0,
            power_max_dbm: -30.0,
            power_step_dbm: 10.0,
            n_points: 201,
            noise: 0.002,
            dropout: 0.1,
        }
    }
}

/// One generated file, not yet on disk.
#[derive(Debug, Clone)]
pub struct SampleFile {
    pub file_name: String,
    pub contents: String,
}

/// Base resonator the synthetic sweep is built around.
fn base_params() -> ResonanceParams {
    ResonanceParams {
        df: 500.0,
        f0: 5.0e9,
        qc: 30_000.0,
        qi: 150_000.0,
        gain0: 0.8,
        gain1: 0.02,
        gain2: 0.0,
        pgain0: 0.3,
        pgain1: -1.5,
    }
}

/// Generate the sweep's files.
pub fn generate_sample(spec: &SampleSpec) -> Result<Vec<SampleFile>, AppError> {
    if spec.name.is_empty() || spec.name.contains('_') {
        // Keep generated names unambiguous against the `_<power>_DBM_TEMP_` convention.
        return Err(AppError::input(
            "Sample resonator name must be non-empty and contain no underscores.",
        ));
    }
    if !(spec.temp_min_k > 0.0 && spec.temp_max_k >= spec.temp_min_k && spec.temp_step_mk > 0.0) {
        return Err(AppError::input("Invalid temperature range for sample generation."));
    }
    if !(spec.power_max_dbm >= spec.power_min_dbm && spec.power_step_dbm > 0.0) {
        return Err(AppError::input("Invalid power range for sample generation."));
    }
    if spec.n_points < 32 {
        return Err(AppError::input("Sample sweeps need at least 32 points."));
    }
    if !(0.0..1.0).contains(&spec.dropout) {
        return Err(AppError::input("Dropout must be in [0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = Normal::new(0.0, spec.noise.max(1e-12))
        .map_err(|e| AppError::input(format!("Noise distribution error: {e}")))?;
    // Settling jitter: the fridge never lands exactly on the setpoint.
    let jitter = Normal::new(0.0, 0.4e-3)
        .map_err(|e| AppError::input(format!("Jitter distribution error: {e}")))?;

    let base = base_params();

    let mut temps = Vec::new();
    let mut t = spec.temp_min_k;
    while t <= spec.temp_max_k + 1e-9 {
        temps.push(t);
        t += spec.temp_step_mk / 1000.0;
    }
    let mut powers = Vec::new();
    let mut p = spec.power_min_dbm;
    while p <= spec.power_max_dbm + 1e-9 {
        powers.push(p);
        p += spec.power_step_dbm;
    }

    let mut files = Vec::new();
    for &temp_set in &temps {
        for &power in &powers {
            // Draw per-cell randomness unconditionally so dropout does not
            // shift the stream for later cells.
            let jit = jitter.sample(&mut rng);
            let drop_roll: f64 = rng.gen_range(0.0..1.0);
            let params = params_at(&base, temp_set, power, spec);

            if drop_roll < spec.dropout {
                continue;
            }

            let temp = (temp_set + jit).max(1e-4);
            let file_name = format!("{}_{}_DBM_TEMP_{:.4}.S2P", spec.name, power, temp);
            let contents = render_file(&params, spec, temp, power, &mut rng, &noise);
            files.push(SampleFile {
                file_name,
                contents,
            });
        }
    }

    Ok(files)
}

/// Smooth, monotone parameter trends across the sweep.
fn params_at(base: &ResonanceParams, temp_k: f64, power_dbm: f64, spec: &SampleSpec) -> ResonanceParams {
    let t_frac = (temp_k - spec.temp_min_k) / (spec.temp_max_k - spec.temp_min_k).max(1e-9);
    let p_rel = power_dbm - spec.power_min_dbm;

    let mut p = *base;
    // Quasiparticle-style loss: qi falls by up to 4x over the range.
    p.qi = base.qi / (1.0 + 3.0 * t_frac);
    // Mild power dependence: higher drive saturates two-level-system loss.
    p.qi *= 1.0 + 0.01 * p_rel;
    // Kinetic-inductance pull: f0 shifts down ~40 linewidths over the range.
    p.f0 = base.f0 * (1.0 - 4.0e-5 * t_frac);
    p
}

fn render_file(
    params: &ResonanceParams,
    spec: &SampleSpec,
    temp_k: f64,
    power_dbm: f64,
    rng: &mut StdRng,
    noise: &Normal<f64>,
) -> String {
    let half = 10.0 * params.f0 / params.q0();
    let n = spec.n_points;
    let freqs: Vec<f64> = (0..n)
        .map(|i| params.f0 - half + 2.0 * half * i as f64 / (n as f64 - 1.0))
        .collect();
    let s21 = predict(params, &freqs);

    let mut out = String::with_capacity(n * 48);
    out.push_str(&format!(
        "! synthetic sweep: {} at {temp_k:.4} K, {power_dbm:.1} dBm\n",
        spec.name
    ));
    out.push_str("! columns: freq_hz I Q\n");
    for (f, s) in freqs.iter().zip(s21.iter()) {
        let i = s.re + noise.sample(rng);
        let q = s.im + noise.sample(rng);
        out.push_str(&format!("{f:.1} {i:.8e} {q:.8e}\n"));
    }
    out
}

/// Write generated files into a directory (created if missing).
pub fn write_sample_files(dir: &Path, files: &[SampleFile]) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", dir.display())))?;
    for f in files {
        let path = dir.join(&f.file_name);
        std::fs::write(&path, &f.contents)
            .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::agilent::parse_sweep;
    use crate::io::discover::parse_file_name;
    use std::io::Cursor;

    #[test]
    fn generation_is_deterministic_per_seed() {
        let spec = SampleSpec::default();
        let a = generate_sample(&spec).unwrap();
        let b = generate_sample(&spec).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].file_name, b[0].file_name);
        assert_eq!(a[0].contents, b[0].contents);

        let c = generate_sample(&SampleSpec {
            seed: 43,
            ..SampleSpec::default()
        })
        .unwrap();
        assert_ne!(a[0].contents, c[0].contents);
    }

    #[test]
    fn file_names_follow_the_convention() {
        let spec = SampleSpec {
            dropout: 0.0,
            ..SampleSpec::default()
        };
        let files = generate_sample(&spec).unwrap();
        // 11 temps x 3 powers with no dropout.
        assert_eq!(files.len(), 33);
        for f in &files {
            let (name, _, temp) = parse_file_name(&f.file_name).unwrap();
            assert_eq!(name, "RES-1");
            assert!(temp > 0.0);
        }
    }

    #[test]
    fn generated_contents_parse_back() {
        let spec = SampleSpec::default();
        let files = generate_sample(&spec).unwrap();
        let parsed = parse_sweep(Cursor::new(files[0].contents.as_str())).unwrap();
        assert_eq!(parsed.freq_hz.len(), spec.n_points);
        assert!(parsed.row_errors.is_empty());
    }

    #[test]
    fn dropout_thins_the_grid_without_reordering_survivors() {
        let full = generate_sample(&SampleSpec {
            dropout: 0.0,
            ..SampleSpec::default()
        })
        .unwrap();
        let thinned = generate_sample(&SampleSpec {
            dropout: 0.5,
            ..SampleSpec::default()
        })
        .unwrap();
        assert!(thinned.len() < full.len());
        assert!(!thinned.is_empty());
    }

    #[test]
    fn underscored_names_are_rejected() {
        let err = generate_sample(&SampleSpec {
            name: "RES_1".to_string(),
            ..SampleSpec::default()
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
