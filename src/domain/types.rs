//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// How sweep tables are indexed along the temperature axis.
///
/// Dilution-fridge sweeps repeat measurements at nominally identical
/// temperatures that differ by a fraction of a millikelvin. `Block` groups
/// them into fixed-width buckets ("itemp"); `Raw` keeps each reading distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Bucket temperatures to the configured width (default 5 mK).
    Block,
    /// Key by the exact reading (0.1 mK resolution).
    Raw,
}

/// A fitted parameter that can be pivoted into a sweep table.
///
/// The `*_mc` variants are Monte Carlo estimates and are only present when
/// the run was configured with `--mc > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    F0,
    Df,
    Qi,
    Qc,
    Q0,
    Gain0,
    Redchi,
    #[value(name = "f0_mc")]
    F0Mc,
    #[value(name = "df_mc")]
    DfMc,
    #[value(name = "qi_mc")]
    QiMc,
    #[value(name = "qc_mc")]
    QcMc,
}

impl ParamKind {
    /// Column/row label used in tables and exports.
    pub fn label(self) -> &'static str {
        match self {
            ParamKind::F0 => "f0",
            ParamKind::Df => "df",
            ParamKind::Qi => "qi",
            ParamKind::Qc => "qc",
            ParamKind::Q0 => "q0",
            ParamKind::Gain0 => "gain0",
            ParamKind::Redchi => "redchi",
            ParamKind::F0Mc => "f0_mc",
            ParamKind::DfMc => "df_mc",
            ParamKind::QiMc => "qi_mc",
            ParamKind::QcMc => "qc_mc",
        }
    }

    /// Whether this parameter comes from the Monte Carlo pass.
    pub fn is_mc(self) -> bool {
        matches!(
            self,
            ParamKind::F0Mc | ParamKind::DfMc | ParamKind::QiMc | ParamKind::QcMc
        )
    }

    /// Pull this parameter's value out of a finished fit.
    ///
    /// Returns `None` for `*_mc` kinds when the fit carries no Monte Carlo
    /// stats; the corresponding sweep cell stays unset.
    pub fn extract(self, fit: &ResonatorFit) -> Option<f64> {
        match self {
            ParamKind::F0 => Some(fit.params.f0),
            ParamKind::Df => Some(fit.params.df),
            ParamKind::Qi => Some(fit.params.qi),
            ParamKind::Qc => Some(fit.params.qc),
            ParamKind::Q0 => Some(fit.params.q0()),
            ParamKind::Gain0 => Some(fit.params.gain0),
            ParamKind::Redchi => Some(fit.quality.redchi),
            ParamKind::F0Mc => fit.mc.as_ref().map(|m| m.f0_mean),
            ParamKind::DfMc => fit.mc.as_ref().map(|m| m.df_mean),
            ParamKind::QiMc => fit.mc.as_ref().map(|m| m.qi_mean),
            ParamKind::QcMc => fit.mc.as_ref().map(|m| m.qc_mean),
        }
    }
}

/// Default set of parameters pivoted by `qsweep sweep`.
pub const DEFAULT_PARAMS: [ParamKind; 4] =
    [ParamKind::F0, ParamKind::Qi, ParamKind::Qc, ParamKind::Redchi];

/// One measured frequency sweep at a fixed temperature and power.
#[derive(Debug, Clone)]
pub struct ResonatorRecord {
    /// Resonator identifier (from the filename).
    pub name: String,
    /// Source file.
    pub path: PathBuf,
    /// Nominal stage temperature (K).
    pub temp_k: f64,
    /// Readout power (dBm).
    pub power_dbm: f64,
    /// Frequency axis (Hz), ascending.
    pub freq_hz: Vec<f64>,
    /// Complex forward transmission samples, one per frequency.
    pub s21: Vec<Complex64>,
}

impl ResonatorRecord {
    pub fn len(&self) -> usize {
        self.freq_hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freq_hz.is_empty()
    }
}

/// Parameters of the complex I/Q transmission model.
///
/// Free parameters of the fit, in the order the optimizer packs them:
/// `[df, f0, qc, qi, gain0, gain1, gain2, pgain0, pgain1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResonanceParams {
    /// Frequency shift between measured and fit resonance (Hz).
    pub df: f64,
    /// Resonant frequency (Hz).
    pub f0: f64,
    /// Coupling quality factor.
    pub qc: f64,
    /// Internal quality factor.
    pub qi: f64,
    /// Baseline gain polynomial (constant, linear, quadratic in fractional frequency).
    pub gain0: f64,
    pub gain1: f64,
    pub gain2: f64,
    /// Baseline phase offset (rad) and slope (rad per fractional frequency).
    pub pgain0: f64,
    pub pgain1: f64,
}

/// Number of free parameters in the fit vector.
pub const PARAM_LEN: usize = 9;

impl ResonanceParams {
    /// Total (loaded) quality factor: `1/q0 = 1/qi + 1/qc`.
    pub fn q0(&self) -> f64 {
        1.0 / (1.0 / self.qi + 1.0 / self.qc)
    }

    /// Pack into the optimizer's parameter vector.
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.df, self.f0, self.qc, self.qi, self.gain0, self.gain1, self.gain2, self.pgain0,
            self.pgain1,
        ]
    }

    /// Unpack from the optimizer's parameter vector.
    ///
    /// # Panics
    /// Panics if `v` does not have length `PARAM_LEN`. Callers own the packing.
    pub fn from_vec(v: &[f64]) -> Self {
        assert_eq!(v.len(), PARAM_LEN);
        Self {
            df: v[0],
            f0: v[1],
            qc: v[2],
            qi: v[3],
            gain0: v[4],
            gain1: v[5],
            gain2: v[6],
            pgain0: v[7],
            pgain1: v[8],
        }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FitQuality {
    /// Sum of squared residuals over stacked real/imaginary parts.
    pub sse: f64,
    /// `sse / (2n - p)` — reduced chi-squared with unit measurement sigma.
    pub redchi: f64,
    /// Number of frequency points used.
    pub n_points: usize,
    /// Levenberg–Marquardt iterations taken.
    pub iterations: usize,
    pub converged: bool,
}

/// Monte Carlo parameter estimates (residual bootstrap).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct McStats {
    pub samples: usize,
    pub f0_mean: f64,
    pub f0_err: f64,
    pub df_mean: f64,
    pub df_err: f64,
    pub qi_mean: f64,
    pub qi_err: f64,
    pub qc_mean: f64,
    pub qc_err: f64,
}

/// A fully fitted resonator record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResonatorFit {
    pub source: PathBuf,
    pub temp_k: f64,
    /// Temperature key along the sweep's row axis (mK, scaled per `IndexMode`).
    pub itemp_mk: i64,
    pub power_dbm: f64,
    pub params: ResonanceParams,
    pub quality: FitQuality,
    pub mc: Option<McStats>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub data_dir: PathBuf,
    pub name: String,

    pub index_mode: IndexMode,
    /// Temperature bucket width for `IndexMode::Block` (mK).
    pub bucket_mk: f64,

    pub temp_min_k: f64,
    pub temp_max_k: f64,
    pub power_min_dbm: f64,
    pub power_max_dbm: f64,

    /// Parameters to pivot into sweep tables.
    pub params: Vec<ParamKind>,

    pub max_iters: usize,
    /// Relative SSE-change convergence threshold.
    pub tol: f64,

    /// Monte Carlo samples per record (0 disables the pass).
    pub mc_samples: usize,
    pub mc_seed: u64,

    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_sweep: Option<PathBuf>,
    pub export_tables: Option<PathBuf>,
}
