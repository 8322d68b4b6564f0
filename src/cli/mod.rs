//! Command-line parsing for the resonator sweep fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{IndexMode, ParamKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "qsweep", version, about = "Resonator Temperature/Power Sweep Fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one data file and print the fitted parameters.
    Fit(FitArgs),
    /// Fit a whole sweep directory, pivot the results, and optionally plot/export.
    Sweep(SweepArgs),
    /// Plot a parameter from a previously exported sweep JSON.
    Plot(PlotArgs),
    /// Generate a synthetic sweep directory for trying the tool out.
    Sample(SampleArgs),
}

/// Options for fitting a single file.
#[derive(Debug, Parser)]
pub struct FitArgs {
    /// Data file (`<NAME>_<POWER>_DBM_TEMP_<TEMP>.S2P`).
    pub file: PathBuf,

    /// Levenberg-Marquardt iteration cap.
    #[arg(long, default_value_t = 100)]
    pub max_iters: usize,

    /// Relative SSE-change convergence threshold.
    #[arg(long, default_value_t = 1e-10)]
    pub tol: f64,

    /// Monte Carlo samples for parameter uncertainties (0 disables).
    #[arg(long, default_value_t = 0)]
    pub mc: usize,

    /// Seed for the Monte Carlo pass.
    #[arg(long, default_value_t = 42)]
    pub mc_seed: u64,

    /// Render an ASCII magnitude plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for fitting a sweep directory.
#[derive(Debug, Parser, Clone)]
pub struct SweepArgs {
    /// Directory holding the sweep's data files.
    #[arg(short = 'd', long, default_value = ".")]
    pub dir: PathBuf,

    /// Resonator name to select (the `<NAME>` part of the file names).
    #[arg(short = 'n', long)]
    pub name: String,

    /// Temperature axis indexing.
    #[arg(long, value_enum, default_value_t = IndexMode::Block)]
    pub index: IndexMode,

    /// Temperature bucket width in mK (block indexing only).
    #[arg(long, default_value_t = 5.0)]
    pub bucket_mk: f64,

    /// Drop files below this stage temperature (K).
    #[arg(long, default_value_t = 0.0)]
    pub temp_min: f64,

    /// Drop files above this stage temperature (K).
    #[arg(long, default_value_t = f64::INFINITY)]
    pub temp_max: f64,

    /// Drop files below this readout power (dBm).
    #[arg(long, default_value_t = f64::NEG_INFINITY)]
    pub power_min: f64,

    /// Drop files above this readout power (dBm).
    #[arg(long, default_value_t = f64::INFINITY)]
    pub power_max: f64,

    /// Parameters to pivot into sweep tables (defaults to f0, qi, qc, redchi).
    #[arg(short = 'p', long, value_enum, value_delimiter = ',')]
    pub params: Vec<ParamKind>,

    /// Levenberg-Marquardt iteration cap per record.
    #[arg(long, default_value_t = 100)]
    pub max_iters: usize,

    /// Relative SSE-change convergence threshold.
    #[arg(long, default_value_t = 1e-10)]
    pub tol: f64,

    /// Monte Carlo samples per record (0 disables).
    #[arg(long, default_value_t = 0)]
    pub mc: usize,

    /// Seed for the Monte Carlo pass.
    #[arg(long, default_value_t = 42)]
    pub mc_seed: u64,

    /// Show the N worst fits by reduced chi-squared.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Render ASCII parameter plots in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-record results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the whole run (fits + tables) to JSON for `qsweep plot`.
    #[arg(long = "export-sweep")]
    pub export_sweep: Option<PathBuf>,

    /// Export one pivot CSV per parameter, derived from this base path.
    #[arg(long = "export-tables")]
    pub export_tables: Option<PathBuf>,
}

/// Options for plotting a saved sweep.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Sweep JSON file produced by `qsweep sweep --export-sweep`.
    #[arg(long, value_name = "JSON")]
    pub sweep: PathBuf,

    /// Parameter to plot (must be one of the pivoted parameters).
    #[arg(short = 'p', long, value_enum, default_value_t = ParamKind::Qi)]
    pub param: ParamKind,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for generating a synthetic sweep.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output directory (created if missing).
    #[arg(short = 'o', long, default_value = "sample-data")]
    pub out: PathBuf,

    /// Resonator name to embed in the file names.
    #[arg(short = 'n', long, default_value = "RES-1")]
    pub name: String,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Lowest stage temperature (K).
    #[arg(long, default_value_t = 0.100)]
    pub temp_min: f64,

    /// Highest stage temperature (K).
    #[arg(long, default_value_t = 0.350)]
    pub temp_max: f64,

    /// Temperature step (mK).
    #[arg(long, default_value_t = 25.0)]
    pub temp_step_mk: f64,

    /// Lowest readout power (dBm).
    #[arg(long, default_value_t = -50.0)]
    pub power_min: f64,

    /// Highest readout power (dBm).
    #[arg(long, default_value_t = -30.0)]
    pub power_max: f64,

    /// Power step (dBm).
    #[arg(long, default_value_t = 10.0)]
    pub power_step: f64,

    /// Frequency points per sweep.
    #[arg(long, default_value_t = 201)]
    pub points: usize,

    /// Gaussian noise sigma on I and Q.
    #[arg(long, default_value_t = 0.002)]
    pub noise: f64,

    /// Probability of dropping a grid cell (creates gaps).
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}
