//! The sweep pipeline: discover -> parse -> fit -> pivot.
//!
//! Keeping this in one place avoids duplicating the core workflow between the
//! CLI front-end and tests. Front-ends then focus on presentation.

use crate::domain::{ResonatorRecord, SweepConfig};
use crate::error::AppError;
use crate::fit::fitter::{BatchOutcome, fit_collection};
use crate::io::agilent::load_record;
use crate::io::discover::{Discovery, discover_files};
use crate::sweep::{SweepTables, build_tables};

/// All computed outputs of a single `qsweep sweep` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Discovery result, with unparsable files folded into its skip notes.
    pub discovery: Discovery,
    /// Records that parsed and passed the temperature/power filters.
    pub n_parsed: usize,
    pub outcome: BatchOutcome,
    pub tables: SweepTables,
}

/// Execute the full sweep pipeline and return the computed outputs.
pub fn run_sweep(config: &SweepConfig) -> Result<RunOutput, AppError> {
    let mut discovery = discover_files(&config.data_dir, &config.name)?;

    if discovery.files.is_empty() {
        return Err(AppError::no_data(format!(
            "No data files for resonator '{}' in '{}'.",
            config.name,
            config.data_dir.display()
        )));
    }

    let mut records: Vec<ResonatorRecord> = Vec::with_capacity(discovery.files.len());
    for file in &discovery.files {
        if !in_range(file.temp_k, config.temp_min_k, config.temp_max_k)
            || !in_range(file.power_dbm, config.power_min_dbm, config.power_max_dbm)
        {
            continue;
        }
        // A file that refuses to parse is a note, not a fatal error; the rest
        // of the sweep is still worth fitting.
        match load_record(file) {
            Ok(record) => records.push(record),
            Err(e) => discovery.skipped.push((file.path.clone(), e.to_string())),
        }
    }

    if records.is_empty() {
        return Err(AppError::no_data(format!(
            "None of the {} matched files parsed (or all fell outside the temperature/power filters).",
            discovery.files.len()
        )));
    }
    let n_parsed = records.len();

    let outcome = fit_collection(&records, config);
    if outcome.fits.is_empty() {
        return Err(AppError::no_data(format!(
            "All {n_parsed} parsed records failed to fit."
        )));
    }

    let tables = build_tables(&outcome.fits, &config.params, config.index_mode, config.bucket_mk);

    Ok(RunOutput {
        discovery,
        n_parsed,
        outcome,
        tables,
    })
}

fn in_range(v: f64, lo: f64, hi: f64) -> bool {
    v >= lo && v <= hi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleSpec, generate_sample, write_sample_files};
    use crate::domain::{DEFAULT_PARAMS, IndexMode, ParamKind};
    use std::path::PathBuf;

    fn test_config(dir: PathBuf) -> SweepConfig {
        SweepConfig {
            data_dir: dir,
            name: "RES-1".to_string(),
            index_mode: IndexMode::Block,
            bucket_mk: 5.0,
            temp_min_k: 0.0,
            temp_max_k: f64::INFINITY,
            power_min_dbm: f64::NEG_INFINITY,
            power_max_dbm: f64::INFINITY,
            params: DEFAULT_PARAMS.to_vec(),
            max_iters: 100,
            tol: 1e-10,
            mc_samples: 0,
            mc_seed: 42,
            top_n: 5,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_sweep: None,
            export_tables: None,
        }
    }

    fn write_small_sample(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("qsweep-pipeline-{tag}-{}", std::process::id()));
        let files = generate_sample(&SampleSpec {
            temp_max_k: 0.150,
            power_max_dbm: -40.0,
            n_points: 101,
            noise: 1e-4,
            dropout: 0.0,
            ..SampleSpec::default()
        })
        .unwrap();
        write_sample_files(&dir, &files).unwrap();
        dir
    }

    #[test]
    fn end_to_end_sweep_over_generated_files() {
        let dir = write_small_sample("e2e");
        let config = test_config(dir.clone());

        let run = run_sweep(&config).unwrap();

        // 3 temps x 2 powers, no dropout.
        assert_eq!(run.discovery.files.len(), 6);
        assert_eq!(run.n_parsed, 6);
        assert_eq!(run.outcome.fits.len(), 6);
        assert!(run.outcome.failures.is_empty());

        let qi = run
            .tables
            .tables
            .iter()
            .find(|t| t.param == ParamKind::Qi)
            .unwrap();
        assert_eq!(qi.n_set(), 6);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn filters_cut_the_grid_down() {
        let dir = write_small_sample("filter");
        let mut config = test_config(dir.clone());
        config.power_min_dbm = -45.0;

        let run = run_sweep(&config).unwrap();
        // The -50 dBm column is filtered out before parsing.
        assert_eq!(run.n_parsed, 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_resonator_is_a_no_data_error() {
        let dir = write_small_sample("missing");
        let mut config = test_config(dir.clone());
        config.name = "RES-9".to_string();

        let err = run_sweep(&config).unwrap_err();
        assert_eq!(err.exit_code(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }
}
