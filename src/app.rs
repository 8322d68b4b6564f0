//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the discover/parse/fit/pivot pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs, SampleArgs, SweepArgs};
use crate::data::{SampleSpec, generate_sample, write_sample_files};
use crate::domain::{DEFAULT_PARAMS, IndexMode, ResonatorFit, SweepConfig};
use crate::error::AppError;
use crate::fit::fitter::fit_record;
use crate::fit::lm::LmOptions;
use crate::fit::mc;
use crate::io::agilent::load_record;
use crate::io::discover::{DiscoveredFile, parse_file_name};
use crate::sweep::temp_key_mk;

pub mod pipeline;

/// Entry point for the `qsweep` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Sweep(args) => handle_sweep(args),
        Command::Plot(args) => handle_plot(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let file_name = args
        .file
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AppError::input(format!("'{}': not a file path.", args.file.display())))?;
    let (name, power_dbm, temp_k) = parse_file_name(file_name).map_err(AppError::input)?;

    let file = DiscoveredFile {
        path: args.file.clone(),
        name,
        power_dbm,
        temp_k,
    };
    let record = load_record(&file)?;

    let opts = LmOptions {
        max_iters: args.max_iters,
        tol: args.tol,
    };
    let (params, quality) = fit_record(&record, &opts)?;
    let mc = if args.mc > 0 {
        mc::mc_stats(&record, &params, &quality, args.mc, args.mc_seed)
    } else {
        None
    };

    let fit = ResonatorFit {
        source: record.path.clone(),
        temp_k: record.temp_k,
        itemp_mk: temp_key_mk(record.temp_k, IndexMode::Block, 5.0),
        power_dbm: record.power_dbm,
        params,
        quality,
        mc,
    };
    println!("{}", crate::report::format_fit(&fit));

    if args.plot && !args.no_plot {
        let plot = crate::plot::render_magnitude_plot(
            &record.freq_hz,
            &record.s21,
            Some(&fit.params),
            args.width,
            args.height,
        );
        println!("{plot}");
    }

    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = sweep_config_from_args(&args);
    let run = pipeline::run_sweep(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&config, &run.discovery, run.n_parsed, &run.outcome, &run.tables)
    );
    println!("{}", crate::report::format_table_previews(&run.tables));

    if config.top_n > 0 {
        let worst = crate::report::rank_worst(&run.outcome.fits, config.top_n);
        println!("{}", crate::report::format_worst_fits(&worst));
    }

    if config.plot {
        for table in &run.tables.tables {
            let plot = crate::plot::render_param_plot(
                table,
                run.tables.index,
                config.plot_width,
                config.plot_height,
            );
            println!("{plot}");
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.outcome.fits)?;
        println!("Wrote results CSV: {}", path.display());
    }
    if let Some(path) = &config.export_tables {
        let written = crate::io::export::write_tables_csv(path, &run.tables)?;
        for p in written {
            println!("Wrote table CSV: {}", p.display());
        }
    }
    if let Some(path) = &config.export_sweep {
        crate::io::results::write_sweep_json(path, &config.name, &run.outcome.fits, &run.tables)?;
        println!("Wrote sweep JSON: {}", path.display());
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let sweep = crate::io::results::read_sweep_json(&args.sweep)?;

    let Some(table) = sweep.tables.tables.iter().find(|t| t.param == args.param) else {
        let available: Vec<&str> = sweep.tables.tables.iter().map(|t| t.param.label()).collect();
        return Err(AppError::input(format!(
            "'{}' was not pivoted in this sweep (available: {}).",
            args.param.label(),
            available.join(", ")
        )));
    };

    let plot = crate::plot::render_param_plot(table, sweep.tables.index, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let spec = SampleSpec {
        name: args.name,
        seed: args.seed,
        temp_min_k: args.temp_min,
        temp_max_k: args.temp_max,
        temp_step_mk: args.temp_step_mk,
        power_min_dbm: args.power_min,
        power_max_dbm: args.power_max,
        power_step_dbm: args.power_step,
        n_points: args.points,
        noise: args.noise,
        dropout: args.dropout,
    };

    let files = generate_sample(&spec)?;
    write_sample_files(&args.out, &files)?;
    println!(
        "Wrote {} synthetic files for '{}' to {}",
        files.len(),
        spec.name,
        args.out.display()
    );
    Ok(())
}

pub fn sweep_config_from_args(args: &SweepArgs) -> SweepConfig {
    let params = if args.params.is_empty() {
        DEFAULT_PARAMS.to_vec()
    } else {
        args.params.clone()
    };

    SweepConfig {
        data_dir: args.dir.clone(),
        name: args.name.clone(),
        index_mode: args.index,
        bucket_mk: args.bucket_mk,
        temp_min_k: args.temp_min,
        temp_max_k: args.temp_max,
        power_min_dbm: args.power_min,
        power_max_dbm: args.power_max,
        params,
        max_iters: args.max_iters,
        tol: args.tol,
        mc_samples: args.mc,
        mc_seed: args.mc_seed,
        top_n: args.top,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_sweep: args.export_sweep.clone(),
        export_tables: args.export_tables.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParamKind;
    use clap::Parser;

    #[test]
    fn sweep_args_map_onto_the_config() {
        let cli = crate::cli::Cli::parse_from([
            "qsweep", "sweep", "-d", "/data", "-n", "RES-1", "--index", "raw", "--mc", "25",
            "--no-plot", "-p", "qi,redchi",
        ]);
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep subcommand");
        };
        let config = sweep_config_from_args(&args);

        assert_eq!(config.name, "RES-1");
        assert_eq!(config.index_mode, IndexMode::Raw);
        assert_eq!(config.mc_samples, 25);
        assert!(!config.plot);
        assert_eq!(config.params, vec![ParamKind::Qi, ParamKind::Redchi]);
    }

    #[test]
    fn default_params_fill_in_when_none_given() {
        let cli = crate::cli::Cli::parse_from(["qsweep", "sweep", "-n", "RES-1"]);
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep subcommand");
        };
        let config = sweep_config_from_args(&args);
        assert_eq!(config.params, DEFAULT_PARAMS.to_vec());
    }
}
