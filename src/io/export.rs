//! Export fit results to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one flat per-record file, plus one pivot CSV per parameter.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::ResonatorFit;
use crate::error::AppError;
use crate::sweep::{SweepTable, SweepTables, power_key_to_dbm, temp_key_to_k};

/// Write per-record fit results to a CSV file.
pub fn write_results_csv(path: &Path, fits: &[ResonatorFit]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create results CSV '{}': {e}", path.display())))?;

    writeln!(
        file,
        "source,temp_k,itemp_mk,power_dbm,f0,df,qc,qi,q0,gain0,redchi,iterations,converged,f0_mc,f0_err,qi_mc,qi_err,qc_mc,qc_err"
    )
    .map_err(|e| AppError::input(format!("Failed to write results CSV header: {e}")))?;

    for fit in fits {
        let p = &fit.params;
        let (f0_mc, f0_err, qi_mc, qi_err, qc_mc, qc_err) = match &fit.mc {
            Some(m) => (
                format!("{:.6}", m.f0_mean),
                format!("{:.6}", m.f0_err),
                format!("{:.6}", m.qi_mean),
                format!("{:.6}", m.qi_err),
                format!("{:.6}", m.qc_mean),
                format!("{:.6}", m.qc_err),
            ),
            None => Default::default(),
        };

        writeln!(
            file,
            "{},{:.6},{},{:.2},{:.6},{:.6},{:.6},{:.6},{:.6},{:.8},{:.6e},{},{},{},{},{},{},{},{}",
            fit.source.display(),
            fit.temp_k,
            fit.itemp_mk,
            fit.power_dbm,
            p.f0,
            p.df,
            p.qc,
            p.qi,
            p.q0(),
            p.gain0,
            fit.quality.redchi,
            fit.quality.iterations,
            fit.quality.converged,
            f0_mc,
            f0_err,
            qi_mc,
            qi_err,
            qc_mc,
            qc_err,
        )
        .map_err(|e| AppError::input(format!("Failed to write results CSV row: {e}")))?;
    }

    Ok(())
}

/// Write one pivot CSV per table, next to `base`.
///
/// For `base = out/sweep.csv` and an `f0` table, the file is
/// `out/sweep_f0.csv`: temperature rows, one column per power, empty cells
/// for unmeasured combinations.
pub fn write_tables_csv(base: &Path, tables: &SweepTables) -> Result<Vec<PathBuf>, AppError> {
    let mut written = Vec::with_capacity(tables.tables.len());
    for table in &tables.tables {
        let path = table_path(base, table.param.label());
        write_one_table(&path, table, tables)?;
        written.push(path);
    }
    Ok(written)
}

fn table_path(base: &Path, label: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sweep");
    let ext = base.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    base.with_file_name(format!("{stem}_{label}.{ext}"))
}

fn write_one_table(path: &Path, table: &SweepTable, tables: &SweepTables) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create table CSV '{}': {e}", path.display())))?;

    let mut header = String::from("temp_k");
    for &pk in &table.power_keys {
        header.push_str(&format!(",{:.2}", power_key_to_dbm(pk)));
    }
    writeln!(file, "{header}")
        .map_err(|e| AppError::input(format!("Failed to write table CSV header: {e}")))?;

    for row in 0..table.n_rows() {
        let mut line = format!("{:.4}", temp_key_to_k(table.temp_keys_mk[row], tables.index));
        for col in 0..table.n_cols() {
            match table.get(row, col) {
                Some(v) => line.push_str(&format!(",{v:.8}")),
                None => line.push(','),
            }
        }
        writeln!(file, "{line}")
            .map_err(|e| AppError::input(format!("Failed to write table CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_paths_carry_the_param_label() {
        let p = table_path(Path::new("out/sweep.csv"), "qi");
        assert_eq!(p, PathBuf::from("out/sweep_qi.csv"));

        let p = table_path(Path::new("tables"), "f0");
        assert_eq!(p, PathBuf::from("tables_f0.csv"));
    }
}
