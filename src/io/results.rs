//! Read/write sweep JSON files.
//!
//! Sweep JSON is the "portable" representation of a finished run:
//! - every fitted record (parameters + diagnostics + Monte Carlo stats)
//! - the pivot tables, ready for plotting without refitting
//!
//! `qsweep plot` consumes these files.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::ResonatorFit;
use crate::error::AppError;
use crate::sweep::SweepTables;

/// Schema of a sweep JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFile {
    pub tool: String,
    pub name: String,
    pub fits: Vec<ResonatorFit>,
    pub tables: SweepTables,
}

/// Write a sweep JSON file.
pub fn write_sweep_json(
    path: &Path,
    name: &str,
    fits: &[ResonatorFit],
    tables: &SweepTables,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create sweep JSON '{}': {e}", path.display())))?;

    let sweep = SweepFile {
        tool: "qsweep".to_string(),
        name: name.to_string(),
        fits: fits.to_vec(),
        tables: tables.clone(),
    };

    serde_json::to_writer_pretty(file, &sweep)
        .map_err(|e| AppError::input(format!("Failed to write sweep JSON: {e}")))?;

    Ok(())
}

/// Read a sweep JSON file.
pub fn read_sweep_json(path: &Path) -> Result<SweepFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open sweep JSON '{}': {e}", path.display())))?;
    let sweep: SweepFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid sweep JSON: {e}")))?;
    Ok(sweep)
}
