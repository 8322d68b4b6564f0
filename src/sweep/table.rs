//! Temperature bucketing and (temperature × power) pivot tables.
//!
//! A sweep rarely covers its full grid: the example dataset this tool was
//! built around has 255 records against 725 possible (temperature × power)
//! combinations. The table therefore keeps the row/column axes as the union
//! of keys actually seen and leaves absent cells unset.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{IndexMode, ParamKind, ResonatorFit};

/// Resolution of the power axis key: 0.01 dBm.
const POWER_KEY_SCALE: f64 = 100.0;

/// Resolution of the `Raw` temperature key: 0.1 mK.
const RAW_TEMP_SCALE: f64 = 10.0;

/// Round a temperature reading to its bucket center ("itemp"), in mK.
///
/// `Block` rounds to the nearest multiple of `bucket_mk` (default 5 mK);
/// `Raw` keys at 0.1 mK so nominally repeated readings stay distinct.
pub fn temp_key_mk(temp_k: f64, mode: IndexMode, bucket_mk: f64) -> i64 {
    let mk = temp_k * 1000.0;
    match mode {
        IndexMode::Block => {
            let bucket = bucket_mk.max(1e-9);
            ((mk / bucket).round() * bucket).round() as i64
        }
        IndexMode::Raw => (mk * RAW_TEMP_SCALE).round() as i64,
    }
}

/// Convert a temperature key back to Kelvin for display.
pub fn temp_key_to_k(key: i64, mode: IndexMode) -> f64 {
    match mode {
        IndexMode::Block => key as f64 / 1000.0,
        IndexMode::Raw => key as f64 / (RAW_TEMP_SCALE * 1000.0),
    }
}

/// Integer key for a power value (0.01 dBm resolution).
pub fn power_key(power_dbm: f64) -> i64 {
    (power_dbm * POWER_KEY_SCALE).round() as i64
}

/// Convert a power key back to dBm for display.
pub fn power_key_to_dbm(key: i64) -> f64 {
    key as f64 / POWER_KEY_SCALE
}

/// One parameter pivoted over the sweep.
///
/// Rows are temperature keys (ascending), columns are power keys (ascending),
/// `values` is row-major with `None` for combinations never measured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepTable {
    pub param: ParamKind,
    pub temp_keys_mk: Vec<i64>,
    pub power_keys: Vec<i64>,
    pub values: Vec<Option<f64>>,
}

impl SweepTable {
    pub fn n_rows(&self) -> usize {
        self.temp_keys_mk.len()
    }

    pub fn n_cols(&self) -> usize {
        self.power_keys.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row * self.n_cols() + col).copied().flatten()
    }

    /// Number of populated cells.
    pub fn n_set(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// The column of values at one power, paired with row temperature keys.
    pub fn column(&self, col: usize) -> Vec<(i64, Option<f64>)> {
        (0..self.n_rows())
            .map(|row| (self.temp_keys_mk[row], self.get(row, col)))
            .collect()
    }
}

/// Result of pivoting a batch of fits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepTables {
    pub index: IndexMode,
    pub bucket_mk: f64,
    pub tables: Vec<SweepTable>,
    /// Records that landed on an already-occupied cell (later file wins).
    pub collisions: usize,
}

/// Pivot fitted records into one table per requested parameter.
///
/// The row/column axes are the union of keys across `fits`. When two records
/// map to the same cell, the one later in `fits` order wins; the caller keeps
/// `fits` in sorted file order so the outcome is deterministic.
pub fn build_tables(fits: &[ResonatorFit], params: &[ParamKind], index: IndexMode, bucket_mk: f64) -> SweepTables {
    let temp_keys: Vec<i64> = fits
        .iter()
        .map(|f| f.itemp_mk)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let power_keys: Vec<i64> = fits
        .iter()
        .map(|f| power_key(f.power_dbm))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let n_cols = power_keys.len();
    let mut collisions = 0usize;

    // Cell occupancy is shared across parameters, so count collisions once.
    let mut occupied = vec![false; temp_keys.len() * n_cols];
    for f in fits {
        // Keys were collected from these same fits, so the lookups cannot miss.
        let (Ok(row), Ok(col)) = (
            temp_keys.binary_search(&f.itemp_mk),
            power_keys.binary_search(&power_key(f.power_dbm)),
        ) else {
            continue;
        };
        let cell = row * n_cols + col;
        if occupied[cell] {
            collisions += 1;
        }
        occupied[cell] = true;
    }

    let tables = params
        .iter()
        .map(|&param| {
            let mut values = vec![None; temp_keys.len() * n_cols];
            for f in fits {
                let (Ok(row), Ok(col)) = (
                    temp_keys.binary_search(&f.itemp_mk),
                    power_keys.binary_search(&power_key(f.power_dbm)),
                ) else {
                    continue;
                };
                if let Some(v) = param.extract(f) {
                    values[row * n_cols + col] = Some(v);
                }
            }
            SweepTable {
                param,
                temp_keys_mk: temp_keys.clone(),
                power_keys: power_keys.clone(),
                values,
            }
        })
        .collect();

    SweepTables {
        index,
        bucket_mk,
        tables,
        collisions,
    }
}
