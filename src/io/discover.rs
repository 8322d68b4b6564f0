//! Data file discovery.
//!
//! Instrument files follow the naming convention
//!
//! ```text
//! <NAME>_<POWER>_DBM_TEMP_<TEMP>.S2P      e.g. RES-1_-50_DBM_TEMP_0.113.S2P
//! ```
//!
//! where `<POWER>` is the readout power in dBm and `<TEMP>` the stage
//! temperature in K. A directory usually holds several resonators' files
//! side by side; discovery filters to one resonator name and reports files
//! that carry the `.s2p` extension but do not parse.
//!
//! Results are sorted by file name so every downstream step is deterministic.

use std::path::{Path, PathBuf};

use crate::error::AppError;

/// One data file matched to the requested resonator.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub name: String,
    pub power_dbm: f64,
    pub temp_k: f64,
}

/// Discovery output: matched files plus per-file skip notes.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub files: Vec<DiscoveredFile>,
    /// `.s2p` files whose names did not parse (path, reason).
    pub skipped: Vec<(PathBuf, String)>,
}

/// Scan `dir` for the resonator's data files.
pub fn discover_files(dir: &Path, name: &str) -> Result<Discovery, AppError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::input(format!("Failed to read directory '{}': {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| AppError::input(format!("Failed to read directory entry: {e}")))?;
        let path = entry.path();
        if path.is_file() && has_s2p_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            skipped.push((path.clone(), "Non-UTF-8 file name.".to_string()));
            continue;
        };

        match parse_file_name(file_name) {
            Ok(meta) => {
                // Files for other resonators in the same directory are simply
                // not ours; no note needed.
                if meta.0 == name {
                    files.push(DiscoveredFile {
                        path: path.clone(),
                        name: meta.0,
                        power_dbm: meta.1,
                        temp_k: meta.2,
                    });
                }
            }
            Err(reason) => skipped.push((path.clone(), reason)),
        }
    }

    Ok(Discovery { files, skipped })
}

fn has_s2p_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("s2p"))
}

/// Parse `<NAME>_<POWER>_DBM_TEMP_<TEMP>.S2P` into (name, power_dbm, temp_k).
pub fn parse_file_name(file_name: &str) -> Result<(String, f64, f64), String> {
    let stem = file_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(file_name);

    // The marker is written by the instrument software in upper case, but we
    // accept any case to survive hand-renamed files.
    let upper = stem.to_ascii_uppercase();
    let marker = "_DBM_TEMP_";
    let Some(pos) = upper.find(marker) else {
        return Err(format!("'{file_name}': missing `_DBM_TEMP_` marker."));
    };

    let left = &stem[..pos];
    let temp_str = &stem[pos + marker.len()..];

    let Some((name, power_str)) = left.rsplit_once('_') else {
        return Err(format!("'{file_name}': missing `_<power>` before the marker."));
    };
    if name.is_empty() {
        return Err(format!("'{file_name}': empty resonator name."));
    }

    let power_dbm: f64 = power_str
        .parse()
        .map_err(|_| format!("'{file_name}': invalid power '{power_str}'."))?;
    let temp_k: f64 = temp_str
        .parse()
        .map_err(|_| format!("'{file_name}': invalid temperature '{temp_str}'."))?;

    if !temp_k.is_finite() || temp_k < 0.0 {
        return Err(format!("'{file_name}': non-physical temperature {temp_k}."));
    }
    if !power_dbm.is_finite() {
        return Err(format!("'{file_name}': non-finite power."));
    }

    Ok((name.to_string(), power_dbm, temp_k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_file_name() {
        let (name, power, temp) = parse_file_name("RES-1_-50_DBM_TEMP_0.113.S2P").unwrap();
        assert_eq!(name, "RES-1");
        assert!((power - -50.0).abs() < 1e-12);
        assert!((temp - 0.113).abs() < 1e-12);
    }

    #[test]
    fn parses_names_containing_underscores() {
        let (name, power, temp) = parse_file_name("CHIP_A_RES2_-10.5_DBM_TEMP_1.25.s2p").unwrap();
        assert_eq!(name, "CHIP_A_RES2");
        assert!((power - -10.5).abs() < 1e-12);
        assert!((temp - 1.25).abs() < 1e-12);
    }

    #[test]
    fn rejects_files_without_marker() {
        assert!(parse_file_name("RES-1_sweep.S2P").is_err());
    }

    #[test]
    fn rejects_negative_temperature() {
        assert!(parse_file_name("RES-1_-50_DBM_TEMP_-0.1.S2P").is_err());
    }
}
