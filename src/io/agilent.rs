//! Instrument data file parsing.
//!
//! The VNA export format is ASCII with one sample per line:
//!
//! ```text
//! ! comment
//! # also a comment
//! <freq_hz>  <I>  <Q>
//! ```
//!
//! Design goals, in order:
//! - **Row-level tolerance**: a mangled line is recorded and skipped; only a
//!   file with too few usable rows is rejected.
//! - **Deterministic output**: rows are sorted by frequency after parsing
//!   (some instruments write segmented sweeps out of order).
//! - **Separation of concerns**: no fitting logic here.

use std::fs::File;
use std::io::{BufRead, BufReader};

use num_complex::Complex64;

use crate::domain::ResonatorRecord;
use crate::error::AppError;
use crate::fit::guess::MIN_POINTS;
use crate::io::discover::DiscoveredFile;

/// A line that failed to parse.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Parsed file contents before being wrapped into a record.
#[derive(Debug, Clone)]
pub struct ParsedSweep {
    pub freq_hz: Vec<f64>,
    pub s21: Vec<Complex64>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Parse `freq I Q` rows from any reader.
pub fn parse_sweep<R: BufRead>(reader: R) -> Result<ParsedSweep, AppError> {
    let mut rows: Vec<(f64, Complex64)> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| AppError::input(format!("Read error at line {line_no}: {e}")))?;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') || trimmed.starts_with('#') {
            continue;
        }
        rows_read += 1;

        match parse_row(trimmed) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError {
                line: line_no,
                message,
            }),
        }
    }

    rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let (freq_hz, s21) = rows.into_iter().unzip();
    Ok(ParsedSweep {
        freq_hz,
        s21,
        row_errors,
        rows_read,
    })
}

fn parse_row(line: &str) -> Result<(f64, Complex64), String> {
    let mut cols = line.split_whitespace();

    let freq: f64 = cols
        .next()
        .ok_or("Empty row.")?
        .parse()
        .map_err(|_| "Invalid frequency column.".to_string())?;
    let i: f64 = cols
        .next()
        .ok_or("Missing I column.")?
        .parse()
        .map_err(|_| "Invalid I column.".to_string())?;
    let q: f64 = cols
        .next()
        .ok_or("Missing Q column.")?
        .parse()
        .map_err(|_| "Invalid Q column.".to_string())?;

    if !(freq.is_finite() && i.is_finite() && q.is_finite()) {
        return Err("Non-finite value.".to_string());
    }
    if freq <= 0.0 {
        return Err("Non-positive frequency.".to_string());
    }

    Ok((freq, Complex64::new(i, q)))
}

/// Open a discovered file and turn it into a resonator record.
pub fn load_record(file: &DiscoveredFile) -> Result<ResonatorRecord, AppError> {
    let f = File::open(&file.path)
        .map_err(|e| AppError::input(format!("Failed to open '{}': {e}", file.path.display())))?;
    let parsed = parse_sweep(BufReader::new(f))
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", file.path.display())))?;

    if parsed.freq_hz.len() < MIN_POINTS {
        return Err(AppError::no_data(format!(
            "{}: only {} usable rows (need >= {MIN_POINTS}; {} rows failed to parse).",
            file.path.display(),
            parsed.freq_hz.len(),
            parsed.row_errors.len(),
        )));
    }

    Ok(ResonatorRecord {
        name: file.name.clone(),
        path: file.path.clone(),
        temp_k: file.temp_k,
        power_dbm: file.power_dbm,
        freq_hz: parsed.freq_hz,
        s21: parsed.s21,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_rows_and_skips_comments() {
        let text = "\
! Agilent export
# header line
5000000000 0.5 -0.1
5000010000 0.4 -0.2

5000020000 0.3 -0.3
";
        let parsed = parse_sweep(Cursor::new(text)).unwrap();
        assert_eq!(parsed.freq_hz.len(), 3);
        assert_eq!(parsed.rows_read, 3);
        assert!(parsed.row_errors.is_empty());
        assert_eq!(parsed.s21[0], Complex64::new(0.5, -0.1));
    }

    #[test]
    fn bad_rows_are_collected_not_fatal() {
        let text = "\
5000000000 0.5 -0.1
5000010000 not_a_number -0.2
5000020000 0.3
5000030000 0.3 -0.3
";
        let parsed = parse_sweep(Cursor::new(text)).unwrap();
        assert_eq!(parsed.freq_hz.len(), 2);
        assert_eq!(parsed.row_errors.len(), 2);
        assert_eq!(parsed.row_errors[0].line, 2);
    }

    #[test]
    fn rows_are_sorted_by_frequency() {
        let text = "\
5000020000 0.3 0.0
5000000000 0.5 0.0
5000010000 0.4 0.0
";
        let parsed = parse_sweep(Cursor::new(text)).unwrap();
        assert!(parsed.freq_hz.windows(2).all(|w| w[0] <= w[1]));
        // The s21 column moves with its frequency.
        assert_eq!(parsed.s21[0], Complex64::new(0.5, 0.0));
    }

    #[test]
    fn rejects_non_positive_frequency() {
        let parsed = parse_sweep(Cursor::new("0 0.1 0.1\n-5 0.1 0.1\n")).unwrap();
        assert!(parsed.freq_hz.is_empty());
        assert_eq!(parsed.row_errors.len(), 2);
    }
}
