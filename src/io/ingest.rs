//! CSV ingest for paired-column recordings.
//!
//! The recording table carries one `(time, IF)` column pair per cell:
//!
//! ```text
//! cell_a,IF,cell_b,IF
//! 0.05,118.2,0.04,131.0
//! 0.15,95.7,0.14,104.9
//! ,,0.05,     <- empty fields parse as NaN (train boundary markers)
//! ```
//!
//! Column order defines cell identity and pairing: even-indexed headers name
//! the cell, the following odd column holds its IF values. Design goals match
//! the rest of the pipeline:
//!
//! - **Strict schema** for the column layout (clear errors, exit code 2)
//! - **Deterministic behavior** (no hidden coercions beyond the NaN sentinel)
//! - **Separation of concerns**: no segmentation or fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::data::store::SampleStore;
use crate::domain::Sample;
use crate::error::AppError;

/// Load a recording CSV into a `SampleStore`.
pub fn load_recording(path: &Path) -> Result<SampleStore, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::schema(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;
    parse_recording(file)
}

/// Parse a recording from any reader (used directly by tests).
pub fn parse_recording<R: Read>(reader: R) -> Result<SampleStore, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| AppError::schema(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let n_columns = headers.len();
    if n_columns == 0 {
        return Err(AppError::schema("CSV has no columns."));
    }
    if n_columns % 2 != 0 {
        return Err(AppError::schema(format!(
            "Columns must come in (time, IF) pairs; got {n_columns} columns."
        )));
    }

    let cell_names: Vec<String> = headers
        .iter()
        .step_by(2)
        .map(normalize_header_name)
        .collect();

    for (idx, name) in cell_names.iter().enumerate() {
        if name.is_empty() {
            return Err(AppError::schema(format!(
                "Missing cell name in header column {}.",
                idx * 2 + 1
            )));
        }
    }

    let mut columns: Vec<Vec<Sample>> = vec![Vec::new(); cell_names.len()];

    for (idx, result) in csv_reader.records().enumerate() {
        // +2: records() starts after the header row and CSV lines are 1-based.
        let line = idx + 2;

        let record = result
            .map_err(|e| AppError::schema(format!("CSV parse error on line {line}: {e}")))?;

        if record.len() != n_columns {
            return Err(AppError::schema(format!(
                "Row on line {line} has {} fields, expected {n_columns}.",
                record.len()
            )));
        }

        for (cell_idx, samples) in columns.iter_mut().enumerate() {
            let time = parse_value(record.get(cell_idx * 2), line, cell_idx * 2 + 1)?;
            let freq = parse_value(record.get(cell_idx * 2 + 1), line, cell_idx * 2 + 2)?;
            samples.push(Sample::new(time, freq));
        }
    }

    SampleStore::new(cell_names.into_iter().zip(columns).collect())
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on
    // the first header. If we don't strip it, the first cell name is wrong.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Parse one field; empty and `nan` (any case) become the NaN sentinel.
fn parse_value(field: Option<&str>, line: usize, column: usize) -> Result<f64, AppError> {
    let Some(raw) = field else {
        return Ok(f64::NAN);
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| {
        AppError::schema(format!(
            "Invalid numeric value '{raw}' on line {line}, column {column}."
        ))
    })
}
