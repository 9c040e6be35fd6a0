//! Delimited-text and JSON I/O for data matrices and results.
//!
//! Text matrices hold one row per line. Lines starting with `#` and blank lines
//! are skipped. A field reading `nan` (any case) or left empty is a missing
//! value and loads as NaN. A whitespace delimiter splits on runs of whitespace.

use std::fs;
use std::path::Path;

use chrono::Utc;
use nalgebra::DMatrix;
use serde::Serialize;

use crate::analysis::LowFrequencyResult;
use crate::config::LfcaConfig;
use crate::error::{LfcaError, Result};

fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    if delimiter.is_whitespace() {
        line.split_whitespace().collect()
    } else {
        line.split(delimiter).map(str::trim).collect()
    }
}

fn parse_field(field: &str, line_no: usize) -> Result<f64> {
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    field.parse::<f64>().map_err(|e| {
        LfcaError::InvalidInput(format!("line {}: cannot parse {:?}: {}", line_no, field, e))
    })
}

/// Parse a delimited-text matrix.
///
/// # Errors
/// Returns `LfcaError::InvalidInput` for unparsable fields, ragged rows or an
/// input with no data rows.
pub fn parse_matrix(text: &str, delimiter: char) -> Result<DMatrix<f64>> {
    let mut values = Vec::new();
    let mut ncols = None;
    let mut nrows = 0;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = idx + 1;
        let fields = split_fields(line, delimiter);
        match ncols {
            None => ncols = Some(fields.len()),
            Some(n) if n != fields.len() => {
                return Err(LfcaError::InvalidInput(format!(
                    "line {}: expected {} fields, found {}",
                    line_no,
                    n,
                    fields.len()
                )));
            }
            Some(_) => {}
        }
        for field in fields {
            values.push(parse_field(field, line_no)?);
        }
        nrows += 1;
    }

    let ncols = ncols.ok_or_else(|| LfcaError::InvalidInput("no data rows".to_string()))?;
    Ok(DMatrix::from_row_slice(nrows, ncols, &values))
}

/// Read a delimited-text matrix from a file.
pub fn read_matrix(path: impl AsRef<Path>, delimiter: char) -> Result<DMatrix<f64>> {
    let path = path.as_ref();
    log::debug!("Reading matrix from {}", path.display());
    let text = fs::read_to_string(path)?;
    let matrix = parse_matrix(&text, delimiter)?;
    log::debug!("Read {}x{} matrix", matrix.nrows(), matrix.ncols());
    Ok(matrix)
}

/// Read a vector stored as a single row or a single column.
///
/// # Errors
/// Returns `LfcaError::InvalidInput` if the file holds a matrix with more than
/// one row and more than one column.
pub fn read_vector(path: impl AsRef<Path>, delimiter: char) -> Result<Vec<f64>> {
    let matrix = read_matrix(path, delimiter)?;
    if matrix.nrows() > 1 && matrix.ncols() > 1 {
        return Err(LfcaError::InvalidInput(format!(
            "expected a vector, found a {}x{} matrix",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(matrix.iter().copied().collect())
}

/// Format a matrix as delimited text, one row per line.
pub fn format_matrix(matrix: &DMatrix<f64>, delimiter: char) -> String {
    let mut out = String::new();
    let sep = delimiter.to_string();
    for row in matrix.row_iter() {
        let fields: Vec<String> = row.iter().map(|v| format!("{}", v)).collect();
        out.push_str(&fields.join(&sep));
        out.push('\n');
    }
    out
}

/// Write a matrix as delimited text.
pub fn write_matrix(path: impl AsRef<Path>, matrix: &DMatrix<f64>, delimiter: char) -> Result<()> {
    let path = path.as_ref();
    log::debug!(
        "Writing {}x{} matrix to {}",
        matrix.nrows(),
        matrix.ncols(),
        path.display()
    );
    fs::write(path, format_matrix(matrix, delimiter))?;
    Ok(())
}

/// Serializable snapshot of one run
///
/// Series and patterns are stored per component. NaN entries, such as masked
/// grid points, serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct LfcaReport {
    pub generated_at: String,
    pub config: LfcaConfig,
    pub time_steps: usize,
    pub points: usize,
    pub ratios: Vec<f64>,
    pub eof_variances: Vec<f64>,
    pub lfcs: Vec<Vec<f64>>,
    pub lfps: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced: Option<Vec<Vec<f64>>>,
}

impl LfcaReport {
    /// Build a report from a result.
    ///
    /// `lfps` overrides the result's patterns, so callers that reinserted
    /// masked columns can pass the full-width matrix.
    pub fn new(
        config: &LfcaConfig,
        result: &LowFrequencyResult,
        lfps: Option<&DMatrix<f64>>,
        forced: Option<&DMatrix<f64>>,
    ) -> Self {
        let lfps = lfps.unwrap_or(&result.lfps);
        Self {
            generated_at: iso8601_timestamp(),
            config: config.clone(),
            time_steps: result.num_time_steps(),
            points: lfps.ncols(),
            ratios: result.ratios.clone(),
            eof_variances: result.eof_variances.clone(),
            lfcs: result
                .lfcs
                .column_iter()
                .map(|c| c.iter().copied().collect())
                .collect(),
            lfps: lfps
                .row_iter()
                .map(|r| r.iter().copied().collect())
                .collect(),
            forced: forced.map(|m| m.row_iter().map(|r| r.iter().copied().collect()).collect()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LfcaError::InvalidInput(format!("JSON serialization failed: {}", e)))
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
