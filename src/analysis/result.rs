use nalgebra::{DMatrix, DVectorView};
use serde::Serialize;

use crate::error::{LfcaError, Result};

/// Output of one LFCA invocation
///
/// Components are ordered by descending low-frequency variance ratio.
#[derive(Debug, Clone, Serialize)]
pub struct LowFrequencyResult {
    /// Low-frequency component series, one column per component (T × K)
    pub lfcs: DMatrix<f64>,
    /// Low-frequency patterns in physical units, one row per component (K × N)
    pub lfps: DMatrix<f64>,
    /// Low-frequency to total variance ratio of each component
    pub ratios: Vec<f64>,
    /// Variance of each retained EOF of the weighted field
    pub eof_variances: Vec<f64>,
    /// Per-column scale factor `sqrt(w / sum(w))`
    pub scale: Vec<f64>,
}

impl LowFrequencyResult {
    pub fn num_components(&self) -> usize {
        self.lfcs.ncols()
    }

    pub fn num_time_steps(&self) -> usize {
        self.lfcs.nrows()
    }

    pub fn num_points(&self) -> usize {
        self.lfps.ncols()
    }

    /// Component series `j`
    pub fn lfc(&self, j: usize) -> DVectorView<'_, f64> {
        self.lfcs.column(j)
    }

    /// Pattern `j` as a vector over spatial points
    pub fn lfp(&self, j: usize) -> Vec<f64> {
        self.lfps.row(j).iter().copied().collect()
    }

    /// Forced-response estimate from the chosen components
    ///
    /// Returns the T × N sum of `lfc(j) ⊗ lfp(j)` over `components`. The
    /// result is an anomaly field: the column means removed before analysis
    /// are not added back.
    ///
    /// # Errors
    /// Returns `LfcaError::InvalidParameter` for a component index out of range.
    pub fn forced_response(&self, components: &[usize]) -> Result<DMatrix<f64>> {
        let k = self.num_components();
        if let Some(&bad) = components.iter().find(|&&j| j >= k) {
            return Err(LfcaError::invalid_parameter(
                "component",
                bad,
                format!("only {} components were computed", k),
            ));
        }

        let lfcs = self.lfcs.select_columns(components);
        let lfps = self.lfps.select_rows(components);
        Ok(lfcs * lfps)
    }

    /// Forced-response estimate from the leading `n` components.
    pub fn leading_forced_response(&self, n: usize) -> Result<DMatrix<f64>> {
        let components: Vec<usize> = (0..n).collect();
        self.forced_response(&components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_result() -> LowFrequencyResult {
        LowFrequencyResult {
            lfcs: DMatrix::from_column_slice(3, 2, &[1.0, 0.0, -1.0, 0.5, -1.0, 0.5]),
            lfps: DMatrix::from_row_slice(2, 2, &[2.0, 4.0, 1.0, -1.0]),
            ratios: vec![0.9, 0.4],
            eof_variances: vec![3.0, 1.0],
            scale: vec![0.5_f64.sqrt(), 0.5_f64.sqrt()],
        }
    }

    #[test]
    fn test_accessors() {
        let result = sample_result();
        assert_eq!(result.num_components(), 2);
        assert_eq!(result.num_time_steps(), 3);
        assert_eq!(result.num_points(), 2);
        assert_eq!(result.lfp(1), vec![1.0, -1.0]);
        assert_eq!(result.lfc(0)[2], -1.0);
    }

    #[test]
    fn test_serializes_to_json() {
        let value = serde_json::to_value(sample_result()).unwrap();
        assert_eq!(value["ratios"], serde_json::json!([0.9, 0.4]));
        assert_eq!(value["eof_variances"][0], 3.0);
        assert!(value.get("lfcs").is_some());
        assert!(value.get("lfps").is_some());
        assert_eq!(value["scale"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_forced_response_single_component() {
        let result = sample_result();
        let forced = result.forced_response(&[0]).unwrap();
        assert_eq!(forced.shape(), (3, 2));
        assert_abs_diff_eq!(forced[(0, 0)], 2.0);
        assert_abs_diff_eq!(forced[(0, 1)], 4.0);
        assert_abs_diff_eq!(forced[(2, 1)], -4.0);
    }

    #[test]
    fn test_leading_forced_response_sums_components() {
        let result = sample_result();
        let both = result.leading_forced_response(2).unwrap();
        let first = result.forced_response(&[0]).unwrap();
        let second = result.forced_response(&[1]).unwrap();
        assert!((both - (first + second)).abs().max() < 1e-12);
    }

    #[test]
    fn test_forced_response_rejects_unknown_component() {
        let result = sample_result();
        assert!(matches!(
            result.forced_response(&[0, 2]),
            Err(LfcaError::InvalidParameter {
                name: "component",
                ..
            })
        ));
    }
}
