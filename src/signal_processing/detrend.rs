use nalgebra::{DMatrix, DVector, SVD};

use crate::constants::SOLVER_EPSILON;
use crate::error::{LfcaError, Result};

/// Least-squares polynomial trend against the time index
///
/// The index is centred and scaled to roughly [-1, 1] before fitting so that
/// high degrees on long series stay well conditioned. The fitted trend can be
/// evaluated at any integer index, including indices outside the fitted
/// range, which is how the trend is re-added over a padded series.
#[derive(Debug, Clone)]
pub struct PolynomialTrend {
    coefficients: Vec<f64>,
    center: f64,
    half_span: f64,
}

impl PolynomialTrend {
    /// Fit a polynomial of `degree` to `series` sampled at indices `0..len`.
    ///
    /// # Errors
    /// Returns `LfcaError::InvalidInput` for an empty series and
    /// `LfcaError::InvalidParameter` when `degree` is not smaller than the
    /// series length.
    pub fn fit(series: &[f64], degree: usize) -> Result<Self> {
        let len = series.len();
        if len == 0 {
            return Err(LfcaError::InvalidInput(
                "cannot fit a trend to an empty series".to_string(),
            ));
        }
        if degree >= len {
            return Err(LfcaError::invalid_parameter(
                "detrend_degree",
                degree,
                format!("degree must be less than the series length {}", len),
            ));
        }

        let center = (len - 1) as f64 / 2.0;
        let half_span = center.max(1.0);

        let vandermonde = DMatrix::from_fn(len, degree + 1, |i, p| {
            ((i as f64 - center) / half_span).powi(p as i32)
        });
        let rhs = DVector::from_column_slice(series);

        let svd = SVD::new(vandermonde, true, true);
        let solution = svd
            .solve(&rhs, SOLVER_EPSILON)
            .map_err(|e| LfcaError::NumericFailure(format!("polynomial fit: {}", e)))?;

        Ok(Self {
            coefficients: solution.iter().copied().collect(),
            center,
            half_span,
        })
    }

    /// Evaluate the trend at a (possibly negative) time index.
    pub fn evaluate(&self, index: isize) -> f64 {
        let u = (index as f64 - self.center) / self.half_span;
        // Horner
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * u + c)
    }

    /// Evaluate the trend over `start..end`.
    pub fn evaluate_range(&self, start: isize, end: isize) -> Vec<f64> {
        (start..end).map(|i| self.evaluate(i)).collect()
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }
}

/// Subtract a fitted polynomial trend, returning the residual and the fit.
pub fn detrend(series: &[f64], degree: usize) -> Result<(Vec<f64>, PolynomialTrend)> {
    let trend = PolynomialTrend::fit(series, degree)?;
    let residual = series
        .iter()
        .enumerate()
        .map(|(i, &x)| x - trend.evaluate(i as isize))
        .collect();
    Ok((residual, trend))
}
