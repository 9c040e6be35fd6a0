use nalgebra::{DMatrix, DVector};

use crate::error::{LfcaError, Result};

/// Mean of each column.
pub fn column_means(x: &DMatrix<f64>) -> DVector<f64> {
    let rows = x.nrows().max(1) as f64;
    DVector::from_iterator(x.ncols(), x.column_iter().map(|c| c.sum() / rows))
}

/// Subtract each column's mean.
pub fn center_columns(x: &DMatrix<f64>) -> DMatrix<f64> {
    let means = column_means(x);
    let mut centered = x.clone();
    for (mut column, mean) in centered.column_iter_mut().zip(means.iter()) {
        column.add_scalar_mut(-mean);
    }
    centered
}

/// Sample covariance of the columns of `x` (rows are observations, ddof = 1).
///
/// # Errors
/// Returns `LfcaError::InvalidInput` with fewer than two observations.
pub fn sample_covariance(x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if x.nrows() < 2 {
        return Err(LfcaError::InvalidInput(format!(
            "covariance needs at least 2 observations, got {}",
            x.nrows()
        )));
    }
    let centered = center_columns(x);
    let mut cov = centered.tr_mul(&centered) / (x.nrows() - 1) as f64;
    // Force exact symmetry
    cov.fill_upper_triangle_with_lower_triangle();
    Ok(cov)
}
