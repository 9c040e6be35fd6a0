use nalgebra::{DMatrix, DVector};

/// Fix the sign of each component so its weighted pattern projects
/// non-negatively onto the scale vector.
///
/// `patterns` holds weighted-space patterns as columns (N × K) and
/// `components` the matching series as columns (T × K). A column pair is
/// negated together, so their product is unchanged.
pub fn apply_sign_convention(
    patterns: &mut DMatrix<f64>,
    components: &mut DMatrix<f64>,
    scale: &DVector<f64>,
) {
    for j in 0..patterns.ncols() {
        if patterns.column(j).dot(scale) < 0.0 {
            patterns.column_mut(j).neg_mut();
            components.column_mut(j).neg_mut();
        }
    }
}

/// Return weighted-space patterns (N × K columns) to physical units as rows (K × N).
///
/// Each entry is divided by the column's scale factor. A zero-weight column has
/// no weighted-space value to rescale, so its entry is the regression
/// coefficient of the centred data column onto the component series,
/// `centered[:, i] · components[:, j] / (T - 1)`, which is what the division
/// yields for every weighted column.
pub fn unweight_patterns(
    patterns: &DMatrix<f64>,
    scale: &DVector<f64>,
    centered: &DMatrix<f64>,
    components: &DMatrix<f64>,
) -> DMatrix<f64> {
    let (n, k) = patterns.shape();
    let dof = (centered.nrows().max(2) - 1) as f64;

    let mut out = DMatrix::zeros(k, n);
    for i in 0..n {
        let s = scale[i];
        for j in 0..k {
            out[(j, i)] = if s > 0.0 {
                patterns[(i, j)] / s
            } else {
                centered.column(i).dot(&components.column(j)) / dof
            };
        }
    }
    out
}
