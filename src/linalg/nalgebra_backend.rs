use nalgebra::{DMatrix, DVector, SVD, SymmetricEigen};

use crate::constants::{SOLVER_EPSILON, SOLVER_MAX_ITERATIONS};
use crate::error::{LfcaError, Result};
use crate::linalg::{LinearAlgebra, SymmetricEigenDecomposition, TruncatedSvd};

/// Dense decompositions backed by `nalgebra`
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraBackend;

/// Gather `order`'s columns of `m` into a new matrix.
fn select_columns(m: &DMatrix<f64>, order: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), order.len(), |r, c| m[(r, order[c])])
}

impl LinearAlgebra for NalgebraBackend {
    fn symmetric_eigen(&self, matrix: &DMatrix<f64>) -> Result<SymmetricEigenDecomposition> {
        if !matrix.is_square() {
            return Err(LfcaError::InvalidInput(format!(
                "eigen-decomposition needs a square matrix, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if matrix.is_empty() {
            return Ok(SymmetricEigenDecomposition {
                values: DVector::zeros(0),
                vectors: DMatrix::zeros(0, 0),
            });
        }

        let eigen = SymmetricEigen::try_new(matrix.clone(), SOLVER_EPSILON, SOLVER_MAX_ITERATIONS)
            .ok_or_else(|| {
                LfcaError::NumericFailure(format!(
                    "symmetric eigen-decomposition of a {}x{} matrix did not converge",
                    matrix.nrows(),
                    matrix.ncols()
                ))
            })?;

        // Ascending; stable so equal eigenvalues keep the solver's order
        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let values = order.iter().map(|&i| eigen.eigenvalues[i]);
        Ok(SymmetricEigenDecomposition {
            values: DVector::from_iterator(order.len(), values),
            vectors: select_columns(&eigen.eigenvectors, &order),
        })
    }

    fn truncated_svd(&self, matrix: &DMatrix<f64>, rank: usize) -> Result<TruncatedSvd> {
        let max_rank = matrix.nrows().min(matrix.ncols());
        if rank > max_rank {
            return Err(LfcaError::invalid_parameter(
                "rank",
                rank,
                format!(
                    "exceeds min dimension {} of a {}x{} matrix",
                    max_rank,
                    matrix.nrows(),
                    matrix.ncols()
                ),
            ));
        }

        let svd = SVD::try_new(
            matrix.clone(),
            true,
            true,
            SOLVER_EPSILON,
            SOLVER_MAX_ITERATIONS,
        )
        .ok_or_else(|| {
            LfcaError::NumericFailure(format!(
                "SVD of a {}x{} matrix did not converge",
                matrix.nrows(),
                matrix.ncols()
            ))
        })?;

        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                return Err(LfcaError::NumericFailure(
                    "SVD did not produce singular vectors".to_string(),
                ));
            }
        };

        let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));
        order.truncate(rank);

        let v = v_t.transpose();
        Ok(TruncatedSvd {
            u: select_columns(&u, &order),
            singular_values: DVector::from_iterator(
                rank,
                order.iter().map(|&i| svd.singular_values[i]),
            ),
            v: select_columns(&v, &order),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_symmetric_eigen_ascending() {
        let m = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 1.0]);
        let eig = NalgebraBackend.symmetric_eigen(&m).unwrap();
        assert_abs_diff_eq!(eig.values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.values[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eig.values[2], 5.0, epsilon = 1e-12);
        // Eigenvector of 5.0 is the second axis
        assert_abs_diff_eq!(eig.vectors[(1, 2)].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_eigen_reconstructs_matrix() {
        let m = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 1.0]);
        let eig = NalgebraBackend.symmetric_eigen(&m).unwrap();
        let rebuilt =
            &eig.vectors * DMatrix::from_diagonal(&eig.values) * eig.vectors.transpose();
        assert!((rebuilt - &m).abs().max() < 1e-10);

        let gram = eig.vectors.tr_mul(&eig.vectors);
        assert!((gram - DMatrix::identity(3, 3)).abs().max() < 1e-10);
    }

    #[test]
    fn test_symmetric_eigen_zero_matrix() {
        let eig = NalgebraBackend.symmetric_eigen(&DMatrix::zeros(4, 4)).unwrap();
        assert!(eig.values.iter().all(|v| *v == 0.0));
        let gram = eig.vectors.tr_mul(&eig.vectors);
        assert!((gram - DMatrix::identity(4, 4)).abs().max() < 1e-12);
    }

    #[test]
    fn test_symmetric_eigen_rejects_non_square() {
        assert!(matches!(
            NalgebraBackend.symmetric_eigen(&DMatrix::zeros(2, 3)),
            Err(LfcaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_truncated_svd_leading_triplets() {
        let m = DMatrix::from_row_slice(
            4,
            3,
            &[3.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0],
        );
        let svd = NalgebraBackend.truncated_svd(&m, 2).unwrap();
        assert_eq!(svd.u.shape(), (4, 2));
        assert_eq!(svd.v.shape(), (3, 2));
        assert_abs_diff_eq!(svd.singular_values[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(svd.singular_values[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(svd.v[(0, 0)].abs(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(svd.v[(2, 1)].abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_truncated_svd_rank_too_large() {
        assert!(matches!(
            NalgebraBackend.truncated_svd(&DMatrix::zeros(5, 2), 3),
            Err(LfcaError::InvalidParameter { name: "rank", .. })
        ));
    }
}
