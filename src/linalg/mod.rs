//! Linear algebra capability used by the LFCA engine
//!
//! The engine only needs two decompositions: a symmetric eigen-decomposition
//! and a truncated SVD. Both sit behind [`LinearAlgebra`] so the numeric
//! backend can be swapped or mocked; [`NalgebraBackend`] is the default.

pub mod nalgebra_backend;
pub mod stats;

use nalgebra::{DMatrix, DVector};

use crate::error::Result;

pub use nalgebra_backend::NalgebraBackend;
pub use stats::{center_columns, column_means, sample_covariance};

/// Eigen-decomposition of a real symmetric matrix
///
/// Eigenvalues are in ascending order; column `i` of `vectors` is the
/// unit-norm eigenvector of `values[i]`.
#[derive(Debug, Clone)]
pub struct SymmetricEigenDecomposition {
    pub values: DVector<f64>,
    pub vectors: DMatrix<f64>,
}

/// Leading `rank` singular triplets of an m × n matrix
///
/// `u` is m × rank, `v` is n × rank, singular values descending.
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    pub u: DMatrix<f64>,
    pub singular_values: DVector<f64>,
    pub v: DMatrix<f64>,
}

/// Decompositions required by the engine
pub trait LinearAlgebra: Send + Sync {
    /// Eigen-decomposition of a symmetric matrix, eigenvalues ascending.
    ///
    /// Only the lower triangle is guaranteed to be read.
    fn symmetric_eigen(&self, matrix: &DMatrix<f64>) -> Result<SymmetricEigenDecomposition>;

    /// Leading `rank` singular triplets, singular values descending.
    fn truncated_svd(&self, matrix: &DMatrix<f64>, rank: usize) -> Result<TruncatedSvd>;
}
