use nalgebra::{DMatrix, DVector};

use crate::config::EofMethod;
use crate::constants::{ABSOLUTE_VARIANCE_EPSILON, RELATIVE_VARIANCE_EPSILON};
use crate::error::Result;
use crate::linalg::LinearAlgebra;

/// Leading EOF modes of a weighted, centred field
///
/// With eigenvalues λ (ddof = 1), for each retained mode k:
/// * `eofs[:, k]` has unit norm,
/// * `pcs[:, k] = xs * dual_eofs()[:, k]` has unit sample variance.
///
/// Modes with no variance (λ at or below tolerance) have zero `pcs` and
/// dual EOF columns.
#[derive(Debug, Clone)]
pub(crate) struct PrincipalComponentSet {
    pub eigenvalues: DVector<f64>,
    pub pcs: DMatrix<f64>,
    pub eofs: DMatrix<f64>,
}

impl PrincipalComponentSet {
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    /// EOFs scaled by `sqrt(λ)`: the covariance of the field with each PC
    pub fn scaled_eofs(&self) -> DMatrix<f64> {
        let mut scaled = self.eofs.clone();
        for (c, &lambda) in self.eigenvalues.iter().enumerate() {
            scaled.column_mut(c).scale_mut(lambda.sqrt());
        }
        scaled
    }

    /// EOFs divided by `sqrt(λ)`, zero for modes without variance
    pub fn dual_eofs(&self) -> DMatrix<f64> {
        let mut dual = self.eofs.clone();
        for (c, &lambda) in self.eigenvalues.iter().enumerate() {
            if lambda > 0.0 {
                dual.column_mut(c).scale_mut(1.0 / lambda.sqrt());
            } else {
                dual.column_mut(c).fill(0.0);
            }
        }
        dual
    }

    /// Number of retained modes carrying no variance
    pub fn degenerate_modes(&self) -> usize {
        self.pcs
            .column_iter()
            .filter(|c| c.iter().all(|v| *v == 0.0))
            .count()
    }
}

/// Indices that sort `values` descending; stable, so ties keep ascending index.
pub(crate) fn descending_order(values: &DVector<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| (-values[a]).total_cmp(&(-values[b])));
    order
}

fn variance_tolerance(largest: f64) -> f64 {
    (largest.abs() * RELATIVE_VARIANCE_EPSILON).max(ABSOLUTE_VARIANCE_EPSILON)
}

/// Compute the leading `k` EOFs of `xs` (T × N, already centred and weighted).
///
/// `k` must not exceed `min(T, N)`; the caller checks this.
pub(crate) fn weighted_eofs<L: LinearAlgebra + ?Sized>(
    xs: &DMatrix<f64>,
    k: usize,
    method: EofMethod,
    linalg: &L,
) -> Result<PrincipalComponentSet> {
    let (t, n) = xs.shape();
    let dof = (t - 1) as f64;

    let (eigenvalues, eofs) = match method {
        EofMethod::Svd => {
            log::debug!("EOFs via truncated SVD of {}x{} field", t, n);
            let svd = linalg.truncated_svd(xs, k)?;
            let eigenvalues = svd.singular_values.map(|s| s * s / dof);
            (eigenvalues, svd.v)
        }
        EofMethod::Covariance if n <= t => {
            log::debug!("EOFs via {}x{} covariance matrix", n, n);
            let cov = xs.tr_mul(xs) / dof;
            let eig = linalg.symmetric_eigen(&cov)?;
            let order: Vec<usize> = descending_order(&eig.values).into_iter().take(k).collect();
            let eigenvalues =
                DVector::from_iterator(k, order.iter().map(|&i| eig.values[i].max(0.0)));
            let eofs = DMatrix::from_fn(n, k, |r, c| eig.vectors[(r, order[c])]);
            (eigenvalues, eofs)
        }
        EofMethod::Covariance => {
            // More points than time steps: decompose the T x T Gram matrix and
            // map its eigenvectors back to space.
            log::debug!("EOFs via {}x{} Gram matrix", t, t);
            let gram = (xs * xs.transpose()) / dof;
            let eig = linalg.symmetric_eigen(&gram)?;
            let order: Vec<usize> = descending_order(&eig.values).into_iter().take(k).collect();
            let eigenvalues =
                DVector::from_iterator(k, order.iter().map(|&i| eig.values[i].max(0.0)));
            let tol = variance_tolerance(eigenvalues.iter().copied().fold(0.0, f64::max));

            let mut eofs = DMatrix::zeros(n, k);
            for (c, &i) in order.iter().enumerate() {
                let lambda = eigenvalues[c];
                if lambda > tol {
                    let spatial = xs.tr_mul(&eig.vectors.column(i)) / (dof * lambda).sqrt();
                    eofs.set_column(c, &spatial);
                }
            }
            (eigenvalues, eofs)
        }
    };

    let tol = variance_tolerance(eigenvalues.iter().copied().fold(0.0, f64::max));
    let eigenvalues = eigenvalues.map(|l| if l > tol { l } else { 0.0 });

    let mut set = PrincipalComponentSet {
        eigenvalues,
        pcs: DMatrix::zeros(t, k),
        eofs,
    };
    set.pcs = xs * set.dual_eofs();
    if set.degenerate_modes() > 0 {
        log::warn!(
            "{} of {} retained EOFs carry no variance",
            set.degenerate_modes(),
            set.len()
        );
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{NalgebraBackend, center_columns, sample_covariance};
    use approx::assert_abs_diff_eq;

    fn field(t: usize, n: usize) -> DMatrix<f64> {
        let x = DMatrix::from_fn(t, n, |i, j| {
            let ti = i as f64;
            let sj = j as f64;
            (0.3 * ti + 0.7 * sj).sin() + 0.5 * (0.05 * ti * (sj + 1.0)).cos() + 0.01 * sj * ti
        });
        center_columns(&x)
    }

    fn check_invariants(set: &PrincipalComponentSet, k: usize) {
        assert_eq!(set.len(), k);
        for w in set.eigenvalues.as_slice().windows(2) {
            assert!(w[0] >= w[1]);
        }
        let cov = sample_covariance(&set.pcs).unwrap();
        for a in 0..k {
            for b in 0..k {
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(cov[(a, b)], expected, epsilon = 1e-8);
            }
            assert_abs_diff_eq!(set.eofs.column(a).norm(), 1.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_covariance_path_more_times_than_points() {
        let xs = field(60, 8);
        let set = weighted_eofs(&xs, 4, EofMethod::Covariance, &NalgebraBackend).unwrap();
        check_invariants(&set, 4);
    }

    #[test]
    fn test_gram_path_more_points_than_times() {
        let xs = field(12, 40);
        let set = weighted_eofs(&xs, 5, EofMethod::Covariance, &NalgebraBackend).unwrap();
        check_invariants(&set, 5);
    }

    #[test]
    fn test_svd_and_covariance_agree() {
        for (t, n) in [(50, 10), (10, 30)] {
            let xs = field(t, n);
            let a = weighted_eofs(&xs, 3, EofMethod::Covariance, &NalgebraBackend).unwrap();
            let b = weighted_eofs(&xs, 3, EofMethod::Svd, &NalgebraBackend).unwrap();
            for c in 0..3 {
                assert_abs_diff_eq!(a.eigenvalues[c], b.eigenvalues[c], epsilon = 1e-8);
                // Same mode up to sign
                let dot = a.eofs.column(c).dot(&b.eofs.column(c));
                assert_abs_diff_eq!(dot.abs(), 1.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_eigenvalues_sum_to_total_variance() {
        let xs = field(40, 6);
        let set = weighted_eofs(&xs, 6, EofMethod::Covariance, &NalgebraBackend).unwrap();
        let total: f64 = sample_covariance(&xs).unwrap().trace();
        assert_abs_diff_eq!(set.eigenvalues.sum(), total, epsilon = 1e-8);
    }

    #[test]
    fn test_scaled_and_dual_eofs() {
        let xs = field(40, 6);
        let set = weighted_eofs(&xs, 3, EofMethod::Covariance, &NalgebraBackend).unwrap();
        for c in 0..3 {
            let root = set.eigenvalues[c].sqrt();
            assert_abs_diff_eq!(set.scaled_eofs().column(c).norm(), root, epsilon = 1e-8);
            assert_abs_diff_eq!(set.dual_eofs().column(c).norm(), 1.0 / root, epsilon = 1e-8);
        }
        // The scaled EOFs are the covariances of the field with the PCs
        let cross = xs.tr_mul(&set.pcs) / 39.0;
        let scaled = set.scaled_eofs();
        for (a, b) in cross.iter().zip(scaled.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_zero_field_gives_zero_pcs() {
        let xs = DMatrix::zeros(20, 5);
        for method in [EofMethod::Covariance, EofMethod::Svd] {
            let set = weighted_eofs(&xs, 3, method, &NalgebraBackend).unwrap();
            assert!(set.eigenvalues.iter().all(|v| *v == 0.0));
            assert!(set.pcs.iter().all(|v| *v == 0.0));
            assert!(set.dual_eofs().iter().all(|v| *v == 0.0));
            assert!(set.scaled_eofs().iter().all(|v| *v == 0.0));
            assert_eq!(set.degenerate_modes(), 3);
        }
    }

    #[test]
    fn test_descending_order_is_stable() {
        let values = DVector::from_vec(vec![1.0, 3.0, 1.0, 3.0, 2.0]);
        assert_eq!(descending_order(&values), vec![1, 3, 4, 0, 2]);
    }
}
