//! Small linear-algebra bridge between `ndarray` and `nalgebra`.
//!
//! Covariance estimates live in `ndarray` arrays; eigenvalue checks use
//! `nalgebra`'s symmetric eigen-decomposition. The copy is `O(d²)` and only
//! runs on `ndim_y × ndim_y` matrices.
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::ArrayView2;

/// Smallest eigenvalue of a symmetric matrix; `+inf` for an empty matrix.
///
/// Only the lower triangle is read, as `nalgebra::SymmetricEigen` does.
pub fn min_eigenvalue(a: ArrayView2<f64>) -> f64 {
    if a.is_empty() {
        return f64::INFINITY;
    }
    let m = fill_dmatrix(a);
    SymmetricEigen::new(m).eigenvalues.iter().copied().fold(f64::INFINITY, f64::min)
}

/// `true` when `a` is square, symmetric within `tol`, and has no eigenvalue
/// below `-tol`.
pub fn is_positive_semidefinite(a: ArrayView2<f64>, tol: f64) -> bool {
    let (n, k) = a.dim();
    if n != k {
        return false;
    }
    for i in 0..n {
        for j in 0..i {
            if (a[[i, j]] - a[[j, i]]).abs() > tol {
                return false;
            }
        }
    }
    min_eigenvalue(a) >= -tol
}

// ---- Helper methods ----

/// Copy a square `ndarray` matrix into a column-major `DMatrix`.
fn fill_dmatrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    let mut m = DMatrix::<f64>::zeros(n, n);
    for j in 0..n {
        for i in 0..n {
            m[(i, j)] = a[[i, j]];
        }
    }
    m
}
