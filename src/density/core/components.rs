//! Mixture components — `(weights, locs, scales)` of a diagonal Gaussian
//! mixture evaluated at `n` conditioning rows.
//!
//! Purpose
//! -------
//! Carry the parameters a mixture model exposes for a batch of conditioning
//! inputs, and check the invariants the closed-form aggregator relies on.
//!
//! Key behaviors
//! -------------
//! - [`MixtureComponents::new`] checks that the three arrays agree on
//!   `(n, n_centers, ndim_y)`.
//! - [`MixtureComponents::validate`] checks per-row integrity: weights are
//!   finite, non-negative and sum to 1 within tolerance; scales (variances)
//!   are finite and strictly positive; locations are finite.
//!
//! Invariants & assumptions
//! ------------------------
//! - `weights`: `(n, n_centers)`, one categorical distribution per row.
//! - `locs`: `(n, n_centers, ndim_y)`, component means.
//! - `scales`: `(n, n_centers, ndim_y)`, per-dimension component *variances*
//!   (diagonal covariance per component).
//! - Violations are upstream data-integrity errors and are reported as
//!   [`DensityError::InvalidMixtureState`]; weights are never renormalized.
use crate::density::errors::{DensityError, DensityResult};
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};

/// MixtureComponents — batch of diagonal Gaussian mixture parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureComponents {
    /// Mixture weights, shape `(n, n_centers)`.
    pub weights: Array2<f64>,
    /// Component means, shape `(n, n_centers, ndim_y)`.
    pub locs: Array3<f64>,
    /// Component variances, shape `(n, n_centers, ndim_y)`.
    pub scales: Array3<f64>,
}

impl MixtureComponents {
    /// Bundle component arrays after checking that their shapes agree.
    ///
    /// # Errors
    /// [`DensityError::ShapeMismatch`] if `locs`/`scales` disagree with
    /// `weights` on `(n, n_centers)` or with each other on `ndim_y`.
    pub fn new(
        weights: Array2<f64>, locs: Array3<f64>, scales: Array3<f64>,
    ) -> DensityResult<MixtureComponents> {
        let (n, k) = weights.dim();
        let (ln, lk, ld) = locs.dim();
        let (sn, sk, sd) = scales.dim();
        if ln != n || sn != n {
            return Err(DensityError::ShapeMismatch {
                what: "mixture component rows",
                expected: n,
                actual: if ln != n { ln } else { sn },
            });
        }
        if lk != k || sk != k {
            return Err(DensityError::ShapeMismatch {
                what: "mixture n_centers",
                expected: k,
                actual: if lk != k { lk } else { sk },
            });
        }
        if sd != ld {
            return Err(DensityError::ShapeMismatch {
                what: "mixture ndim_y",
                expected: ld,
                actual: sd,
            });
        }
        Ok(MixtureComponents { weights, locs, scales })
    }

    /// Number of conditioning rows.
    pub fn n_rows(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of mixture components.
    pub fn n_centers(&self) -> usize {
        self.weights.ncols()
    }

    /// Target dimensionality.
    pub fn ndim_y(&self) -> usize {
        self.locs.len_of(Axis(2))
    }

    /// Weights of row `i`, shape `(n_centers,)`.
    pub fn row_weights(&self, i: usize) -> ArrayView1<'_, f64> {
        self.weights.row(i)
    }

    /// Means of row `i`, shape `(n_centers, ndim_y)`.
    pub fn row_locs(&self, i: usize) -> ArrayView2<'_, f64> {
        self.locs.index_axis(Axis(0), i)
    }

    /// Variances of row `i`, shape `(n_centers, ndim_y)`.
    pub fn row_scales(&self, i: usize) -> ArrayView2<'_, f64> {
        self.scales.index_axis(Axis(0), i)
    }

    /// Check per-row integrity of the components.
    ///
    /// # Errors
    /// [`DensityError::InvalidMixtureState`] on the first offending row.
    pub fn validate(&self, weight_tolerance: f64) -> DensityResult<()> {
        for (row, weights) in self.weights.outer_iter().enumerate() {
            let mut total = 0.0;
            for &w in weights.iter() {
                if !w.is_finite() || w < 0.0 {
                    return Err(DensityError::InvalidMixtureState {
                        row,
                        reason: "weights must be finite and >= 0",
                        value: w,
                    });
                }
                total += w;
            }
            if (total - 1.0).abs() > weight_tolerance {
                return Err(DensityError::InvalidMixtureState {
                    row,
                    reason: "weights must sum to 1",
                    value: total,
                });
            }
            if let Some(&loc) = self.row_locs(row).iter().find(|v| !v.is_finite()) {
                return Err(DensityError::InvalidMixtureState {
                    row,
                    reason: "component means must be finite",
                    value: loc,
                });
            }
            if let Some(&scale) = self.row_scales(row).iter().find(|v| !(v.is_finite() && **v > 0.0))
            {
                return Err(DensityError::InvalidMixtureState {
                    row,
                    reason: "component variances must be finite and > 0",
                    value: scale,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn one_row(weights: [f64; 2], scale: f64) -> MixtureComponents {
        let w = Array2::from_shape_vec((1, 2), weights.to_vec()).unwrap();
        let locs = Array3::from_shape_vec((1, 2, 1), vec![0.0, 1.0]).unwrap();
        let scales = Array3::from_shape_vec((1, 2, 1), vec![scale, 1.0]).unwrap();
        MixtureComponents::new(w, locs, scales).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Inconsistent `n_centers` across arrays is a shape error.
    //
    // Given
    // -----
    // - Weights with 2 centers, locations with 3.
    //
    // Expect
    // ------
    // - `ShapeMismatch` on `mixture n_centers`.
    fn new_rejects_center_mismatch() {
        let weights = array![[0.5, 0.5]];
        let locs = Array3::zeros((1, 3, 1));
        let scales = Array3::ones((1, 3, 1));

        let err = MixtureComponents::new(weights, locs, scales).unwrap_err();

        assert_eq!(
            err,
            DensityError::ShapeMismatch { what: "mixture n_centers", expected: 2, actual: 3 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Weight rows that do not sum to one are reported, not normalized.
    //
    // Given
    // -----
    // - Weights `[0.5, 0.6]`.
    //
    // Expect
    // ------
    // - `InvalidMixtureState` at row 0 carrying the observed sum 1.1.
    fn validate_rejects_unnormalized_weights() {
        let comps = one_row([0.5, 0.6], 1.0);

        match comps.validate(1e-6).unwrap_err() {
            DensityError::InvalidMixtureState { row, value, .. } => {
                assert_eq!(row, 0);
                assert!((value - 1.1).abs() < 1e-12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Zero variances are rejected and valid components pass.
    //
    // Given
    // -----
    // - One component with variance 0; then a valid pair.
    //
    // Expect
    // ------
    // - Error for the first, `Ok(())` for the second.
    fn validate_checks_variances() {
        assert!(one_row([0.3, 0.7], 0.0).validate(1e-6).is_err());
        assert!(one_row([0.3, 0.7], 0.5).validate(1e-6).is_ok());
    }
}
