//! Mixture moments — closed-form mean, covariance, and CDF of diagonal
//! Gaussian mixtures.
//!
//! Purpose
//! -------
//! Turn validated [`MixtureComponents`] into per-row statistics without any
//! sampling: the mean is the weighted average of component means, the
//! covariance follows the law of total variance, and the CDF is the weighted
//! sum of component CDFs.
//!
//! Key behaviors
//! -------------
//! - [`MixtureAggregator::new`] validates the components once (weights sum to
//!   one within tolerance, variances positive); every statistic afterwards is
//!   infallible except the CDF, which builds `statrs` normals.
//! - `covariance = diag(Σ_k w_k σ²_k) + Σ_k w_k (μ_k − m)(μ_k − m)ᵀ`.
//! - `cdf(y) = Σ_k w_k Π_d Φ((y_d − μ_kd) / σ_kd)`; with diagonal components
//!   the multivariate normal CDF factorizes into univariate CDFs.
//!
//! Invariants & assumptions
//! ------------------------
//! - Components have diagonal covariance. Correlated components would need a
//!   full multivariate normal CDF and a full within-component covariance term;
//!   they are not representable in [`MixtureComponents`].
//! - Invalid upstream parameters surface as
//!   [`DensityError::InvalidMixtureState`], never silently normalized.
use crate::density::{
    core::components::MixtureComponents,
    errors::{DensityError, DensityResult},
};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use statrs::distribution::{ContinuousCDF, Normal};

/// MixtureAggregator — validated mixture components with closed-form
/// statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureAggregator {
    components: MixtureComponents,
}

impl MixtureAggregator {
    /// Validate `components` against `weight_tolerance`.
    ///
    /// # Errors
    /// [`DensityError::InvalidMixtureState`] on the first invalid row.
    pub fn new(components: MixtureComponents, weight_tolerance: f64) -> DensityResult<Self> {
        components.validate(weight_tolerance)?;
        Ok(MixtureAggregator { components })
    }

    pub fn components(&self) -> &MixtureComponents {
        &self.components
    }

    /// Mixture means, shape `(n, ndim_y)`.
    pub fn mean(&self) -> Array2<f64> {
        let c = &self.components;
        let mut means = Array2::zeros((c.n_rows(), c.ndim_y()));
        for (i, mut out) in means.outer_iter_mut().enumerate() {
            out.assign(&c.row_weights(i).dot(&c.row_locs(i)));
        }
        means
    }

    /// Mixture covariances, shape `(n, ndim_y, ndim_y)`.
    pub fn covariance(&self) -> Array3<f64> {
        let c = &self.components;
        let means = self.mean();
        let d = c.ndim_y();
        let mut covs = Array3::zeros((c.n_rows(), d, d));
        for (i, mut cov) in covs.outer_iter_mut().enumerate() {
            let w = c.row_weights(i);
            cov.diag_mut().assign(&w.dot(&c.row_scales(i)));
            for (&wk, loc) in w.iter().zip(c.row_locs(i).outer_iter()) {
                let a = &loc - &means.row(i);
                let a_col = a.view().insert_axis(Axis(1));
                cov.scaled_add(wk, &a_col.dot(&a_col.t()));
            }
        }
        covs
    }

    /// `P(Y ≤ y_i | x_i)` per row, `y` of shape `(n, ndim_y)`.
    ///
    /// # Errors
    /// - `ShapeMismatch` if `y` does not have shape `(n, ndim_y)`.
    /// - `InvalidDistribution` if a component normal cannot be built.
    pub fn cdf(&self, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        let c = &self.components;
        if y.nrows() != c.n_rows() {
            return Err(DensityError::ShapeMismatch {
                what: "Y rows vs mixture rows",
                expected: c.n_rows(),
                actual: y.nrows(),
            });
        }
        y.outer_iter().enumerate().map(|(i, yi)| self.row_cdf(i, yi)).collect()
    }

    /// `P(Y ≤ y | x_i)` for a single row `i`.
    ///
    /// # Errors
    /// - `ShapeMismatch` if `y.len() != ndim_y`.
    /// - `InvalidDistribution` if a component normal cannot be built.
    pub fn row_cdf(&self, i: usize, y: ArrayView1<f64>) -> DensityResult<f64> {
        let c = &self.components;
        if y.len() != c.ndim_y() {
            return Err(DensityError::ShapeMismatch {
                what: "Y columns",
                expected: c.ndim_y(),
                actual: y.len(),
            });
        }
        let mut p = 0.0;
        for ((&wk, loc), var) in
            c.row_weights(i).iter().zip(c.row_locs(i).outer_iter()).zip(c.row_scales(i).outer_iter())
        {
            let mut component = 1.0;
            for ((&yd, &mu), &v) in y.iter().zip(loc.iter()).zip(var.iter()) {
                component *= Normal::new(mu, v.sqrt())?.cdf(yd);
            }
            p += wk * component;
        }
        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::linalg::is_positive_semidefinite;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Hand-computed mean / covariance of a two-component, two-dimensional
    //   mixture (within- plus between-component terms).
    // - The single-component scenario (mean 2, variance 0.25, CDF(2) = 0.5).
    // - Weight validation at construction.
    //
    // They intentionally DO NOT cover:
    // - Agreement with Monte-Carlo draws; see the integration tests.
    // -------------------------------------------------------------------------

    fn components(
        weights: Array2<f64>, locs: Array3<f64>, scales: Array3<f64>,
    ) -> MixtureComponents {
        MixtureComponents::new(weights, locs, scales).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Closed-form moments equal the hand-computed law of total variance.
    //
    // Given
    // -----
    // - w = (0.25, 0.75), μ₁ = (0, 0), μ₂ = (2, 4),
    //   σ²₁ = (1, 2), σ²₂ = (3, 1).
    //
    // Expect
    // ------
    // - m = (1.5, 3).
    // - within = diag(2.5, 1.25); between = 0.25·(a₁a₁ᵀ) + 0.75·(a₂a₂ᵀ) with
    //   a₁ = (−1.5, −3), a₂ = (0.5, 1) ⇒ [[0.75, 1.5], [1.5, 3]].
    // - Cov = [[3.25, 1.5], [1.5, 4.25]], symmetric PSD.
    fn two_component_moments_match_hand_computation() {
        let comps = components(
            array![[0.25, 0.75]],
            Array3::from_shape_vec((1, 2, 2), vec![0.0, 0.0, 2.0, 4.0]).unwrap(),
            Array3::from_shape_vec((1, 2, 2), vec![1.0, 2.0, 3.0, 1.0]).unwrap(),
        );
        let agg = MixtureAggregator::new(comps, 1e-9).unwrap();

        let mean = agg.mean();
        let cov = agg.covariance();

        assert_relative_eq!(mean[[0, 0]], 1.5, epsilon = 1e-12);
        assert_relative_eq!(mean[[0, 1]], 3.0, epsilon = 1e-12);
        let expected = array![[3.25, 1.5], [1.5, 4.25]];
        for r in 0..2 {
            for c in 0..2 {
                assert_relative_eq!(cov[[0, r, c]], expected[[r, c]], epsilon = 1e-12);
            }
        }
        assert!(is_positive_semidefinite(cov.index_axis(Axis(0), 0), 1e-12));
    }

    #[test]
    // Purpose
    // -------
    // Single-component scenario.
    //
    // Given
    // -----
    // - w = [1.0], μ = [[2.0]], σ² = [[0.25]].
    //
    // Expect
    // ------
    // - mean 2.0, covariance [[0.25]], CDF at 2.0 equals 0.5.
    fn single_component_scenario() {
        let comps = components(
            array![[1.0]],
            Array3::from_elem((1, 1, 1), 2.0),
            Array3::from_elem((1, 1, 1), 0.25),
        );
        let agg = MixtureAggregator::new(comps, 1e-9).unwrap();

        let mean = agg.mean();
        let cov = agg.covariance();
        let p = agg.cdf(array![[2.0]].view()).unwrap();

        assert_relative_eq!(mean[[0, 0]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[[0, 0, 0]], 0.25, epsilon = 1e-12);
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The mixture CDF is the weighted sum of component CDFs.
    //
    // Given
    // -----
    // - w = (0.4, 0.6), μ = (−1, 1), σ² = (1, 4), evaluated at y = 0.
    //
    // Expect
    // ------
    // - 0.4 Φ(1) + 0.6 Φ(−0.5).
    fn cdf_is_weighted_sum_of_components() {
        let comps = components(
            array![[0.4, 0.6]],
            Array3::from_shape_vec((1, 2, 1), vec![-1.0, 1.0]).unwrap(),
            Array3::from_shape_vec((1, 2, 1), vec![1.0, 4.0]).unwrap(),
        );
        let agg = MixtureAggregator::new(comps, 1e-9).unwrap();
        let std_normal = Normal::new(0.0, 1.0).unwrap();
        let expected = 0.4 * std_normal.cdf(1.0) + 0.6 * std_normal.cdf(-0.5);

        let p = agg.row_cdf(0, array![0.0].view()).unwrap();

        assert_relative_eq!(p, expected, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Weights off by more than the tolerance are an integrity error.
    //
    // Given
    // -----
    // - Weights (0.5, 0.49), tolerance 1e-6.
    //
    // Expect
    // ------
    // - `InvalidMixtureState` at row 0.
    fn rejects_weights_outside_tolerance() {
        let comps = components(
            array![[0.5, 0.49]],
            Array3::zeros((1, 2, 1)),
            Array3::ones((1, 2, 1)),
        );

        let err = MixtureAggregator::new(comps, 1e-6).unwrap_err();

        assert!(matches!(err, DensityError::InvalidMixtureState { row: 0, .. }));
    }
}
