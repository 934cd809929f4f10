//! Gaussian mixture density with fixed, diagonal-covariance components.
//!
//! Purpose
//! -------
//! Provide a concrete mixture model exposing `mixture_components`, `pdf`,
//! `log_pdf`, and `sample`, so the closed-form aggregator can be cross-checked
//! against the integration and Monte-Carlo strategies on the same
//! distribution.
//!
//! Key behaviors
//! -------------
//! - Component parameters do not depend on `x`; every conditioning row maps
//!   to the same `(weights, locs, scales)`.
//! - [`GaussianMixtureDensity::fit`] runs the dimensionality guard on the
//!   fitting path, records `(ndim_x, ndim_y)`, and opens the fitted gate. No
//!   parameters are estimated.
//! - `log_pdf` uses a log-sum-exp over components.
//!
//! Invariants & assumptions
//! ------------------------
//! - `weights` sum to 1 within [`DEFAULT_WEIGHT_TOLERANCE`], `scales` are
//!   per-dimension variances > 0; both are checked at construction.
//! - Full (non-diagonal) component covariances are not representable.
use crate::density::{
    core::{
        capabilities::Capabilities,
        components::MixtureComponents,
        options::DEFAULT_WEIGHT_TOLERANCE,
        shape::{DensityShape, handle_input_dimensionality},
    },
    errors::{DensityError, DensityResult},
    model::ConditionalDensity,
};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayViewD, Axis};
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal, WeightedIndex};
use statrs::distribution::{Continuous, Normal};

/// Diagonal Gaussian mixture with `n_centers` components in `ndim_y`
/// dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMixtureDensity {
    weights: Array1<f64>,
    locs: Array2<f64>,
    scales: Array2<f64>,
    shape: Option<DensityShape>,
}

impl GaussianMixtureDensity {
    /// Construct an unfitted mixture.
    ///
    /// Parameters
    /// ----------
    /// - `weights`: `(n_centers,)`, non-negative, summing to 1.
    /// - `locs`: `(n_centers, ndim_y)` component means.
    /// - `scales`: `(n_centers, ndim_y)` component variances, > 0.
    ///
    /// Errors
    /// ------
    /// - `ShapeMismatch` if the arrays disagree on `n_centers` or `ndim_y`,
    ///   or `ndim_y == 0`.
    /// - `InvalidMixtureState` if the weights or variances are invalid.
    pub fn new(
        weights: Array1<f64>, locs: Array2<f64>, scales: Array2<f64>,
    ) -> DensityResult<GaussianMixtureDensity> {
        if locs.ncols() == 0 {
            return Err(DensityError::ShapeMismatch { what: "ndim_y (>= 1)", expected: 1, actual: 0 });
        }
        let components = MixtureComponents::new(
            weights.clone().insert_axis(Axis(0)),
            locs.clone().insert_axis(Axis(0)),
            scales.clone().insert_axis(Axis(0)),
        )?;
        components.validate(DEFAULT_WEIGHT_TOLERANCE)?;
        Ok(GaussianMixtureDensity { weights, locs, scales, shape: None })
    }

    /// Record the data dimensionality and open the fitted gate.
    ///
    /// # Errors
    /// - `ShapeMismatch` if `X`/`Y` row counts differ or `Y` does not have
    ///   `ndim_y` columns.
    pub fn fit<'a>(&mut self, x: ArrayViewD<'a, f64>, y: ArrayViewD<'a, f64>) -> DensityResult<()> {
        let (_, _, shape) = handle_input_dimensionality(None, x, Some(y), true)?;
        if shape.ndim_y != self.locs.ncols() {
            return Err(DensityError::ShapeMismatch {
                what: "Y columns",
                expected: self.locs.ncols(),
                actual: shape.ndim_y,
            });
        }
        self.shape = Some(shape);
        Ok(())
    }

    /// Builder-style shortcut: fitted mixture conditioned on `ndim_x` columns.
    ///
    /// # Errors
    /// `ShapeMismatch` if `ndim_x == 0`.
    pub fn fitted_with(mut self, ndim_x: usize) -> DensityResult<GaussianMixtureDensity> {
        self.shape = Some(DensityShape::new(ndim_x, self.locs.ncols())?);
        Ok(self)
    }

    /// Number of mixture components.
    pub fn n_centers(&self) -> usize {
        self.weights.len()
    }

    fn normals(&self) -> DensityResult<Vec<Vec<Normal>>> {
        self.locs
            .outer_iter()
            .zip(self.scales.outer_iter())
            .map(|(mu, var)| {
                mu.iter()
                    .zip(var.iter())
                    .map(|(&m, &v)| Normal::new(m, v.sqrt()).map_err(DensityError::from))
                    .collect()
            })
            .collect()
    }

    fn component_log_densities(normals: &[Vec<Normal>], y: ArrayView1<f64>) -> Vec<f64> {
        normals
            .iter()
            .map(|dims| dims.iter().zip(y.iter()).map(|(n, &yd)| n.ln_pdf(yd)).sum())
            .collect()
    }

    fn checked_shape(&self) -> DensityResult<DensityShape> {
        self.shape.ok_or_else(DensityError::not_fitted)
    }
}

impl ConditionalDensity for GaussianMixtureDensity {
    fn shape(&self) -> Option<DensityShape> {
        self.shape
    }

    fn is_fitted(&self) -> bool {
        self.shape.is_some()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_pdf().with_sample().with_mixture()
    }

    fn pdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        Ok(self.log_pdf(x, y)?.mapv(f64::exp))
    }

    fn log_pdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        self.checked_shape()?.check_xy(&x, &y)?;
        let normals = self.normals()?;
        let ln_w = self.weights.mapv(f64::ln);
        let out: Array1<f64> = y
            .outer_iter()
            .map(|yi| {
                let terms: Vec<f64> = Self::component_log_densities(&normals, yi)
                    .into_iter()
                    .zip(ln_w.iter())
                    .map(|(lp, lw)| lp + lw)
                    .collect();
                log_sum_exp(&terms)
            })
            .collect();
        Ok(out)
    }

    fn sample(
        &self, x: ArrayView2<f64>, rng: &mut dyn RngCore,
    ) -> DensityResult<(Array2<f64>, Array2<f64>)> {
        self.checked_shape()?.check_x(&x)?;
        let chooser = WeightedIndex::new(self.weights.iter()).map_err(|_| {
            DensityError::InvalidMixtureState {
                row: 0,
                reason: "weights cannot define a categorical distribution",
                value: self.weights.sum(),
            }
        })?;
        let std = self.scales.mapv(f64::sqrt);
        let mut y = Array2::zeros((x.nrows(), self.locs.ncols()));
        for mut yi in y.outer_iter_mut() {
            let k = chooser.sample(rng);
            for ((yd, &m), &s) in yi.iter_mut().zip(self.locs.row(k)).zip(std.row(k)) {
                let z: f64 = StandardNormal.sample(rng);
                *yd = m + s * z;
            }
        }
        Ok((x.to_owned(), y))
    }

    fn mixture_components(&self, x: ArrayView2<f64>) -> DensityResult<MixtureComponents> {
        self.checked_shape()?.check_x(&x)?;
        let n = x.nrows();
        let (k, d) = self.locs.dim();
        let weights = Array2::from_shape_fn((n, k), |(_, j)| self.weights[j]);
        let locs = Array3::from_shape_fn((n, k, d), |(_, j, l)| self.locs[[j, l]]);
        let scales = Array3::from_shape_fn((n, k, d), |(_, j, l)| self.scales[[j, l]]);
        MixtureComponents::new(weights, locs, scales)
    }
}

// ---- Helper methods ----

/// Stable `ln Σ exp(a_i)`; returns `-inf` when every term is `-inf`.
fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp()).sum::<f64>().ln()
}
