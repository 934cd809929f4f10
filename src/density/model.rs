//! Conditional density contract consumed by the statistic core.
//!
//! [`ConditionalDensity`] is the narrow interface a fitted model offers:
//! dimensionality, a fitted gate, a [`Capabilities`] descriptor, and the
//! optional primitives `pdf`, `log_pdf`, `cdf`, `sample`, and
//! `mixture_components`. Every optional primitive has a default body that
//! returns [`DensityError::UnsupportedOperation`], so a model implements only
//! what it declares in `capabilities()`.
//!
//! ## Conventions
//! - Inputs are 2-D views with one row per observation; callers have already
//!   normalized them through the dimensionality guard.
//! - Outputs of `pdf`, `log_pdf`, and `cdf` have one entry per input row.
//! - `sample` draws exactly one target per conditioning row and uses only the
//!   generator it is given.
use crate::density::{
    core::{capabilities::Capabilities, components::MixtureComponents, shape::DensityShape},
    errors::{DensityError, DensityResult},
};
use ndarray::{Array1, Array2, ArrayView2};
use rand::RngCore;

/// A fitted conditional probability model `p(y | x)`.
///
/// Implementors must keep `capabilities()` consistent with the primitives
/// they override: the dispatcher only calls a primitive whose flag is set.
pub trait ConditionalDensity {
    /// Dimensionality recorded at fit time; `None` before fitting.
    fn shape(&self) -> Option<DensityShape>;

    /// Fitted gate checked before any statistic call.
    fn is_fitted(&self) -> bool;

    /// Primitive operations this model implements.
    fn capabilities(&self) -> Capabilities;

    /// Columns of the conditioning input (0 before fitting).
    fn ndim_x(&self) -> usize {
        self.shape().map_or(0, |s| s.ndim_x)
    }

    /// Columns of the target (0 before fitting).
    fn ndim_y(&self) -> usize {
        self.shape().map_or(0, |s| s.ndim_y)
    }

    /// Conditional density `p(y_i | x_i)` per row.
    fn pdf(&self, _x: ArrayView2<f64>, _y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        Err(DensityError::UnsupportedOperation { operation: "pdf", reason: "model has no pdf" })
    }

    /// Conditional log-density per row; defaults to `ln(pdf)`.
    fn log_pdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        Ok(self.pdf(x, y)?.mapv(f64::ln))
    }

    /// Conditional CDF `P(Y ≤ y_i | x_i)` per row, non-decreasing in `y`.
    fn cdf(&self, _x: ArrayView2<f64>, _y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        Err(DensityError::UnsupportedOperation { operation: "cdf", reason: "model has no cdf" })
    }

    /// Draw one target per conditioning row; returns `(X', Y')` with `X'`
    /// the conditioning rows the draws correspond to.
    fn sample(
        &self, _x: ArrayView2<f64>, _rng: &mut dyn RngCore,
    ) -> DensityResult<(Array2<f64>, Array2<f64>)> {
        Err(DensityError::UnsupportedOperation {
            operation: "sample",
            reason: "model cannot simulate conditionally",
        })
    }

    /// Mixture parameters at each conditioning row.
    fn mixture_components(&self, _x: ArrayView2<f64>) -> DensityResult<MixtureComponents> {
        Err(DensityError::UnsupportedOperation {
            operation: "mixture_components",
            reason: "model is not a Gaussian mixture",
        })
    }
}
