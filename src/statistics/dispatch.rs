//! Statistic dispatcher — capability-based routing of conditional
//! statistics to closed-form, integration, Monte-Carlo, and root-finding
//! strategies.
//!
//! Purpose
//! -------
//! Give every fitted [`ConditionalDensity`] the same statistic surface
//! (`mean`, `covariance`, `value_at_risk`, `conditional_value_at_risk`,
//! `cdf`, `score`) regardless of which primitives it implements.
//!
//! Key behaviors
//! -------------
//! - The model's [`Capabilities`] are resolved once per call and mapped to an
//!   explicit strategy enum:
//!   - mean: `Mixture` → `PdfIntegration` → `MonteCarlo`.
//!   - covariance: `Mixture` → `PdfIntegration` → `MonteCarlo`.
//!   - VaR: `CdfBisection` (model CDF or mixture CDF) → `MonteCarlo`.
//!   - CVaR: `MonteCarlo`, thresholded at the dispatcher's own VaR.
//!   - cdf: `Model` → `Mixture`.
//! - Checks run in a fixed order: fitted gate, univariate target (VaR/CVaR),
//!   `α ∈ (0, 1)`, dimensionality, strategy availability.
//! - Empty conditioning inputs yield empty outputs once a strategy exists.
//!
//! Invariants & assumptions
//! ------------------------
//! - The model is borrowed immutably and never mutated.
//! - A batch either succeeds for every row or returns the first error; no
//!   partial results.
//! - Randomness comes only from the generator passed to each call.
//!
//! Conventions
//! -----------
//! - `x_cond` is `(n, ndim_x)`; means are `(n, ndim_y)`, covariances
//!   `(n, ndim_y, ndim_y)`, VaR / CVaR / CDF `(n,)`.
//! - VaR is the left-tail α-quantile; CVaR(α) ≤ VaR(α).
//!
//! Downstream usage
//! ----------------
//! - Build one [`StatisticDispatcher`] per model and reuse it across calls;
//!   it holds no state besides the model reference and its options.
//! - [`StatisticDispatcher::score`] is the hook external model-selection
//!   loops call.
//!
//! Testing notes
//! -------------
//! - Unit tests cover strategy selection, the precondition order, and the
//!   routing of each statistic. Cross-strategy agreement lives in
//!   `tests/integration_statistics_pipeline.rs`.
use crate::{
    density::{
        core::{
            capabilities::Capabilities,
            options::StatOptions,
            shape::{DensityShape, handle_input_dimensionality},
        },
        errors::{DensityError, DensityResult, Precondition},
        model::ConditionalDensity,
    },
    statistics::{
        integration,
        mixture::MixtureAggregator,
        monte_carlo,
        root_finder::{Root, bisect},
    },
};
use ndarray::{Array1, Array2, Array3, ArrayView2, ArrayViewD, array, s};
use rand::RngCore;
use tracing::debug;

/// How a conditional mean is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeanStrategy {
    Mixture,
    PdfIntegration,
    MonteCarlo,
}

impl MeanStrategy {
    pub fn select(caps: Capabilities) -> Option<MeanStrategy> {
        if caps.mixture {
            Some(MeanStrategy::Mixture)
        } else if caps.pdf {
            Some(MeanStrategy::PdfIntegration)
        } else if caps.sample {
            Some(MeanStrategy::MonteCarlo)
        } else {
            None
        }
    }
}

/// How a conditional covariance is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceStrategy {
    Mixture,
    PdfIntegration,
    MonteCarlo,
}

impl CovarianceStrategy {
    pub fn select(caps: Capabilities) -> Option<CovarianceStrategy> {
        if caps.mixture {
            Some(CovarianceStrategy::Mixture)
        } else if caps.pdf {
            Some(CovarianceStrategy::PdfIntegration)
        } else if caps.sample {
            Some(CovarianceStrategy::MonteCarlo)
        } else {
            None
        }
    }
}

/// How a Value-at-Risk is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantileStrategy {
    /// Invert a CDF (model or mixture) by bisection.
    CdfBisection,
    MonteCarlo,
}

impl QuantileStrategy {
    pub fn select(caps: Capabilities) -> Option<QuantileStrategy> {
        if caps.has_any_cdf() {
            Some(QuantileStrategy::CdfBisection)
        } else if caps.sample {
            Some(QuantileStrategy::MonteCarlo)
        } else {
            None
        }
    }
}

/// How a Conditional Value-at-Risk is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortfallStrategy {
    MonteCarlo,
}

impl ShortfallStrategy {
    pub fn select(caps: Capabilities) -> Option<ShortfallStrategy> {
        caps.sample.then_some(ShortfallStrategy::MonteCarlo)
    }
}

/// Where conditional CDF values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdfStrategy {
    /// The model's own `cdf`.
    Model,
    /// Closed form from mixture components.
    Mixture,
}

impl CdfStrategy {
    pub fn select(caps: Capabilities) -> Option<CdfStrategy> {
        if caps.cdf {
            Some(CdfStrategy::Model)
        } else if caps.mixture {
            Some(CdfStrategy::Mixture)
        } else {
            None
        }
    }
}

/// StatisticDispatcher — statistic surface over a borrowed fitted model.
///
/// Fields
/// ------
/// - `model`: `&M`
///   The fitted conditional density.
/// - `options`: [`StatOptions`]
///   Sample sizes, bisection settings, and mixture weight tolerance.
#[derive(Debug, Clone)]
pub struct StatisticDispatcher<'m, M: ?Sized> {
    model: &'m M,
    options: StatOptions,
}

impl<'m, M: ConditionalDensity + ?Sized> StatisticDispatcher<'m, M> {
    pub fn new(model: &'m M, options: StatOptions) -> StatisticDispatcher<'m, M> {
        StatisticDispatcher { model, options }
    }

    pub fn model(&self) -> &'m M {
        self.model
    }

    pub fn options(&self) -> &StatOptions {
        &self.options
    }

    /// mean — `E[y | x_i]` per conditioning row, shape `(n, ndim_y)`.
    ///
    /// Errors
    /// ------
    /// - `PreconditionViolation(NotFitted)` on an unfitted model.
    /// - `ShapeMismatch` if `x_cond` does not have `ndim_x` columns.
    /// - `UnsupportedOperation` if the model has none of `mixture`, `pdf`,
    ///   `sample`.
    /// - Any strategy error.
    pub fn mean(&self, x_cond: ArrayView2<f64>, rng: &mut dyn RngCore) -> DensityResult<Array2<f64>> {
        let shape = self.preflight(&x_cond, None)?;
        let strategy = MeanStrategy::select(self.model.capabilities()).ok_or(
            DensityError::UnsupportedOperation {
                operation: "mean",
                reason: "model exposes neither mixture components, pdf, nor sample",
            },
        )?;
        debug!(statistic = "mean", ?strategy, rows = x_cond.nrows(), "strategy selected");
        if x_cond.nrows() == 0 {
            return Ok(Array2::zeros((0, shape.ndim_y)));
        }

        match strategy {
            MeanStrategy::Mixture => Ok(self.mixture(x_cond)?.mean()),
            MeanStrategy::PdfIntegration => {
                integration::mean(self.model, x_cond, &self.options.integration, rng)
            }
            MeanStrategy::MonteCarlo => monte_carlo::mean(self.model, x_cond, &self.options.mc, rng),
        }
    }

    /// covariance — `Cov[y | x_i]` per conditioning row, shape
    /// `(n, ndim_y, ndim_y)`.
    ///
    /// The integration strategy centers on the dispatcher's own mean, so the
    /// mean and the covariance of one call consume the same generator.
    ///
    /// Errors
    /// ------
    /// As [`StatisticDispatcher::mean`].
    pub fn covariance(
        &self, x_cond: ArrayView2<f64>, rng: &mut dyn RngCore,
    ) -> DensityResult<Array3<f64>> {
        let shape = self.preflight(&x_cond, None)?;
        let strategy = CovarianceStrategy::select(self.model.capabilities()).ok_or(
            DensityError::UnsupportedOperation {
                operation: "covariance",
                reason: "model exposes neither mixture components, pdf, nor sample",
            },
        )?;
        debug!(statistic = "covariance", ?strategy, rows = x_cond.nrows(), "strategy selected");
        if x_cond.nrows() == 0 {
            return Ok(Array3::zeros((0, shape.ndim_y, shape.ndim_y)));
        }

        match strategy {
            CovarianceStrategy::Mixture => Ok(self.mixture(x_cond)?.covariance()),
            CovarianceStrategy::PdfIntegration => {
                let means = self.mean(x_cond, rng)?;
                integration::covariance(
                    self.model,
                    x_cond,
                    means.view(),
                    &self.options.integration,
                    rng,
                )
            }
            CovarianceStrategy::MonteCarlo => {
                monte_carlo::covariance(self.model, x_cond, &self.options.mc, rng)
            }
        }
    }

    /// value_at_risk — left-tail α-quantile per conditioning row, shape `(n,)`.
    ///
    /// Errors
    /// ------
    /// - `PreconditionViolation` for an unfitted model, `ndim_y != 1`, or
    ///   `α ∉ (0, 1)`.
    /// - `ShapeMismatch` if `x_cond` does not have `ndim_x` columns.
    /// - `UnsupportedOperation` without a CDF (model or mixture) and without
    ///   `sample`.
    /// - `NumericalNonConvergence` from the root finder.
    pub fn value_at_risk(
        &self, x_cond: ArrayView2<f64>, alpha: f64, rng: &mut dyn RngCore,
    ) -> DensityResult<Array1<f64>> {
        self.preflight(&x_cond, Some(alpha))?;
        let caps = self.model.capabilities();
        let strategy = QuantileStrategy::select(caps).ok_or(DensityError::UnsupportedOperation {
            operation: "value_at_risk",
            reason: "model exposes neither a cdf, mixture components, nor sample",
        })?;
        debug!(statistic = "value_at_risk", ?strategy, alpha, rows = x_cond.nrows(), "strategy selected");
        if x_cond.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }

        match strategy {
            QuantileStrategy::CdfBisection => self.bisect_quantiles(x_cond, alpha, caps),
            QuantileStrategy::MonteCarlo => {
                monte_carlo::value_at_risk(self.model, x_cond, alpha, &self.options.mc, rng)
            }
        }
    }

    /// conditional_value_at_risk — mean of outcomes at or below VaR(α) per
    /// conditioning row, shape `(n,)`.
    ///
    /// Errors
    /// ------
    /// - As [`StatisticDispatcher::value_at_risk`].
    /// - `UnsupportedOperation` without `sample`.
    /// - `NumericalNonConvergence` if no draw of a row reaches its VaR.
    pub fn conditional_value_at_risk(
        &self, x_cond: ArrayView2<f64>, alpha: f64, rng: &mut dyn RngCore,
    ) -> DensityResult<Array1<f64>> {
        self.preflight(&x_cond, Some(alpha))?;
        let strategy = ShortfallStrategy::select(self.model.capabilities()).ok_or(
            DensityError::UnsupportedOperation {
                operation: "conditional_value_at_risk",
                reason: "model cannot sample",
            },
        )?;
        debug!(statistic = "conditional_value_at_risk", ?strategy, alpha, rows = x_cond.nrows(), "strategy selected");

        let var = self.value_at_risk(x_cond, alpha, rng)?;
        if x_cond.nrows() == 0 {
            return Ok(var);
        }
        match strategy {
            ShortfallStrategy::MonteCarlo => monte_carlo::conditional_value_at_risk(
                self.model,
                x_cond,
                var.view(),
                &self.options.mc,
                rng,
            ),
        }
    }

    /// cdf — `P(Y ≤ y_i | x_i)` per row for raw (rank 1 or 2) inputs.
    ///
    /// Errors
    /// ------
    /// - `PreconditionViolation(NotFitted)` on an unfitted model.
    /// - `ShapeMismatch` from the dimensionality guard.
    /// - `UnsupportedOperation` without a model CDF or mixture components.
    pub fn cdf<'a>(&self, x: ArrayViewD<'a, f64>, y: ArrayViewD<'a, f64>) -> DensityResult<Array1<f64>> {
        let (x, y) = self.guard_xy(x, y)?;
        let strategy = CdfStrategy::select(self.model.capabilities()).ok_or(
            DensityError::UnsupportedOperation {
                operation: "cdf",
                reason: "model exposes neither a cdf nor mixture components",
            },
        )?;
        debug!(statistic = "cdf", ?strategy, rows = x.nrows(), "strategy selected");
        if x.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }

        let p = match strategy {
            CdfStrategy::Model => self.model.cdf(x, y)?,
            CdfStrategy::Mixture => self.mixture(x)?.cdf(y)?,
        };
        expect_rows("cdf output rows", &p, x.nrows())?;
        Ok(p)
    }

    /// score — mean conditional log-likelihood `(1/n) Σ ln p(y_i | x_i)`.
    ///
    /// Zero densities contribute `-inf`; NaN log-densities are rejected.
    ///
    /// Errors
    /// ------
    /// - `PreconditionViolation(NotFitted)` on an unfitted model.
    /// - `ShapeMismatch` from the dimensionality guard or for zero rows.
    /// - `UnsupportedOperation` without `pdf`.
    /// - `NonFiniteValue` for a NaN log-density.
    pub fn score<'a>(&self, x: ArrayViewD<'a, f64>, y: ArrayViewD<'a, f64>) -> DensityResult<f64> {
        let (x, y) = self.guard_xy(x, y)?;
        if !self.model.capabilities().pdf {
            return Err(DensityError::UnsupportedOperation {
                operation: "score",
                reason: "model has no pdf",
            });
        }
        if x.nrows() == 0 {
            return Err(DensityError::ShapeMismatch {
                what: "score rows (>= 1)",
                expected: 1,
                actual: 0,
            });
        }

        let log_p = self.model.log_pdf(x, y)?;
        expect_rows("log_pdf output rows", &log_p, x.nrows())?;
        if let Some((index, &value)) = log_p.iter().enumerate().find(|(_, v)| v.is_nan()) {
            return Err(DensityError::NonFiniteValue { what: "log_pdf", index, value });
        }
        Ok(log_p.sum() / log_p.len() as f64)
    }

    // ---- Helper methods ----

    /// Fitted gate, univariate target and α range (quantiles only), then the
    /// column check on `x_cond`.
    fn preflight(&self, x_cond: &ArrayView2<f64>, alpha: Option<f64>) -> DensityResult<DensityShape> {
        if !self.model.is_fitted() {
            return Err(DensityError::not_fitted());
        }
        let shape = self.model.shape().ok_or_else(DensityError::not_fitted)?;
        if let Some(alpha) = alpha {
            if shape.ndim_y != 1 {
                return Err(Precondition::NonUnivariateTarget { ndim_y: shape.ndim_y }.into());
            }
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(Precondition::AlphaOutOfRange { alpha }.into());
            }
        }
        shape.check_x(x_cond)?;
        Ok(shape)
    }

    fn guard_xy<'a>(
        &self, x: ArrayViewD<'a, f64>, y: ArrayViewD<'a, f64>,
    ) -> DensityResult<(ArrayView2<'a, f64>, ArrayView2<'a, f64>)> {
        if !self.model.is_fitted() {
            return Err(DensityError::not_fitted());
        }
        let (x, y, _) = handle_input_dimensionality(self.model.shape(), x, Some(y), false)?;
        let y = y.ok_or(DensityError::ShapeMismatch { what: "Y rows", expected: x.nrows(), actual: 0 })?;
        Ok((x, y))
    }

    /// Fetch and validate the mixture components for `x_cond`.
    fn mixture(&self, x_cond: ArrayView2<f64>) -> DensityResult<MixtureAggregator> {
        let components = self.model.mixture_components(x_cond)?;
        if components.n_rows() != x_cond.nrows() {
            return Err(DensityError::ShapeMismatch {
                what: "mixture component rows",
                expected: x_cond.nrows(),
                actual: components.n_rows(),
            });
        }
        if components.ndim_y() != self.model.ndim_y() {
            return Err(DensityError::ShapeMismatch {
                what: "mixture component ndim_y",
                expected: self.model.ndim_y(),
                actual: components.ndim_y(),
            });
        }
        MixtureAggregator::new(components, self.options.weight_tolerance)
    }

    /// Invert the model CDF (preferred) or the mixture CDF for every row.
    /// The search interval is reset for each row.
    fn bisect_quantiles(
        &self, x_cond: ArrayView2<f64>, alpha: f64, caps: Capabilities,
    ) -> DensityResult<Array1<f64>> {
        let source = CdfStrategy::select(caps).ok_or(DensityError::UnsupportedOperation {
            operation: "value_at_risk",
            reason: "no cdf available for bisection",
        })?;
        let aggregator = match source {
            CdfStrategy::Mixture => Some(self.mixture(x_cond)?),
            CdfStrategy::Model => None,
        };

        let mut vars = Array1::zeros(x_cond.nrows());
        for (i, out) in vars.iter_mut().enumerate() {
            let x_row = x_cond.slice(s![i..i + 1, ..]);
            let root: Root = match &aggregator {
                Some(agg) => bisect(|y| agg.row_cdf(i, array![y].view()), alpha, &self.options.bisection)?,
                None => bisect(
                    |y| {
                        let y_row = array![[y]];
                        let p = self.model.cdf(x_row, y_row.view())?;
                        p.first().copied().ok_or(DensityError::ShapeMismatch {
                            what: "cdf output rows",
                            expected: 1,
                            actual: 0,
                        })
                    },
                    alpha,
                    &self.options.bisection,
                )?,
            };
            debug!(row = i, ?source, iterations = root.iterations, residual = root.residual, "bisection converged");
            *out = root.value;
        }
        Ok(vars)
    }
}

fn expect_rows(what: &'static str, values: &Array1<f64>, rows: usize) -> DensityResult<()> {
    if values.len() != rows {
        return Err(DensityError::ShapeMismatch { what, expected: rows, actual: values.len() });
    }
    Ok(())
}
