//! Capability mask over an existing model.
//!
//! [`Restricted`] exposes a borrowed model with some of its primitives
//! hidden. It is how the same distribution is pushed down a specific
//! strategy, e.g. forcing a mixture model through `pdf` integration or a
//! model with a CDF through Monte-Carlo VaR, so results can be compared.
use crate::density::{
    core::{capabilities::Capabilities, components::MixtureComponents, shape::DensityShape},
    errors::{DensityError, DensityResult},
    model::ConditionalDensity,
};
use ndarray::{Array1, Array2, ArrayView2};
use rand::RngCore;

/// Borrowed model whose capabilities are intersected with `mask`.
#[derive(Debug, Clone, Copy)]
pub struct Restricted<'a, M: ?Sized> {
    inner: &'a M,
    mask: Capabilities,
}

impl<'a, M: ConditionalDensity + ?Sized> Restricted<'a, M> {
    pub fn new(inner: &'a M, mask: Capabilities) -> Restricted<'a, M> {
        Restricted { inner, mask }
    }

    fn require(&self, allowed: bool, operation: &'static str) -> DensityResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(DensityError::UnsupportedOperation { operation, reason: "hidden by capability mask" })
        }
    }
}

impl<M: ConditionalDensity + ?Sized> ConditionalDensity for Restricted<'_, M> {
    fn shape(&self) -> Option<DensityShape> {
        self.inner.shape()
    }

    fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities().intersect(self.mask)
    }

    fn pdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        self.require(self.capabilities().pdf, "pdf")?;
        self.inner.pdf(x, y)
    }

    fn log_pdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        self.require(self.capabilities().pdf, "log_pdf")?;
        self.inner.log_pdf(x, y)
    }

    fn cdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        self.require(self.capabilities().cdf, "cdf")?;
        self.inner.cdf(x, y)
    }

    fn sample(
        &self, x: ArrayView2<f64>, rng: &mut dyn RngCore,
    ) -> DensityResult<(Array2<f64>, Array2<f64>)> {
        self.require(self.capabilities().sample, "sample")?;
        self.inner.sample(x, rng)
    }

    fn mixture_components(&self, x: ArrayView2<f64>) -> DensityResult<MixtureComponents> {
        self.require(self.capabilities().mixture, "mixture_components")?;
        self.inner.mixture_components(x)
    }
}
