//! Economy simulator: `y = x² + ε`, `ε ~ N(0, σ²)`.
//!
//! A one-dimensional conditional density with known closed forms, used as a
//! reference model for the `pdf`/`cdf`/`sample` strategies. For `x < 0` the
//! density and the CDF are defined as zero (the simulator only draws
//! `x = |N(0, 1)|`).
use crate::density::{
    core::{capabilities::Capabilities, shape::DensityShape},
    errors::DensityResult,
    model::ConditionalDensity,
};
use ndarray::{Array1, Array2, ArrayView2, Zip};
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Reference simulator with `E[y | x] = x²` and `Var[y | x] = σ²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EconDensity {
    /// Noise standard deviation σ > 0.
    pub std: f64,
    shape: DensityShape,
}

impl EconDensity {
    /// Construct the simulator with noise standard deviation `std`.
    ///
    /// # Errors
    /// [`crate::density::errors::DensityError::InvalidDistribution`] if `std`
    /// is not finite and strictly positive.
    pub fn new(std: f64) -> DensityResult<EconDensity> {
        Normal::new(0.0, std)?;
        Ok(EconDensity { std, shape: DensityShape { ndim_x: 1, ndim_y: 1 } })
    }

    /// Draw `n` joint observations with `x = |N(0, 1)|`.
    pub fn simulate(&self, n: usize, rng: &mut dyn RngCore) -> (Array2<f64>, Array2<f64>) {
        let x = Array2::from_shape_simple_fn((n, 1), || {
            let z: f64 = StandardNormal.sample(rng);
            z.abs()
        });
        let y = self.draw_targets(x.view(), rng);
        (x, y)
    }

    fn draw_targets(&self, x: ArrayView2<f64>, rng: &mut dyn RngCore) -> Array2<f64> {
        let mut y = Array2::zeros((x.nrows(), 1));
        for (yi, xi) in y.column_mut(0).iter_mut().zip(x.column(0).iter()) {
            let z: f64 = StandardNormal.sample(rng);
            *yi = xi * xi + self.std * z;
        }
        y
    }

    fn evaluate<F>(&self, x: ArrayView2<f64>, y: ArrayView2<f64>, f: F) -> DensityResult<Array1<f64>>
    where
        F: Fn(&Normal, f64) -> f64,
    {
        self.shape.check_xy(&x, &y)?;
        let mut out = Array1::zeros(x.nrows());
        let mut failure = None;
        Zip::from(&mut out).and(x.column(0)).and(y.column(0)).for_each(|o, &xi, &yi| {
            if xi < 0.0 || failure.is_some() {
                return;
            }
            match Normal::new(xi * xi, self.std) {
                Ok(normal) => *o = f(&normal, yi),
                Err(err) => failure = Some(err),
            }
        });
        match failure {
            Some(err) => Err(err.into()),
            None => Ok(out),
        }
    }
}

impl ConditionalDensity for EconDensity {
    fn shape(&self) -> Option<DensityShape> {
        Some(self.shape)
    }

    fn is_fitted(&self) -> bool {
        true
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_pdf().with_cdf().with_sample()
    }

    fn pdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        self.evaluate(x, y, |normal, yi| normal.pdf(yi))
    }

    fn cdf(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> DensityResult<Array1<f64>> {
        self.evaluate(x, y, |normal, yi| normal.cdf(yi))
    }

    fn sample(
        &self, x: ArrayView2<f64>, rng: &mut dyn RngCore,
    ) -> DensityResult<(Array2<f64>, Array2<f64>)> {
        self.shape.check_x(&x)?;
        let y = self.draw_targets(x, rng);
        Ok((x.to_owned(), y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    // Purpose
    // -------
    // The density follows `N(x², σ²)` for `x ≥ 0` and is zero for `x < 0`.
    //
    // Given
    // -----
    // - σ = 1, rows `(x, y) = (1, 1)` and `(-1, 1)`.
    //
    // Expect
    // ------
    // - pdf ≈ 1/√(2π) at the mode, 0 for negative `x`; cdf = 0.5 at the mode.
    fn pdf_and_cdf_follow_shifted_normal() {
        let model = EconDensity::new(1.0).unwrap();
        let x = array![[1.0], [-1.0]];
        let y = array![[1.0], [1.0]];

        let p = model.pdf(x.view(), y.view()).unwrap();
        let c = model.cdf(x.view(), y.view()).unwrap();

        assert_relative_eq!(p[0], 1.0 / (2.0 * std::f64::consts::PI).sqrt(), epsilon = 1e-12);
        assert_eq!(p[1], 0.0);
        assert_relative_eq!(c[0], 0.5, epsilon = 1e-12);
        assert_eq!(c[1], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Conditional draws are centered on `x²`.
    //
    // Given
    // -----
    // - σ = 0.5, 20_000 draws at `x = 2`, seeded generator.
    //
    // Expect
    // ------
    // - Sample mean within 0.05 of 4.
    fn sample_is_centered_on_square() {
        let model = EconDensity::new(0.5).unwrap();
        let x = Array2::from_elem((20_000, 1), 2.0);
        let mut rng = StdRng::seed_from_u64(7);

        let (_, y) = model.sample(x.view(), &mut rng).unwrap();

        assert_relative_eq!(y.mean().unwrap(), 4.0, epsilon = 0.05);
    }

    #[test]
    // Purpose
    // -------
    // `simulate` draws non-negative conditioning values.
    //
    // Given
    // -----
    // - 1_000 joint draws.
    //
    // Expect
    // ------
    // - Both arrays have 1_000 rows and every `x ≥ 0`.
    fn simulate_draws_nonnegative_inputs() {
        let model = EconDensity::new(1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let (x, y) = model.simulate(1_000, &mut rng);

        assert_eq!(x.dim(), (1_000, 1));
        assert_eq!(y.dim(), (1_000, 1));
        assert!(x.iter().all(|&v| v >= 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Non-positive noise is rejected at construction.
    //
    // Given
    // -----
    // - σ = 0.
    //
    // Expect
    // ------
    // - An error.
    fn new_rejects_zero_std() {
        assert!(EconDensity::new(0.0).is_err());
    }
}
