//! Numeric integration — importance-sampled expectations over ℝ^d.
//!
//! Purpose
//! -------
//! Approximate `∫ f(y) dy` over an unbounded `ndim`-dimensional domain with a
//! product standard Cauchy proposal. The heavy tails cover the whole support
//! without truncation, so no integration bounds are needed.
//!
//! Key behaviors
//! -------------
//! - [`integrate`] draws proposal points in chunks, evaluates a vector-valued
//!   integrand on each chunk, and returns the ratio estimator
//!   `(1/N) Σ_i f(y_i) / q(y_i)`.
//! - [`mean`] and [`covariance`] build the integrands `y·p(y|x)` and
//!   `(y − m)(y − m)ᵀ·p(y|x)` for each conditioning row from the model `pdf`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The integrand already contains the target density; the integrator only
//!   divides by the proposal density.
//! - Draws whose proposal density is at or below
//!   `IntegrationOptions::min_proposal_density` contribute zero but still count
//!   towards `N`, which keeps extreme tail draws from blowing up the variance.
//!   The comparison is done on `ln q`, so the product density of many
//!   dimensions does not underflow; a `warn!` is emitted if every draw is
//!   discarded.
//! - Accuracy is governed by `n_samples` only; no error bound is reported.
//!
//! Conventions
//! -----------
//! - The integrand receives a `(chunk, ndim)` view of proposal points and must
//!   return a `(chunk, n_out)` array.
//! - Conditioning rows are tiled with a broadcast view, so no
//!   `(n_samples, ndim_x)` matrix is materialized.
//!
//! Testing notes
//! -------------
//! - Unit tests integrate known normal moments and check the tail guard and
//!   the integrand shape check.
use crate::{
    density::{
        core::options::IntegrationOptions,
        errors::{DensityError, DensityResult},
        model::ConditionalDensity,
    },
    statistics::linalg::min_eigenvalue,
};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use rand::{RngCore, distributions::Distribution};
use statrs::distribution::{Cauchy, Continuous};
use tracing::{trace, warn};

/// Relative tolerance (w.r.t. the trace) below which a negative eigenvalue of
/// an integrated covariance is reported.
const PSD_WARN_TOL: f64 = 1e-8;

/// integrate — Cauchy importance-sampling estimate of a vector integral.
///
/// Parameters
/// ----------
/// - `f`: `FnMut(ArrayView2<f64>) -> DensityResult<Array2<f64>>`
///   Integrand evaluated on a chunk of points, returning one row of `n_out`
///   values per point.
/// - `ndim`: `usize`
///   Dimension of the integration domain (≥ 1).
/// - `n_out`: `usize`
///   Number of integrand components.
/// - `opts`: `&IntegrationOptions`
///   Sample count, chunk size, and proposal-density floor.
/// - `rng`: `&mut dyn RngCore`
///   Source of proposal draws.
///
/// Returns
/// -------
/// `DensityResult<Array1<f64>>`
///   The length-`n_out` estimate of `∫ f(y) dy`.
///
/// Errors
/// ------
/// - `InvalidOption` if `opts` was built by hand with zero draws, a zero
///   chunk size, or a negative / non-finite density floor.
/// - `ShapeMismatch` if `ndim == 0` or `f` returns a wrongly shaped chunk.
/// - `NonFiniteValue` if `f` returns NaN/±inf for a retained draw.
/// - Any error returned by `f`.
pub fn integrate<F>(
    mut f: F, ndim: usize, n_out: usize, opts: &IntegrationOptions, rng: &mut dyn RngCore,
) -> DensityResult<Array1<f64>>
where
    F: FnMut(ArrayView2<f64>) -> DensityResult<Array2<f64>>,
{
    opts.validate()?;
    if ndim == 0 {
        return Err(DensityError::ShapeMismatch { what: "integration ndim (>= 1)", expected: 1, actual: 0 });
    }
    let proposal = Cauchy::new(0.0, 1.0)?;
    let ln_floor = opts.min_proposal_density.ln();
    let mut acc = Array1::<f64>::zeros(n_out);
    let mut discarded = 0usize;
    let mut offset = 0usize;

    while offset < opts.n_samples {
        let m = (opts.n_samples - offset).min(opts.chunk_size);
        let points = Array2::from_shape_simple_fn((m, ndim), || proposal.sample(rng));
        let values = f(points.view())?;
        if values.dim() != (m, n_out) {
            return Err(DensityError::ShapeMismatch {
                what: "integrand values",
                expected: m * n_out,
                actual: values.len(),
            });
        }
        for (j, (point, value)) in points.outer_iter().zip(values.outer_iter()).enumerate() {
            let ln_q = product_ln_density(&proposal, point);
            if !(ln_q > ln_floor) {
                discarded += 1;
                continue;
            }
            if let Some(&bad) = value.iter().find(|v| !v.is_finite()) {
                return Err(DensityError::NonFiniteValue {
                    what: "integrand",
                    index: offset + j,
                    value: bad,
                });
            }
            for (a, &v) in acc.iter_mut().zip(value.iter()) {
                if v != 0.0 {
                    *a += v.signum() * (v.abs().ln() - ln_q).exp();
                }
            }
        }
        offset += m;
        trace!(drawn = offset, total = opts.n_samples, "integration chunk done");
    }
    if discarded == opts.n_samples {
        warn!(discarded, ndim, "every proposal draw fell below the density floor; estimate is zero");
    } else if discarded > 0 {
        trace!(discarded, "proposal draws below density floor");
    }
    acc /= opts.n_samples as f64;
    Ok(acc)
}

/// mean — `E[y | x_i] = ∫ y p(y | x_i) dy` for each conditioning row.
///
/// # Errors
/// Propagates `pdf` and [`integrate`] errors.
pub fn mean<M: ConditionalDensity + ?Sized>(
    model: &M, x_cond: ArrayView2<f64>, opts: &IntegrationOptions, rng: &mut dyn RngCore,
) -> DensityResult<Array2<f64>> {
    let ndim_y = model.ndim_y();
    let mut means = Array2::zeros((x_cond.nrows(), ndim_y));
    for (x_row, mut out) in x_cond.outer_iter().zip(means.outer_iter_mut()) {
        let integral = integrate(
            |y| {
                let p = tiled_pdf(model, x_row, y)?;
                Ok(&y * &p.insert_axis(Axis(1)))
            },
            ndim_y,
            ndim_y,
            opts,
            rng,
        )?;
        out.assign(&integral);
    }
    Ok(means)
}

/// covariance — `∫ (y − m_i)(y − m_i)ᵀ p(y | x_i) dy` for each conditioning
/// row, given precomputed means `m` of shape `(n, ndim_y)`.
///
/// # Errors
/// - `ShapeMismatch` if `means` does not have shape `(n, ndim_y)`.
/// - Propagates `pdf` and [`integrate`] errors.
pub fn covariance<M: ConditionalDensity + ?Sized>(
    model: &M, x_cond: ArrayView2<f64>, means: ArrayView2<f64>, opts: &IntegrationOptions,
    rng: &mut dyn RngCore,
) -> DensityResult<Array3<f64>> {
    let d = model.ndim_y();
    if means.dim() != (x_cond.nrows(), d) {
        return Err(DensityError::ShapeMismatch {
            what: "precomputed means",
            expected: x_cond.nrows() * d,
            actual: means.len(),
        });
    }
    let mut covs = Array3::zeros((x_cond.nrows(), d, d));
    for (i, (x_row, mean)) in x_cond.outer_iter().zip(means.outer_iter()).enumerate() {
        let integral = integrate(
            |y| {
                let p = tiled_pdf(model, x_row, y)?;
                let centered = &y - &mean;
                let mut out = Array2::zeros((y.nrows(), d * d));
                for ((a, mut row), &pj) in centered.outer_iter().zip(out.outer_iter_mut()).zip(&p) {
                    for r in 0..d {
                        for c in 0..d {
                            row[r * d + c] = a[r] * a[c] * pj;
                        }
                    }
                }
                Ok(out)
            },
            d,
            d * d,
            opts,
            rng,
        )?;
        let cov = integral.into_shape_with_order((d, d)).map_err(|_| {
            DensityError::ShapeMismatch { what: "covariance reshape", expected: d * d, actual: 0 }
        })?;
        let lambda_min = min_eigenvalue(cov.view());
        let trace = cov.diag().sum();
        if lambda_min < -PSD_WARN_TOL * trace.abs().max(1.0) {
            warn!(row = i, lambda_min, "integrated covariance is not positive semi-definite");
        }
        covs.index_axis_mut(Axis(0), i).assign(&cov);
    }
    Ok(covs)
}

// ---- Helper methods ----

/// `ln q(y)` of the product proposal, summed so it does not underflow in
/// high dimensions.
fn product_ln_density(proposal: &Cauchy, point: ArrayView1<f64>) -> f64 {
    point.iter().map(|&v| proposal.ln_pdf(v)).sum()
}

fn tiled_pdf<M: ConditionalDensity + ?Sized>(
    model: &M, x_row: ArrayView1<f64>, y: ArrayView2<f64>,
) -> DensityResult<Array1<f64>> {
    let tiled = x_row.broadcast((y.nrows(), x_row.len())).ok_or(DensityError::ShapeMismatch {
        what: "tiled conditioning row",
        expected: x_row.len(),
        actual: 0,
    })?;
    let p = model.pdf(tiled, y)?;
    if p.len() != y.nrows() {
        return Err(DensityError::ShapeMismatch {
            what: "pdf output rows",
            expected: y.nrows(),
            actual: p.len(),
        });
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::models::{EconDensity, GaussianMixtureDensity};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};
    use statrs::distribution::Normal;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The ratio estimator on integrands with known values (normalization
    //   and first moment of a normal density).
    // - Row-wise `mean` / `covariance` on reference models.
    // - Integrand shape validation.
    //
    // They intentionally DO NOT cover:
    // - Strategy selection; see `statistics::dispatch`.
    // -------------------------------------------------------------------------

    fn opts(n: usize) -> IntegrationOptions {
        IntegrationOptions::new(n, 4_096, 1e-300).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // A normal density integrates to one and its first moment to its mean.
    //
    // Given
    // -----
    // - Integrand `[φ(y), y φ(y)]` with `φ = N(0.5, 1)`, 200_000 draws.
    //
    // Expect
    // ------
    // - Estimates within 0.02 of `[1, 0.5]`.
    fn integrates_normal_moments() {
        let normal = Normal::new(0.5, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let est = integrate(
            |y| {
                let mut out = Array2::zeros((y.nrows(), 2));
                for (v, mut row) in y.column(0).iter().zip(out.outer_iter_mut()) {
                    let p = normal.pdf(*v);
                    row[0] = p;
                    row[1] = v * p;
                }
                Ok(out)
            },
            1,
            2,
            &opts(200_000),
            &mut rng,
        )
        .unwrap();

        assert_abs_diff_eq!(est[0], 1.0, epsilon = 0.02);
        assert_abs_diff_eq!(est[1], 0.5, epsilon = 0.02);
    }

    #[test]
    // Purpose
    // -------
    // A proposal floor above every density discards all draws.
    //
    // Given
    // -----
    // - `min_proposal_density = 1.0` (the standard Cauchy density is ≤ 1/π).
    //
    // Expect
    // ------
    // - The estimate is exactly zero and the integrand is never divided.
    fn density_floor_discards_draws() {
        let mut rng = StdRng::seed_from_u64(2);
        let floor = IntegrationOptions::new(1_000, 100, 1.0).unwrap();

        let est = integrate(|y| Ok(Array2::ones((y.nrows(), 1))), 1, 1, &floor, &mut rng).unwrap();

        assert_eq!(est[0], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Hand-built options are checked before any draw.
    //
    // Given
    // -----
    // - `IntegrationOptions` literals with `chunk_size = 0` and
    //   `n_samples = 0`.
    //
    // Expect
    // ------
    // - `InvalidOption` for both instead of a hang or a division by zero.
    fn literal_options_are_validated() {
        let mut rng = StdRng::seed_from_u64(6);

        for bad in [
            IntegrationOptions { n_samples: 10, chunk_size: 0, min_proposal_density: 0.0 },
            IntegrationOptions { n_samples: 0, chunk_size: 10, min_proposal_density: 0.0 },
        ] {
            let err = integrate(|y| Ok(Array2::ones((y.nrows(), 1))), 1, 1, &bad, &mut rng)
                .unwrap_err();

            assert!(matches!(err, DensityError::InvalidOption { .. }));
        }
    }

    #[test]
    // Purpose
    // -------
    // The proposal density is handled in log space, so it stays finite where
    // the plain product of densities underflows.
    //
    // Given
    // -----
    // - The origin in 1_000 dimensions, where `π^-1000` is below the
    //   smallest positive `f64`.
    //
    // Expect
    // ------
    // - `ln q = −1000 ln π` and finite, while the direct product is 0.
    fn proposal_log_density_does_not_underflow() {
        let proposal = Cauchy::new(0.0, 1.0).unwrap();
        let origin = Array1::<f64>::zeros(1_000);

        let ln_q = product_ln_density(&proposal, origin.view());

        assert!(ln_q.is_finite());
        assert_abs_diff_eq!(ln_q, -1_000.0 * std::f64::consts::PI.ln(), epsilon = 1e-9);
        assert_eq!(origin.iter().map(|&v| proposal.pdf(v)).product::<f64>(), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Wrongly shaped integrand output is rejected.
    //
    // Given
    // -----
    // - Integrand returning one column while `n_out = 2`.
    //
    // Expect
    // ------
    // - `ShapeMismatch` on `integrand values`.
    fn integrand_shape_is_checked() {
        let mut rng = StdRng::seed_from_u64(3);

        let err = integrate(|y| Ok(Array2::ones((y.nrows(), 1))), 1, 2, &opts(10), &mut rng)
            .unwrap_err();

        assert!(matches!(err, DensityError::ShapeMismatch { what: "integrand values", .. }));
    }

    #[test]
    // Purpose
    // -------
    // Row-wise integration recovers the conditional mean `x²`.
    //
    // Given
    // -----
    // - `EconDensity` with σ = 0.5 at `x ∈ {0.5, 1.0}`, 200_000 draws.
    //
    // Expect
    // ------
    // - Means within 0.05 of `[0.25, 1.0]`.
    fn mean_matches_econ_closed_form() {
        let model = EconDensity::new(0.5).unwrap();
        let x = array![[0.5], [1.0]];
        let mut rng = StdRng::seed_from_u64(4);

        let means = mean(&model, x.view(), &opts(200_000), &mut rng).unwrap();

        assert_abs_diff_eq!(means[[0, 0]], 0.25, epsilon = 0.05);
        assert_abs_diff_eq!(means[[1, 0]], 1.0, epsilon = 0.05);
    }

    #[test]
    // Purpose
    // -------
    // Integrated covariance of an axis-aligned 2-D normal is diagonal.
    //
    // Given
    // -----
    // - Single-component mixture, mean `(0, 0)`, variances `(1, 0.5)`,
    //   300_000 draws and exact means.
    //
    // Expect
    // ------
    // - Diagonal within 0.06 of `(1, 0.5)`, off-diagonal within 0.06 of 0,
    //   exact symmetry.
    fn covariance_of_diagonal_normal() {
        let model =
            GaussianMixtureDensity::new(array![1.0], array![[0.0, 0.0]], array![[1.0, 0.5]])
                .unwrap()
                .fitted_with(1)
                .unwrap();
        let x = array![[0.0]];
        let means = array![[0.0, 0.0]];
        let mut rng = StdRng::seed_from_u64(5);

        let covs = covariance(&model, x.view(), means.view(), &opts(300_000), &mut rng).unwrap();

        assert_abs_diff_eq!(covs[[0, 0, 0]], 1.0, epsilon = 0.06);
        assert_abs_diff_eq!(covs[[0, 1, 1]], 0.5, epsilon = 0.06);
        assert_abs_diff_eq!(covs[[0, 0, 1]], 0.0, epsilon = 0.06);
        assert_eq!(covs[[0, 0, 1]], covs[[0, 1, 0]]);
    }
}
