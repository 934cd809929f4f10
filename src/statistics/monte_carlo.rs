//! Monte-Carlo estimator — sample-based mean, covariance, VaR, and CVaR.
//!
//! Purpose
//! -------
//! Estimate conditional statistics from draws of the model's `sample`
//! primitive, one conditioning row at a time.
//!
//! Key behaviors
//! -------------
//! - Each conditioning row is tiled (broadcast view) into chunks of at most
//!   `MonteCarloOptions::chunk_size` rows and handed to `sample`; draws are
//!   folded into streaming accumulators and dropped after each chunk.
//! - [`mean`] and [`covariance`] use a chunk-merged mean/scatter accumulator;
//!   the covariance is unbiased (`ddof = 1`).
//! - [`value_at_risk`] keeps the `n_samples` univariate draws of one row and
//!   returns the α-quantile with linear order-statistic interpolation.
//! - [`conditional_value_at_risk`] averages the draws at or below a given VaR
//!   threshold; draws strictly above are excluded.
//!
//! Invariants & assumptions
//! ------------------------
//! - The model exposes `sample`, returning `(X', Y')` with one row per tiled
//!   conditioning row and `ndim_y` target columns; anything else is a
//!   [`DensityError::ShapeMismatch`].
//! - Draws must be finite.
//! - Peak memory per row is `O(chunk_size · ndim_y)` for mean/covariance/CVaR
//!   and `O(n_samples)` for VaR.
//!
//! Conventions
//! -----------
//! - The quantile convention is the left tail: VaR(α) is the value below
//!   which a fraction α of outcomes fall, and CVaR(α) ≤ VaR(α).
use crate::density::{
    core::options::MonteCarloOptions,
    errors::{DensityError, DensityResult},
    model::ConditionalDensity,
};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use rand::RngCore;
use tracing::trace;

/// Streaming mean / scatter accumulator merged chunk by chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentAccumulator {
    count: usize,
    mean: Array1<f64>,
    scatter: Option<Array2<f64>>,
}

impl MomentAccumulator {
    /// Accumulator for `ndim` columns; `track_scatter` enables covariance.
    pub fn new(ndim: usize, track_scatter: bool) -> MomentAccumulator {
        MomentAccumulator {
            count: 0,
            mean: Array1::zeros(ndim),
            scatter: track_scatter.then(|| Array2::zeros((ndim, ndim))),
        }
    }

    /// Merge a chunk of rows into the running moments.
    pub fn push(&mut self, chunk: ArrayView2<f64>) {
        let Some(chunk_mean) = chunk.mean_axis(Axis(0)) else {
            return;
        };
        let n_a = self.count as f64;
        let n_b = chunk.nrows() as f64;
        let n = n_a + n_b;
        let delta = &chunk_mean - &self.mean;

        if let Some(scatter) = self.scatter.as_mut() {
            let centered = &chunk - &chunk_mean;
            *scatter += &centered.t().dot(&centered);
            let delta_col = delta.view().insert_axis(Axis(1));
            scatter.scaled_add(n_a * n_b / n, &delta_col.dot(&delta_col.t()));
        }
        self.mean.scaled_add(n_b / n, &delta);
        self.count += chunk.nrows();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    /// Unbiased covariance; `None` without scatter tracking or with fewer than
    /// two rows.
    pub fn covariance(&self) -> Option<Array2<f64>> {
        let scatter = self.scatter.as_ref()?;
        (self.count >= 2).then(|| scatter / (self.count - 1) as f64)
    }
}

/// mean — column means of `n_samples` draws per conditioning row.
///
/// # Errors
/// Propagates `sample` errors and shape / finiteness checks on the draws.
pub fn mean<M: ConditionalDensity + ?Sized>(
    model: &M, x_cond: ArrayView2<f64>, opts: &MonteCarloOptions, rng: &mut dyn RngCore,
) -> DensityResult<Array2<f64>> {
    let d = model.ndim_y();
    let mut means = Array2::zeros((x_cond.nrows(), d));
    for (x_row, mut out) in x_cond.outer_iter().zip(means.outer_iter_mut()) {
        let mut acc = MomentAccumulator::new(d, false);
        for_each_draw_chunk(model, x_row, opts, rng, |y| {
            acc.push(y);
            Ok(())
        })?;
        out.assign(&acc.mean());
    }
    Ok(means)
}

/// covariance — unbiased empirical covariance of `n_samples` draws per row.
///
/// # Errors
/// Propagates `sample` errors and shape / finiteness checks on the draws.
pub fn covariance<M: ConditionalDensity + ?Sized>(
    model: &M, x_cond: ArrayView2<f64>, opts: &MonteCarloOptions, rng: &mut dyn RngCore,
) -> DensityResult<Array3<f64>> {
    let d = model.ndim_y();
    let mut covs = Array3::zeros((x_cond.nrows(), d, d));
    for (x_row, mut out) in x_cond.outer_iter().zip(covs.outer_iter_mut()) {
        let mut acc = MomentAccumulator::new(d, true);
        for_each_draw_chunk(model, x_row, opts, rng, |y| {
            acc.push(y);
            Ok(())
        })?;
        let cov = acc.covariance().ok_or(DensityError::InvalidOption {
            name: "mc.n_samples",
            value: acc.count() as f64,
            reason: "covariance requires at least two draws",
        })?;
        out.assign(&cov);
    }
    Ok(covs)
}

/// value_at_risk — α-quantile of `n_samples` univariate draws per row.
///
/// # Errors
/// - `ShapeMismatch` if the model is not univariate in `y`.
/// - Propagates `sample` errors and shape / finiteness checks on the draws.
pub fn value_at_risk<M: ConditionalDensity + ?Sized>(
    model: &M, x_cond: ArrayView2<f64>, alpha: f64, opts: &MonteCarloOptions,
    rng: &mut dyn RngCore,
) -> DensityResult<Array1<f64>> {
    require_univariate(model)?;
    let mut vars = Array1::zeros(x_cond.nrows());
    let mut draws = Vec::with_capacity(opts.n_samples);
    for (x_row, out) in x_cond.outer_iter().zip(vars.iter_mut()) {
        draws.clear();
        for_each_draw_chunk(model, x_row, opts, rng, |y| {
            draws.extend(y.column(0).iter().copied());
            Ok(())
        })?;
        *out = percentile(&mut draws, alpha);
    }
    Ok(vars)
}

/// conditional_value_at_risk — mean of draws at or below `thresholds[i]`.
///
/// # Errors
/// - `ShapeMismatch` if the model is not univariate or `thresholds` does not
///   have one entry per row.
/// - `NumericalNonConvergence` if no draw of a row falls at or below its
///   threshold.
/// - Propagates `sample` errors and shape / finiteness checks on the draws.
pub fn conditional_value_at_risk<M: ConditionalDensity + ?Sized>(
    model: &M, x_cond: ArrayView2<f64>, thresholds: ArrayView1<f64>, opts: &MonteCarloOptions,
    rng: &mut dyn RngCore,
) -> DensityResult<Array1<f64>> {
    require_univariate(model)?;
    if thresholds.len() != x_cond.nrows() {
        return Err(DensityError::ShapeMismatch {
            what: "VaR thresholds",
            expected: x_cond.nrows(),
            actual: thresholds.len(),
        });
    }
    let mut cvars = Array1::zeros(x_cond.nrows());
    for ((x_row, &threshold), out) in x_cond.outer_iter().zip(thresholds).zip(cvars.iter_mut()) {
        let mut sum = 0.0;
        let mut count = 0usize;
        for_each_draw_chunk(model, x_row, opts, rng, |y| {
            for &v in y.column(0).iter().filter(|&&v| v <= threshold) {
                sum += v;
                count += 1;
            }
            Ok(())
        })?;
        if count == 0 {
            return Err(DensityError::NumericalNonConvergence {
                iterations: opts.n_samples,
                residual: threshold,
                reason: "no draw fell at or below the VaR threshold",
            });
        }
        *out = sum / count as f64;
    }
    Ok(cvars)
}

/// Linear-interpolation percentile (`h = α (n − 1)`); sorts `values` in
/// place. Returns NaN for an empty slice.
pub fn percentile(values: &mut [f64], alpha: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sort_unstable_by(f64::total_cmp);
    let h = alpha.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    values[lo] + (h - lo as f64) * (values[hi] - values[lo])
}

// ---- Helper methods ----

/// Draw `opts.n_samples` targets for one conditioning row, chunk by chunk.
fn for_each_draw_chunk<M, F>(
    model: &M, x_row: ArrayView1<f64>, opts: &MonteCarloOptions, rng: &mut dyn RngCore,
    mut f: F,
) -> DensityResult<()>
where
    M: ConditionalDensity + ?Sized,
    F: FnMut(ArrayView2<f64>) -> DensityResult<()>,
{
    opts.validate()?;
    let ndim_y = model.ndim_y();
    let mut drawn = 0usize;
    while drawn < opts.n_samples {
        let m = (opts.n_samples - drawn).min(opts.chunk_size);
        let tiled = x_row.broadcast((m, x_row.len())).ok_or(DensityError::ShapeMismatch {
            what: "tiled conditioning row",
            expected: x_row.len(),
            actual: 0,
        })?;
        let (x_drawn, y) = model.sample(tiled, rng)?;
        if x_drawn.nrows() != m {
            return Err(DensityError::ShapeMismatch {
                what: "sampled X rows",
                expected: m,
                actual: x_drawn.nrows(),
            });
        }
        if y.dim() != (m, ndim_y) {
            return Err(DensityError::ShapeMismatch {
                what: "sampled Y",
                expected: m * ndim_y,
                actual: y.len(),
            });
        }
        if let Some((j, &bad)) = y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DensityError::NonFiniteValue {
                what: "sample",
                index: drawn * ndim_y + j,
                value: bad,
            });
        }
        f(y.view())?;
        drawn += m;
        trace!(drawn, total = opts.n_samples, "monte carlo chunk done");
    }
    Ok(())
}

fn require_univariate<M: ConditionalDensity + ?Sized>(model: &M) -> DensityResult<()> {
    let ndim_y = model.ndim_y();
    if ndim_y != 1 {
        return Err(DensityError::ShapeMismatch { what: "ndim_y for quantiles", expected: 1, actual: ndim_y });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::models::{EconDensity, GaussianMixtureDensity};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Exactness of the chunk-merged accumulator against a one-shot
    //   computation.
    // - The linear-interpolation percentile.
    // - Row-wise mean / covariance / VaR / CVaR on reference models.
    // - Seed reproducibility.
    //
    // They intentionally DO NOT cover:
    // - Strategy selection or preconditions; see `statistics::dispatch`.
    // -------------------------------------------------------------------------

    fn opts(n: usize, chunk: usize) -> MonteCarloOptions {
        MonteCarloOptions::new(n, chunk).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Merging chunks gives the same moments as a single pass.
    //
    // Given
    // -----
    // - Five 2-D rows pushed as chunks of sizes 2 and 3.
    //
    // Expect
    // ------
    // - Mean and unbiased covariance equal the direct formulas.
    fn accumulator_merges_chunks_exactly() {
        let data = array![[1.0, 2.0], [2.0, 1.0], [4.0, 0.0], [0.0, 3.0], [3.0, 5.0]];
        let mut acc = MomentAccumulator::new(2, true);

        acc.push(data.slice(ndarray::s![..2, ..]));
        acc.push(data.slice(ndarray::s![2.., ..]));

        let mean = data.mean_axis(Axis(0)).unwrap();
        let centered = &data - &mean;
        let expected = centered.t().dot(&centered) / 4.0;
        let cov = acc.covariance().unwrap();
        for j in 0..2 {
            assert_relative_eq!(acc.mean()[j], mean[j], epsilon = 1e-12);
            for k in 0..2 {
                assert_relative_eq!(cov[[j, k]], expected[[j, k]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // The percentile interpolates linearly between order statistics.
    //
    // Given
    // -----
    // - Values {4, 1, 3, 2, 5}.
    //
    // Expect
    // ------
    // - 0th → 1, 50th → 3, 10th → 1.4, 100th → 5.
    fn percentile_interpolates() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0, 5.0];

        assert_eq!(percentile(&mut values, 0.0), 1.0);
        assert_eq!(percentile(&mut values, 0.5), 3.0);
        assert_relative_eq!(percentile(&mut values, 0.1), 1.4, epsilon = 1e-12);
        assert_eq!(percentile(&mut values, 1.0), 5.0);
    }

    #[test]
    // Purpose
    // -------
    // Sample mean and variance track the economy simulator.
    //
    // Given
    // -----
    // - σ = 0.5 at `x ∈ {1, 2}`, 100_000 draws in chunks of 7_000.
    //
    // Expect
    // ------
    // - Means within 0.02 of `{1, 4}`, variances within 0.01 of 0.25.
    fn mean_and_covariance_track_econ() {
        let model = EconDensity::new(0.5).unwrap();
        let x = array![[1.0], [2.0]];
        let mut rng = StdRng::seed_from_u64(10);

        let means = mean(&model, x.view(), &opts(100_000, 7_000), &mut rng).unwrap();
        let covs = covariance(&model, x.view(), &opts(100_000, 7_000), &mut rng).unwrap();

        assert_abs_diff_eq!(means[[0, 0]], 1.0, epsilon = 0.02);
        assert_abs_diff_eq!(means[[1, 0]], 4.0, epsilon = 0.02);
        assert_abs_diff_eq!(covs[[0, 0, 0]], 0.25, epsilon = 0.01);
        assert_abs_diff_eq!(covs[[1, 0, 0]], 0.25, epsilon = 0.01);
    }

    #[test]
    // Purpose
    // -------
    // VaR and CVaR follow the left-tail convention.
    //
    // Given
    // -----
    // - Standard normal (single-component mixture), 200_000 draws, α = 0.05.
    //
    // Expect
    // ------
    // - VaR ≈ −1.645, CVaR ≈ −φ(1.645)/0.05 ≈ −2.063, CVaR ≤ VaR.
    fn var_and_cvar_of_standard_normal() {
        let model = GaussianMixtureDensity::new(array![1.0], array![[0.0]], array![[1.0]])
            .unwrap()
            .fitted_with(1)
            .unwrap();
        let x = array![[0.0]];
        let mut rng = StdRng::seed_from_u64(12);

        let var = value_at_risk(&model, x.view(), 0.05, &opts(200_000, 50_000), &mut rng).unwrap();
        let cvar =
            conditional_value_at_risk(&model, x.view(), var.view(), &opts(200_000, 50_000), &mut rng)
                .unwrap();

        assert_abs_diff_eq!(var[0], -1.645, epsilon = 0.03);
        assert_abs_diff_eq!(cvar[0], -2.063, epsilon = 0.04);
        assert!(cvar[0] <= var[0]);
    }

    #[test]
    // Purpose
    // -------
    // Identical seeds give bit-identical estimates.
    //
    // Given
    // -----
    // - Two generators seeded with 99; one 2-D mixture.
    //
    // Expect
    // ------
    // - Equal mean arrays.
    fn same_seed_is_reproducible() {
        let model = GaussianMixtureDensity::new(
            array![0.5, 0.5],
            array![[0.0, 1.0], [2.0, -1.0]],
            array![[1.0, 1.0], [0.5, 2.0]],
        )
        .unwrap()
        .fitted_with(1)
        .unwrap();
        let x = array![[0.0], [1.0]];

        let a = mean(&model, x.view(), &opts(5_000, 1_000), &mut StdRng::seed_from_u64(99)).unwrap();
        let b = mean(&model, x.view(), &opts(5_000, 1_000), &mut StdRng::seed_from_u64(99)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    // Purpose
    // -------
    // Hand-built options that skip the constructor are rejected before any
    // draw instead of looping forever or returning an empty estimate.
    //
    // Given
    // -----
    // - `MonteCarloOptions { n_samples: 10, chunk_size: 0 }` and
    //   `{ n_samples: 0, chunk_size: 10 }` on the economy simulator.
    //
    // Expect
    // ------
    // - `InvalidOption` from mean and VaR for both literals.
    fn literal_options_are_validated() {
        let model = EconDensity::new(0.5).unwrap();
        let x = array![[1.0]];
        let mut rng = StdRng::seed_from_u64(14);

        for bad in [
            MonteCarloOptions { n_samples: 10, chunk_size: 0 },
            MonteCarloOptions { n_samples: 0, chunk_size: 10 },
        ] {
            let mean_err = mean(&model, x.view(), &bad, &mut rng).unwrap_err();
            let var_err = value_at_risk(&model, x.view(), 0.1, &bad, &mut rng).unwrap_err();

            assert!(matches!(mean_err, DensityError::InvalidOption { .. }));
            assert!(matches!(var_err, DensityError::InvalidOption { .. }));
        }
    }

    #[test]
    // Purpose
    // -------
    // A threshold below every draw is reported instead of returning NaN.
    //
    // Given
    // -----
    // - Standard normal draws, threshold −100.
    //
    // Expect
    // ------
    // - `NumericalNonConvergence`.
    fn cvar_without_tail_draws_fails() {
        let model = GaussianMixtureDensity::new(array![1.0], array![[0.0]], array![[1.0]])
            .unwrap()
            .fitted_with(1)
            .unwrap();
        let x = array![[0.0]];
        let thresholds = array![-100.0];
        let mut rng = StdRng::seed_from_u64(13);

        let err = conditional_value_at_risk(
            &model,
            x.view(),
            thresholds.view(),
            &opts(1_000, 1_000),
            &mut rng,
        )
        .unwrap_err();

        assert!(matches!(err, DensityError::NumericalNonConvergence { .. }));
    }
}
