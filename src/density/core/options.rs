//! Statistic options — configuration for Monte-Carlo, integration, and
//! quantile-inversion strategies.
//!
//! Purpose
//! -------
//! Collect every numerical knob used by the statistic strategies in one
//! place, so that sample sizes, memory bounds, search intervals, and
//! tolerances are explicit at the call site instead of hardcoded.
//!
//! Key behaviors
//! -------------
//! - [`MonteCarloOptions`]: draws per conditioning row and the chunk size used
//!   to bound peak memory while tiling conditioning rows.
//! - [`IntegrationOptions`]: Cauchy proposal draws, chunk size, and the
//!   proposal-density floor below which draws are discarded.
//! - [`BisectionOptions`]: search interval, residual tolerance, and the
//!   iteration cap of the quantile root finder.
//! - [`StatOptions`]: bundle of the above plus the mixture weight tolerance.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every constructor validates its inputs and returns
//!   [`DensityError::InvalidOption`] on failure; `Default` values are valid.
//! - Randomness is not configured here: generators are passed explicitly to
//!   each statistic call.
//!
//! Testing notes
//! -------------
//! - Unit tests check the documented defaults and each rejection path.
use crate::density::errors::{DensityError, DensityResult};

/// Default number of draws per conditioning row (Monte Carlo and integration).
pub const DEFAULT_N_SAMPLES: usize = 1_000_000;

/// Default number of rows materialized per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 65_536;

/// Default search interval of the bisection root finder.
pub const DEFAULT_BISECTION_BOUNDS: (f64, f64) = (-1e8, 1e8);

/// Default residual tolerance `|cdf(mid) − α|` of the root finder.
pub const DEFAULT_BISECTION_EPS: f64 = 1e-8;

/// Default iteration cap of the root finder.
pub const DEFAULT_BISECTION_MAX_ITER: usize = 200;

/// Default tolerance on `|Σ_k w_k − 1|` for mixture weights.
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 1e-6;

/// Default proposal-density floor for importance sampling.
pub const DEFAULT_MIN_PROPOSAL_DENSITY: f64 = 1e-300;

/// MonteCarloOptions — sampling-based estimation settings.
///
/// Fields
/// ------
/// - `n_samples`: `usize`
///   Draws per conditioning row (≥ 2, so that unbiased covariances exist).
/// - `chunk_size`: `usize`
///   Maximum number of tiled conditioning rows handed to `sample` at once
///   (≥ 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloOptions {
    pub n_samples: usize,
    pub chunk_size: usize,
}

impl MonteCarloOptions {
    /// Construct validated Monte-Carlo options.
    ///
    /// # Errors
    /// [`DensityError::InvalidOption`] if `n_samples < 2` or `chunk_size == 0`.
    pub fn new(n_samples: usize, chunk_size: usize) -> DensityResult<MonteCarloOptions> {
        if n_samples < 2 {
            return Err(DensityError::InvalidOption {
                name: "mc.n_samples",
                value: n_samples as f64,
                reason: "at least two draws are required",
            });
        }
        verify_chunk_size("mc.chunk_size", chunk_size)?;
        Ok(MonteCarloOptions { n_samples, chunk_size })
    }

    /// Re-run the constructor checks; fields are public, so literals can
    /// bypass [`MonteCarloOptions::new`].
    ///
    /// # Errors
    /// As [`MonteCarloOptions::new`].
    pub fn validate(&self) -> DensityResult<()> {
        MonteCarloOptions::new(self.n_samples, self.chunk_size).map(|_| ())
    }
}

impl Default for MonteCarloOptions {
    fn default() -> Self {
        MonteCarloOptions { n_samples: DEFAULT_N_SAMPLES, chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

/// IntegrationOptions — Cauchy importance-sampling settings.
///
/// Fields
/// ------
/// - `n_samples`: `usize`
///   Proposal draws (≥ 1).
/// - `chunk_size`: `usize`
///   Proposal points evaluated per integrand call (≥ 1).
/// - `min_proposal_density`: `f64`
///   Draws whose proposal density falls below this floor contribute zero
///   to the estimate instead of `f(y) / q(y)`. Finite and ≥ 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationOptions {
    pub n_samples: usize,
    pub chunk_size: usize,
    pub min_proposal_density: f64,
}

impl IntegrationOptions {
    /// Construct validated integration options.
    ///
    /// # Errors
    /// [`DensityError::InvalidOption`] if `n_samples == 0`, `chunk_size == 0`,
    /// or `min_proposal_density` is negative or non-finite.
    pub fn new(
        n_samples: usize, chunk_size: usize, min_proposal_density: f64,
    ) -> DensityResult<IntegrationOptions> {
        if n_samples == 0 {
            return Err(DensityError::InvalidOption {
                name: "integration.n_samples",
                value: 0.0,
                reason: "at least one proposal draw is required",
            });
        }
        verify_chunk_size("integration.chunk_size", chunk_size)?;
        if !min_proposal_density.is_finite() || min_proposal_density < 0.0 {
            return Err(DensityError::InvalidOption {
                name: "integration.min_proposal_density",
                value: min_proposal_density,
                reason: "must be finite and >= 0",
            });
        }
        Ok(IntegrationOptions { n_samples, chunk_size, min_proposal_density })
    }

    /// Re-run the constructor checks on a possibly hand-built value.
    ///
    /// # Errors
    /// As [`IntegrationOptions::new`].
    pub fn validate(&self) -> DensityResult<()> {
        IntegrationOptions::new(self.n_samples, self.chunk_size, self.min_proposal_density)
            .map(|_| ())
    }
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        IntegrationOptions {
            n_samples: DEFAULT_N_SAMPLES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_proposal_density: DEFAULT_MIN_PROPOSAL_DENSITY,
        }
    }
}

/// BisectionOptions — quantile root-finder settings.
///
/// Fields
/// ------
/// - `lower`, `upper`: `f64`
///   Finite search interval with `lower < upper`.
/// - `eps`: `f64`
///   Residual tolerance on `|cdf(mid) − α|`, finite and > 0.
/// - `max_iter`: `usize`
///   Maximum number of midpoint evaluations (≥ 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BisectionOptions {
    pub lower: f64,
    pub upper: f64,
    pub eps: f64,
    pub max_iter: usize,
}

impl BisectionOptions {
    /// Construct validated bisection options.
    ///
    /// # Errors
    /// [`DensityError::InvalidOption`] if the bounds are non-finite or not
    /// ordered, `eps` is not finite and positive, or `max_iter == 0`.
    pub fn new(lower: f64, upper: f64, eps: f64, max_iter: usize) -> DensityResult<BisectionOptions> {
        if !lower.is_finite() {
            return Err(DensityError::InvalidOption {
                name: "bisection.lower",
                value: lower,
                reason: "must be finite",
            });
        }
        if !upper.is_finite() || upper <= lower {
            return Err(DensityError::InvalidOption {
                name: "bisection.upper",
                value: upper,
                reason: "must be finite and strictly greater than lower",
            });
        }
        if !eps.is_finite() || eps <= 0.0 {
            return Err(DensityError::InvalidOption {
                name: "bisection.eps",
                value: eps,
                reason: "must be finite and > 0",
            });
        }
        if max_iter == 0 {
            return Err(DensityError::InvalidOption {
                name: "bisection.max_iter",
                value: 0.0,
                reason: "at least one iteration is required",
            });
        }
        Ok(BisectionOptions { lower, upper, eps, max_iter })
    }
}

impl Default for BisectionOptions {
    fn default() -> Self {
        BisectionOptions {
            lower: DEFAULT_BISECTION_BOUNDS.0,
            upper: DEFAULT_BISECTION_BOUNDS.1,
            eps: DEFAULT_BISECTION_EPS,
            max_iter: DEFAULT_BISECTION_MAX_ITER,
        }
    }
}

/// StatOptions — full configuration of a statistic request.
///
/// Purpose
/// -------
/// Bundle the per-strategy options so public APIs accept a single handle
/// rather than separate sample sizes, bounds, and tolerances.
///
/// Fields
/// ------
/// - `mc`: [`MonteCarloOptions`] for sample-based mean, covariance, VaR, CVaR.
/// - `integration`: [`IntegrationOptions`] for `pdf`-based mean/covariance.
/// - `bisection`: [`BisectionOptions`] for `cdf`-based VaR.
/// - `weight_tolerance`: `f64`
///   Accepted deviation of mixture weight rows from 1 (finite, ≥ 0).
///
/// Notes
/// -----
/// - `StatOptions::default()` reproduces the classic settings: one million
///   draws, a `[-1e8, 1e8]` search interval and `1e-8` residual tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatOptions {
    pub mc: MonteCarloOptions,
    pub integration: IntegrationOptions,
    pub bisection: BisectionOptions,
    pub weight_tolerance: f64,
}

impl StatOptions {
    /// Construct a [`StatOptions`] from already-validated components.
    ///
    /// # Errors
    /// [`DensityError::InvalidOption`] if `weight_tolerance` is negative or
    /// non-finite.
    pub fn new(
        mc: MonteCarloOptions, integration: IntegrationOptions, bisection: BisectionOptions,
        weight_tolerance: f64,
    ) -> DensityResult<StatOptions> {
        if !weight_tolerance.is_finite() || weight_tolerance < 0.0 {
            return Err(DensityError::InvalidOption {
                name: "weight_tolerance",
                value: weight_tolerance,
                reason: "must be finite and >= 0",
            });
        }
        Ok(StatOptions { mc, integration, bisection, weight_tolerance })
    }

    /// Same options with `n` draws for both sampling strategies.
    ///
    /// # Errors
    /// Propagates validation errors of the rebuilt sub-options.
    pub fn with_n_samples(self, n: usize) -> DensityResult<StatOptions> {
        let mc = MonteCarloOptions::new(n, self.mc.chunk_size)?;
        let integration = IntegrationOptions::new(
            n,
            self.integration.chunk_size,
            self.integration.min_proposal_density,
        )?;
        Ok(StatOptions { mc, integration, ..self })
    }
}

impl Default for StatOptions {
    fn default() -> Self {
        StatOptions {
            mc: MonteCarloOptions::default(),
            integration: IntegrationOptions::default(),
            bisection: BisectionOptions::default(),
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
        }
    }
}

// ---- Helper methods ----

fn verify_chunk_size(name: &'static str, chunk_size: usize) -> DensityResult<()> {
    if chunk_size == 0 {
        return Err(DensityError::InvalidOption {
            name,
            value: 0.0,
            reason: "chunk size must be >= 1",
        });
    }
    Ok(())
}
