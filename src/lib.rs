//! rust_cde — statistics of fitted conditional density estimators.
//!
//! Purpose
//! -------
//! Derive the conditional mean, covariance, Value-at-Risk (VaR), and
//! Conditional Value-at-Risk (CVaR) of a fitted model `p(y | x)`, choosing
//! between closed-form mixture formulas, importance-sampled integration of
//! the density, Monte-Carlo simulation, and bisection on the CDF according
//! to the primitives the model implements.
//!
//! Key behaviors
//! -------------
//! - [`density`] defines the model contract ([`ConditionalDensity`]), the
//!   capability descriptor, the dimensionality guard, options, errors, and
//!   reference models.
//! - [`statistics`] hosts the [`StatisticDispatcher`] and the estimation
//!   strategies it routes to.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models are fitted elsewhere; this crate only reads them.
//! - Every stochastic routine takes an explicit `&mut dyn rand::RngCore`.
//! - No partial results: a batch request returns either one estimate per
//!   conditioning row or a [`DensityError`].
//!
//! Conventions
//! -----------
//! - Indexing is 0-based. Conditioning inputs are `(n, ndim_x)` matrices;
//!   1-D inputs are promoted to one column by the dimensionality guard.
//! - VaR is the left-tail α-quantile and CVaR(α) ≤ VaR(α).
//! - The library emits `tracing` events but installs no subscriber.
//!
//! Downstream usage
//! ----------------
//! - Implement [`ConditionalDensity`] for a fitted estimator, declare its
//!   capabilities, and wrap it in a [`StatisticDispatcher`].
//! - Use [`density::Restricted`] to force a model down a particular strategy
//!   when cross-checking estimators.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; cross-strategy agreement and the
//!   end-to-end scenarios are in `tests/integration_statistics_pipeline.rs`.

pub mod density;
pub mod statistics;

pub use crate::density::{ConditionalDensity, DensityError, DensityResult, StatOptions};
pub use crate::statistics::StatisticDispatcher;
