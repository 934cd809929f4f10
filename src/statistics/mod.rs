//! statistics — derived distributional statistics of fitted conditional
//! densities.
//!
//! Purpose
//! -------
//! Compute the conditional mean, covariance, Value-at-Risk, and Conditional
//! Value-at-Risk of a fitted [`crate::density::ConditionalDensity`] without
//! requiring closed-form formulas from every model. The entry point is
//! [`StatisticDispatcher`]; the strategies it routes to are public for
//! callers that want a specific estimator.
//!
//! Key behaviors
//! -------------
//! - [`dispatch`]: capability-based strategy selection and preconditions.
//! - [`mixture`]: closed-form moments and CDF of diagonal Gaussian mixtures.
//! - [`integration`]: Cauchy importance-sampled integration of `pdf`
//!   moments.
//! - [`monte_carlo`]: chunked, streaming sample statistics.
//! - [`root_finder`]: bisection inversion of monotone CDFs.
//! - [`linalg`]: eigenvalue checks on covariance estimates.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models are only read; every strategy borrows them immutably.
//! - Random draws come exclusively from the caller's generator, so equal
//!   seeds reproduce results bit for bit.
//!
//! Conventions
//! -----------
//! - Estimates are returned as owned `ndarray` arrays with one leading row
//!   per conditioning point.
//! - Strategy selection, chunk progress, and root-finder convergence are
//!   reported through `tracing` at `debug`/`trace`; a materially negative
//!   eigenvalue in an integrated covariance is a `warn` event.
pub mod dispatch;
pub mod integration;
pub mod linalg;
pub mod mixture;
pub mod monte_carlo;
pub mod root_finder;

pub use self::dispatch::{
    CdfStrategy, CovarianceStrategy, MeanStrategy, QuantileStrategy, ShortfallStrategy,
    StatisticDispatcher,
};
pub use self::mixture::MixtureAggregator;
pub use self::monte_carlo::MomentAccumulator;
pub use self::root_finder::{Root, bisect};

pub mod prelude {
    pub use super::StatisticDispatcher;
    pub use crate::density::{
        Capabilities, ConditionalDensity, DensityError, DensityResult, StatOptions,
    };
}
