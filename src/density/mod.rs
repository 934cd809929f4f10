//! density — the fitted-model side of the crate: contract, core value types,
//! errors, and reference models.
//!
//! Purpose
//! -------
//! Define what the statistic core may assume about a fitted conditional
//! density `p(y | x)`, and provide the validated value types shared with the
//! statistic strategies.
//!
//! Key behaviors
//! -------------
//! - [`model::ConditionalDensity`] is the capability-declaring model contract.
//! - [`core`] holds the dimensionality guard, capability descriptor, mixture
//!   components, and statistic options.
//! - [`errors`] centralizes [`DensityError`] / [`DensityResult`].
//! - [`models`] ships reference densities used to exercise every strategy.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models are fitted elsewhere and only read by the statistic core.
//! - `(ndim_x, ndim_y)` is fixed once recorded.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; rows are observations or conditioning points.
//! - This layer performs no I/O and no logging.
pub mod core;
pub mod errors;
pub mod model;
pub mod models;

pub use self::core::{
    BisectionOptions, Capabilities, DensityShape, IntegrationOptions, MixtureComponents,
    MonteCarloOptions, StatOptions,
};
pub use self::errors::{DensityError, DensityResult, Precondition};
pub use self::model::ConditionalDensity;
pub use self::models::{EconDensity, GaussianMixtureDensity, Restricted};
