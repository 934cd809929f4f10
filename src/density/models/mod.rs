//! models — reference conditional densities.
//!
//! - [`EconDensity`]: `y = x² + N(0, σ²)` simulator with `pdf`, `cdf`, `sample`.
//! - [`GaussianMixtureDensity`]: diagonal Gaussian mixture with
//!   `mixture_components`, `pdf`, `sample`.
//! - [`Restricted`]: capability mask over any model.
pub mod econ;
pub mod gaussian_mixture;
pub mod restricted;

pub use self::econ::EconDensity;
pub use self::gaussian_mixture::GaussianMixtureDensity;
pub use self::restricted::Restricted;
