//! core — building blocks shared by conditional density models and the
//! statistic strategies.
//!
//! Purpose
//! -------
//! Group the small, validated value types every other layer depends on:
//! recorded dimensionality, capability descriptors, mixture parameters, and
//! statistic options.
//!
//! Key behaviors
//! -------------
//! - [`shape`]: the dimensionality guard ([`DensityShape`], [`as_matrix`],
//!   [`handle_input_dimensionality`]).
//! - [`capabilities`]: the [`Capabilities`] descriptor resolved once per call.
//! - [`components`]: [`MixtureComponents`] and their integrity checks.
//! - [`options`]: [`StatOptions`] and the per-strategy option structs.
//!
//! Conventions
//! -----------
//! - Constructors validate and return [`crate::density::errors::DensityResult`];
//!   nothing in this module panics on user input.
pub mod capabilities;
pub mod components;
pub mod options;
pub mod shape;

pub use self::capabilities::Capabilities;
pub use self::components::MixtureComponents;
pub use self::options::{BisectionOptions, IntegrationOptions, MonteCarloOptions, StatOptions};
pub use self::shape::{DensityShape, as_matrix, handle_input_dimensionality};
