//! Errors for conditional density statistics (preconditions, shape checks,
//! capability dispatch, mixture integrity, and numerical failures).
//!
//! This module defines the model/statistic error type, [`DensityError`], and
//! the precondition payload, [`Precondition`], used across the dispatcher, the
//! estimation strategies, and the reference models. Both implement
//! `Display`; [`DensityError`] also implements `Error`.
//!
//! ## Conventions
//! - **Indices are 0-based** (rows of `x_cond`, mixture rows, sample indices).
//! - Errors are raised synchronously and never retried internally; a batch
//!   request either yields a full batch of estimates or one of these errors.
//! - `statrs` constructor failures are normalized to
//!   [`DensityError::InvalidDistribution`] with a human-readable reason.
use statrs::distribution::{CauchyError, NormalError};

/// Crate-wide result alias for operations that may produce [`DensityError`].
pub type DensityResult<T> = Result<T, DensityError>;

/// Conditions a statistic request must satisfy before any strategy runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precondition {
    /// The model's fitted gate is closed.
    NotFitted,

    /// VaR/CVaR are only defined for univariate targets.
    NonUnivariateTarget { ndim_y: usize },

    /// Quantile level must lie strictly inside (0, 1).
    AlphaOutOfRange { alpha: f64 },
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precondition::NotFitted => write!(f, "model must be fitted"),
            Precondition::NonUnivariateTarget { ndim_y } => {
                write!(f, "VaR/CVaR require ndim_y = 1; model has ndim_y = {ndim_y}")
            }
            Precondition::AlphaOutOfRange { alpha } => {
                write!(f, "alpha must lie in (0, 1); got {alpha}")
            }
        }
    }
}

/// Unified error type for statistic computation on fitted conditional
/// densities.
///
/// Covers request preconditions, input dimensionality, missing capabilities,
/// upstream mixture integrity, root-finder convergence, option validation,
/// and non-finite numerics.
#[derive(Debug, Clone, PartialEq)]
pub enum DensityError {
    // ---- Request preconditions ----
    /// Model not fitted, non-univariate target for VaR/CVaR, or invalid α.
    PreconditionViolation(Precondition),

    // ---- Input dimensionality ----
    /// Input dimensionality disagrees with the recorded (ndim_x, ndim_y) or
    /// co-indexed arrays have different row counts.
    ShapeMismatch { what: &'static str, expected: usize, actual: usize },

    // ---- Capability dispatch ----
    /// No strategy for the requested statistic is available on this model.
    UnsupportedOperation { operation: &'static str, reason: &'static str },

    // ---- Mixture integrity ----
    /// Mixture parameters delivered by the model violate their invariants.
    InvalidMixtureState { row: usize, reason: &'static str, value: f64 },

    // ---- Numerical failures ----
    /// Iterative search stopped without meeting its tolerance.
    NumericalNonConvergence { iterations: usize, residual: f64, reason: &'static str },

    /// A density, CDF, or integrand evaluation produced NaN/±inf.
    NonFiniteValue { what: &'static str, index: usize, value: f64 },

    // ---- Options ----
    /// Option value rejected by its validating constructor.
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    // ---- statrs distribution errors ----
    /// Wrapper for `statrs` distribution constructor errors.
    InvalidDistribution { reason: &'static str },
}

impl std::error::Error for DensityError {}

impl std::fmt::Display for DensityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Request preconditions ----
            DensityError::PreconditionViolation(precondition) => {
                write!(f, "Precondition violated: {precondition}.")
            }
            // ---- Input dimensionality ----
            DensityError::ShapeMismatch { what, expected, actual } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, got {actual}")
            }
            // ---- Capability dispatch ----
            DensityError::UnsupportedOperation { operation, reason } => {
                write!(f, "Operation '{operation}' is not supported: {reason}")
            }
            // ---- Mixture integrity ----
            DensityError::InvalidMixtureState { row, reason, value } => {
                write!(f, "Invalid mixture state at row {row}: {reason} (value {value})")
            }
            // ---- Numerical failures ----
            DensityError::NumericalNonConvergence { iterations, residual, reason } => {
                write!(
                    f,
                    "No convergence after {iterations} iterations (residual {residual}): {reason}"
                )
            }
            DensityError::NonFiniteValue { what, index, value } => {
                write!(f, "Non-finite {what} at index {index}: {value}")
            }
            // ---- Options ----
            DensityError::InvalidOption { name, value, reason } => {
                write!(f, "Invalid option {name} = {value}: {reason}")
            }
            // ---- statrs distribution errors ----
            DensityError::InvalidDistribution { reason } => {
                write!(f, "Invalid distribution parameters: {reason}")
            }
        }
    }
}

impl DensityError {
    /// Shorthand for the fitted-gate failure.
    pub const fn not_fitted() -> DensityError {
        DensityError::PreconditionViolation(Precondition::NotFitted)
    }

    /// `true` for any [`DensityError::PreconditionViolation`].
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, DensityError::PreconditionViolation(_))
    }
}

impl From<Precondition> for DensityError {
    fn from(precondition: Precondition) -> DensityError {
        DensityError::PreconditionViolation(precondition)
    }
}

impl From<NormalError> for DensityError {
    fn from(err: NormalError) -> DensityError {
        match err {
            NormalError::MeanInvalid => {
                DensityError::InvalidDistribution { reason: "normal mean must be finite" }
            }
            NormalError::StandardDeviationInvalid => DensityError::InvalidDistribution {
                reason: "normal standard deviation must be finite and > 0",
            },
            #[allow(unreachable_patterns)]
            _ => DensityError::InvalidDistribution { reason: "normal parameters rejected" },
        }
    }
}

impl From<CauchyError> for DensityError {
    fn from(err: CauchyError) -> DensityError {
        match err {
            CauchyError::LocationInvalid => {
                DensityError::InvalidDistribution { reason: "cauchy location must be finite" }
            }
            CauchyError::ScaleInvalid => DensityError::InvalidDistribution {
                reason: "cauchy scale must be finite and > 0",
            },
            #[allow(unreachable_patterns)]
            _ => DensityError::InvalidDistribution { reason: "cauchy parameters rejected" },
        }
    }
}
