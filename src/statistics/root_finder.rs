//! Root finder — bisection inversion of a monotone CDF.
//!
//! Purpose
//! -------
//! Recover the α-quantile of a univariate conditional distribution when only
//! its CDF is available, by bisection over a fixed search interval.
//!
//! Key behaviors
//! -------------
//! - [`bisect`] halves `[lower, upper]` until `|F(mid) − target| ≤ eps`.
//!   `F(mid) > target` moves the upper bound to `mid`, otherwise the lower
//!   bound moves.
//! - The iteration cap is enforced: exceeding it is an error, never a stale
//!   midpoint.
//! - The target must be bracketed: `F(lower) ≤ target ≤ F(upper)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `F` is non-decreasing. A non-monotone or discontinuous `F` can prevent
//!   the residual from reaching `eps`; the cap, the bracket check and the
//!   interval-collapse check turn this into
//!   [`DensityError::NumericalNonConvergence`].
//! - Quantiles outside the configured interval are not found; widen
//!   `BisectionOptions::{lower, upper}` for extreme tails.
use crate::density::{
    core::options::BisectionOptions,
    errors::{DensityError, DensityResult},
};

/// Result of a converged bisection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    /// Final midpoint.
    pub value: f64,
    /// Midpoint evaluations performed.
    pub iterations: usize,
    /// `|F(value) − target|` at termination.
    pub residual: f64,
}

/// bisect — solve `F(y) = target` for a non-decreasing `F`.
///
/// Parameters
/// ----------
/// - `f`: `FnMut(f64) -> DensityResult<f64>`
///   The CDF (or any non-decreasing function).
/// - `target`: `f64`
///   Level to invert, e.g. the quantile α.
/// - `opts`: `&BisectionOptions`
///   Search interval, residual tolerance, and iteration cap.
///
/// Returns
/// -------
/// `DensityResult<Root>` with the midpoint satisfying the tolerance.
///
/// Errors
/// ------
/// - `NonFiniteValue` if `f` returns NaN/±inf.
/// - `NumericalNonConvergence` if the target is not bracketed by the
///   interval, the interval collapses in floating point, or `max_iter`
///   evaluations pass without meeting `eps`.
/// - Any error returned by `f`.
pub fn bisect<F>(mut f: F, target: f64, opts: &BisectionOptions) -> DensityResult<Root>
where
    F: FnMut(f64) -> DensityResult<f64>,
{
    let mut left = opts.lower;
    let mut right = opts.upper;

    let f_left = finite(f(left)?, 0)?;
    if f_left > target + opts.eps {
        return Err(DensityError::NumericalNonConvergence {
            iterations: 0,
            residual: f_left - target,
            reason: "target lies below the search interval",
        });
    }
    let f_right = finite(f(right)?, 0)?;
    if f_right < target - opts.eps {
        return Err(DensityError::NumericalNonConvergence {
            iterations: 0,
            residual: target - f_right,
            reason: "target lies above the search interval",
        });
    }

    let mut residual = f64::INFINITY;
    for iteration in 1..=opts.max_iter {
        let middle = 0.5 * (left + right);
        if middle <= left || middle >= right {
            return Err(DensityError::NumericalNonConvergence {
                iterations: iteration - 1,
                residual,
                reason: "search interval collapsed before reaching tolerance",
            });
        }
        let p = finite(f(middle)?, iteration)?;
        residual = (p - target).abs();
        if residual <= opts.eps {
            return Ok(Root { value: middle, iterations: iteration, residual });
        }
        if p > target {
            right = middle;
        } else {
            left = middle;
        }
    }
    Err(DensityError::NumericalNonConvergence {
        iterations: opts.max_iter,
        residual,
        reason: "iteration cap reached",
    })
}

// ---- Helper methods ----

fn finite(value: f64, index: usize) -> DensityResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DensityError::NonFiniteValue { what: "cdf", index, value })
    }
}
