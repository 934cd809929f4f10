//! Density shape — record and verify `(ndim_x, ndim_y)` of a conditional model.
//!
//! Purpose
//! -------
//! Act as the dimensionality guard for every entry point that accepts
//! conditioning inputs `X` and targets `Y`. Inputs are normalized to
//! two-dimensional views and checked against the dimensions recorded when the
//! model was fitted.
//!
//! Key behaviors
//! -------------
//! - [`as_matrix`] promotes a 1-D array to a single-column matrix and passes
//!   2-D arrays through without copying.
//! - [`handle_input_dimensionality`] records a [`DensityShape`] on the fitting
//!   path and verifies column counts on the evaluation path.
//! - Row counts of co-indexed `X` and `Y` must agree on both paths.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ndim_x ≥ 1` and `ndim_y ≥ 1` for every recorded shape.
//! - The shape is fixed for the model's lifetime once recorded; the guard
//!   never mutates a model itself; callers persist the returned shape.
//!
//! Conventions
//! -----------
//! - Rows index observations / conditioning points; columns index dimensions.
//! - All failures are reported as [`DensityError::ShapeMismatch`] with the
//!   subject of the comparison in `what`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover promotion of 1-D inputs, rejection of higher ranks,
//!   the fitting/evaluation split, and row-count mismatches.
use crate::density::errors::{DensityError, DensityResult};
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};

/// DensityShape — recorded dimensionality of a fitted conditional model.
///
/// Fields
/// ------
/// - `ndim_x`: `usize`
///   Number of columns of the conditioning input `X` (≥ 1).
/// - `ndim_y`: `usize`
///   Number of columns of the target `Y` (≥ 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityShape {
    pub ndim_x: usize,
    pub ndim_y: usize,
}

impl DensityShape {
    /// Construct a validated [`DensityShape`].
    ///
    /// # Errors
    /// Returns [`DensityError::ShapeMismatch`] if either dimension is zero.
    pub fn new(ndim_x: usize, ndim_y: usize) -> DensityResult<DensityShape> {
        if ndim_x == 0 {
            return Err(DensityError::ShapeMismatch { what: "ndim_x (>= 1)", expected: 1, actual: 0 });
        }
        if ndim_y == 0 {
            return Err(DensityError::ShapeMismatch { what: "ndim_y (>= 1)", expected: 1, actual: 0 });
        }
        Ok(DensityShape { ndim_x, ndim_y })
    }

    /// Verify that `x` has `ndim_x` columns.
    pub fn check_x(&self, x: &ArrayView2<f64>) -> DensityResult<()> {
        if x.ncols() != self.ndim_x {
            return Err(DensityError::ShapeMismatch {
                what: "X columns",
                expected: self.ndim_x,
                actual: x.ncols(),
            });
        }
        Ok(())
    }

    /// Verify that `y` has `ndim_y` columns.
    pub fn check_y(&self, y: &ArrayView2<f64>) -> DensityResult<()> {
        if y.ncols() != self.ndim_y {
            return Err(DensityError::ShapeMismatch {
                what: "Y columns",
                expected: self.ndim_y,
                actual: y.ncols(),
            });
        }
        Ok(())
    }

    /// Verify `x`, `y` columns and matching row counts.
    pub fn check_xy(&self, x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> DensityResult<()> {
        check_rows(x, y)?;
        self.check_x(x)?;
        self.check_y(y)
    }
}

/// Promote an arbitrary-rank view to a 2-D matrix view.
///
/// - Rank 1 of length `n` becomes `(n, 1)`.
/// - Rank 2 is returned unchanged.
///
/// # Errors
/// Returns [`DensityError::ShapeMismatch`] (`what = "array rank"`) for any
/// other rank.
pub fn as_matrix<'a>(a: ArrayViewD<'a, f64>) -> DensityResult<ArrayView2<'a, f64>> {
    match a.ndim() {
        1 => {
            let column = a.insert_axis(Axis(1));
            column
                .into_dimensionality::<Ix2>()
                .map_err(|_| DensityError::ShapeMismatch { what: "array rank", expected: 2, actual: 1 })
        }
        2 => a
            .into_dimensionality::<Ix2>()
            .map_err(|_| DensityError::ShapeMismatch { what: "array rank", expected: 2, actual: 2 }),
        other => Err(DensityError::ShapeMismatch { what: "array rank", expected: 2, actual: other }),
    }
}

/// handle_input_dimensionality — normalize and verify `X` (and optionally `Y`).
///
/// Parameters
/// ----------
/// - `recorded`: `Option<DensityShape>`
///   Shape recorded at fit time. Ignored on the fitting path; required on the
///   evaluation path.
/// - `x`: `ArrayViewD<f64>`
///   Conditioning input, rank 1 or 2.
/// - `y`: `Option<ArrayViewD<f64>>`
///   Target values, rank 1 or 2. Required when `fitting` is `true`.
/// - `fitting`: `bool`
///   `true` records a fresh shape; `false` checks against `recorded`.
///
/// Returns
/// -------
/// `(x, y, shape)` with both inputs as 2-D views and the shape the caller
/// should persist (fitting) or the verified shape (evaluation).
///
/// Errors
/// ------
/// - `ShapeMismatch` on rank > 2, zero-width inputs, column mismatches, or
///   differing row counts.
/// - `PreconditionViolation(NotFitted)` when evaluating without a recorded
///   shape.
/// - `UnsupportedOperation` when fitting without `Y`.
pub fn handle_input_dimensionality<'a>(
    recorded: Option<DensityShape>, x: ArrayViewD<'a, f64>, y: Option<ArrayViewD<'a, f64>>,
    fitting: bool,
) -> DensityResult<(ArrayView2<'a, f64>, Option<ArrayView2<'a, f64>>, DensityShape)> {
    let x = as_matrix(x)?;
    let y = y.map(as_matrix).transpose()?;
    if let Some(y) = &y {
        check_rows(&x, y)?;
    }

    let shape = if fitting {
        let y = y.as_ref().ok_or(DensityError::UnsupportedOperation {
            operation: "fit",
            reason: "recording dimensionality requires targets Y",
        })?;
        DensityShape::new(x.ncols(), y.ncols())?
    } else {
        let shape = recorded.ok_or_else(DensityError::not_fitted)?;
        shape.check_x(&x)?;
        if let Some(y) = &y {
            shape.check_y(y)?;
        }
        shape
    };
    Ok((x, y, shape))
}

// ---- Helper methods ----

fn check_rows(x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> DensityResult<()> {
    if x.nrows() != y.nrows() {
        return Err(DensityError::ShapeMismatch {
            what: "X/Y row count",
            expected: x.nrows(),
            actual: y.nrows(),
        });
    }
    Ok(())
}
