// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Errors that can occur during field construction, I/O, or solver setup.
///
/// Ray tracing never produces one of these: an incomplete ray is a normal
/// result, reported through [`crate::raytrace::StopReason`].
#[derive(Debug, Error)]
pub enum EikonalError {
    /// Grid shape is invalid (an axis has no cells).
    #[error("invalid grid shape: axis {axis} has size {size} (must be >= 1)")]
    InvalidShape {
        /// The axis index.
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// Grid has more cells than can be addressed.
    #[error("grid shape {shape:?} has too many cells")]
    ShapeOverflow {
        /// The grid shape as (rows, cols).
        shape: [usize; 2],
    },
    /// A row of nested input has a different length than the first row.
    #[error("non-rectangular field: row {row} has {got} columns, expected {expected}")]
    RaggedRow {
        /// The offending row.
        row: usize,
        /// Column count of the first row.
        expected: usize,
        /// Column count of the offending row.
        got: usize,
    },
    /// Array shape does not match expected shape.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Grid spacing is not positive and finite.
    #[error("invalid grid spacing: {0} (must be positive and finite)")]
    InvalidGridSpacing(f64),
    /// Slowness value is not positive and finite.
    #[error("invalid slowness at index {index}: {value} (must be positive and finite)")]
    InvalidSlowness {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Source cell lies outside the grid.
    #[error("invalid source at {coord:?}: outside grid of shape {shape:?}")]
    InvalidSource {
        /// The source cell as (row, col).
        coord: [usize; 2],
        /// The grid shape as (rows, cols).
        shape: [usize; 2],
    },
    /// Velocity value is not positive and finite.
    #[error("invalid velocity at index {index}: {value} (must be positive and finite)")]
    InvalidVelocity {
        /// The flat index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// Maze dimension is even, too small, or larger than the pixel grid.
    #[error("invalid maze size: {0} (must be odd, >= 3 and fit in the grid)")]
    InvalidMazeSize(usize),
    /// Unsupported data type in file.
    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    #[error("unsupported file format: {0}")]
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    #[error("MAT variable '{expected}' not found; available variables: {available:?}")]
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Other error with a descriptive message.
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results with EikonalError.
pub type Result<T> = std::result::Result<T, EikonalError>;
