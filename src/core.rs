// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::Array2;

use crate::error::{EikonalError, Result};

/// Row-major grid geometry shared by every field in the crate.
///
/// Indices are `[row, col]`. Implementors only supply `shape`; the index
/// conversions and neighbour enumeration are derived from it.
pub trait GridData {
    /// Get the grid shape as `[rows, cols]`.
    fn shape(&self) -> [usize; 2];

    /// Get the total number of cells in the grid.
    fn num_nodes(&self) -> usize {
        let [rows, cols] = self.shape();
        rows * cols
    }

    /// Check whether a signed `(row, col)` lies inside the grid.
    fn in_bounds(&self, row: isize, col: isize) -> bool {
        contains(self.shape(), row, col)
    }

    /// Convert a flat index to a `[row, col]` index.
    fn flat_to_nd(&self, flat: usize) -> [usize; 2] {
        let cols = self.shape()[1];
        [flat / cols, flat % cols]
    }

    /// Convert a `[row, col]` index to a flat index.
    fn nd_to_flat(&self, idx: [usize; 2]) -> usize {
        idx[0] * self.shape()[1] + idx[1]
    }

    /// The in-bounds 4-connected neighbours of `idx`, in the order
    /// up, down, left, right.
    fn neighbors4(&self, idx: [usize; 2]) -> Neighbors4 {
        Neighbors4::new(idx, self.shape())
    }
}

fn contains(shape: [usize; 2], row: isize, col: isize) -> bool {
    row >= 0 && col >= 0 && (row as usize) < shape[0] && (col as usize) < shape[1]
}

/// Iterator over the 4-connected neighbours of a cell.
pub struct Neighbors4 {
    center: [usize; 2],
    shape: [usize; 2],
    next: usize,
}

impl Neighbors4 {
    const OFFSETS: [[isize; 2]; 4] = [[-1, 0], [1, 0], [0, -1], [0, 1]];

    fn new(center: [usize; 2], shape: [usize; 2]) -> Self {
        Neighbors4 {
            center,
            shape,
            next: 0,
        }
    }
}

impl Iterator for Neighbors4 {
    type Item = [usize; 2];

    fn next(&mut self) -> Option<[usize; 2]> {
        while self.next < Self::OFFSETS.len() {
            let [dr, dc] = Self::OFFSETS[self.next];
            self.next += 1;
            let r = self.center[0] as isize + dr;
            let c = self.center[1] as isize + dc;
            if contains(self.shape, r, c) {
                return Some([r as usize, c as usize]);
            }
        }
        None
    }
}

/// Largest cell count whose `f64` buffer a `Vec` can describe.
const MAX_NODES: usize = isize::MAX as usize / std::mem::size_of::<f64>();

/// Check that both axes are non-empty and return the cell count.
pub(crate) fn validate_shape(shape: [usize; 2]) -> Result<usize> {
    for (axis, &size) in shape.iter().enumerate() {
        if size == 0 {
            return Err(EikonalError::InvalidShape { axis, size });
        }
    }
    shape[0]
        .checked_mul(shape[1])
        .filter(|&n| n <= MAX_NODES)
        .ok_or(EikonalError::ShapeOverflow { shape })
}

/// A dense, immutable slowness field (cost per unit distance of crossing a cell).
///
/// Obstacles are encoded by magnitude alone: values orders of magnitude above
/// the background (e.g. `1e4` against `~1.0`) make a region effectively
/// impassable without any separate mask.
#[derive(Debug, Clone, PartialEq)]
pub struct SlownessField {
    shape: [usize; 2],
    values: Box<[f64]>,
}

impl SlownessField {
    /// Create a slowness field from row-major values.
    ///
    /// # Parameters
    /// - `shape`: `[rows, cols]`, each must be >= 1
    /// - `values`: slowness values in row-major order (must all be positive and finite)
    ///
    /// # Errors
    /// Returns an error if an axis is empty, if `rows * cols` overflows, if the
    /// value count does not match the shape, or if any value is not positive and finite.
    pub fn new(shape: [usize; 2], values: Vec<f64>) -> Result<Self> {
        let num_nodes = validate_shape(shape)?;
        if values.len() != num_nodes {
            return Err(EikonalError::ShapeMismatch {
                expected: vec![num_nodes],
                got: vec![values.len()],
            });
        }

        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(EikonalError::InvalidSlowness { index, value });
            }
        }

        Ok(SlownessField {
            shape,
            values: values.into_boxed_slice(),
        })
    }

    /// Create a field where every cell has the same slowness.
    ///
    /// # Errors
    /// Same conditions as [`SlownessField::new`].
    pub fn uniform(shape: [usize; 2], value: f64) -> Result<Self> {
        let num_nodes = validate_shape(shape)?;
        Self::new(shape, vec![value; num_nodes])
    }

    /// Create a field from nested rows.
    ///
    /// # Errors
    /// Returns [`EikonalError::InvalidShape`] for no rows or empty rows and
    /// [`EikonalError::RaggedRow`] when rows differ in length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let num_nodes = validate_shape([rows.len(), cols])?;

        let mut values = Vec::with_capacity(num_nodes);
        for (row, data) in rows.iter().enumerate() {
            if data.len() != cols {
                return Err(EikonalError::RaggedRow {
                    row,
                    expected: cols,
                    got: data.len(),
                });
            }
            values.extend_from_slice(data);
        }
        Self::new([rows.len(), cols], values)
    }

    /// Create a field from a 2-D ndarray (any memory layout).
    ///
    /// # Errors
    /// Same conditions as [`SlownessField::new`].
    pub fn from_array(array: Array2<f64>) -> Result<Self> {
        let (rows, cols) = array.dim();
        let values: Vec<f64> = array.as_standard_layout().iter().copied().collect();
        Self::new([rows, cols], values)
    }

    /// Get the slowness at `[row, col]`.
    pub fn get(&self, idx: [usize; 2]) -> f64 {
        self.values[self.nd_to_flat(idx)]
    }

    /// Get the raw row-major slowness values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl GridData for SlownessField {
    fn shape(&self) -> [usize; 2] {
        self.shape
    }
}

/// First-arrival times produced by one solver invocation.
///
/// `+inf` marks cells the wavefront never reached. The field is immutable once
/// built; the ray tracer only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalTimeField {
    shape: [usize; 2],
    spacing: f64,
    values: Box<[f64]>,
}

impl ArrivalTimeField {
    pub(crate) fn from_parts(shape: [usize; 2], spacing: f64, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), shape[0] * shape[1]);
        ArrivalTimeField {
            shape,
            spacing,
            values: values.into_boxed_slice(),
        }
    }

    /// Get the arrival time at `[row, col]`.
    pub fn get(&self, idx: [usize; 2]) -> f64 {
        self.values[self.nd_to_flat(idx)]
    }

    /// Get the raw row-major arrival times.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Grid spacing the field was solved with.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Whether the wavefront reached `[row, col]`.
    pub fn is_reached(&self, idx: [usize; 2]) -> bool {
        self.get(idx).is_finite()
    }

    /// Number of cells with a finite arrival time.
    pub fn reached_count(&self) -> usize {
        self.values.iter().filter(|t| t.is_finite()).count()
    }

    /// Largest finite arrival time, or `None` if no cell was reached.
    pub fn max_finite(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .max_by(f64::total_cmp)
    }

    /// Copy the field into a `(rows, cols)` ndarray.
    pub fn to_array(&self) -> Array2<f64> {
        let cols = self.shape[1];
        Array2::from_shape_fn((self.shape[0], cols), |(r, c)| self.values[r * cols + c])
    }
}

impl GridData for ArrivalTimeField {
    fn shape(&self) -> [usize; 2] {
        self.shape
    }
}
