// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Synthetic slowness fields for demos, tests and benchmarks.
//!
//! Every generator returns a validated [`SlownessField`]; non-positive or
//! non-finite parameters surface as [`EikonalError::InvalidSlowness`].

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::core::{validate_shape, SlownessField};
use crate::error::{EikonalError, Result};

/// Slowness assigned to maze walls.
pub const OBSTACLE_SLOWNESS: f64 = 1.0e4;

/// Slowness assigned to maze corridors.
pub const CORRIDOR_SLOWNESS: f64 = 1.0;

fn fill_with(shape: [usize; 2], f: impl Fn(usize, usize) -> f64) -> Result<SlownessField> {
    let [rows, cols] = shape;
    let mut values = Vec::with_capacity(validate_shape(shape)?);
    for r in 0..rows {
        for c in 0..cols {
            values.push(f(r, c));
        }
    }
    SlownessField::new(shape, values)
}

/// Column index where a fractional interface starts.
fn split_col(cols: usize, frac: f64) -> usize {
    ((cols as f64 * frac).floor().max(0.0) as usize).min(cols)
}

/// Constant slowness `n` everywhere.
pub fn homogeneous(shape: [usize; 2], n: f64) -> Result<SlownessField> {
    SlownessField::uniform(shape, n)
}

/// Slowness rising linearly from `n_min` on the first row to `n_max` on the last.
pub fn vertical_gradient(shape: [usize; 2], n_min: f64, n_max: f64) -> Result<SlownessField> {
    let denom = shape[0].saturating_sub(1).max(1) as f64;
    fill_with(shape, |r, _| n_min + (n_max - n_min) * (r as f64 / denom))
}

/// Two half-spaces split by a vertical interface.
///
/// Columns at or beyond `floor(cols * interface_frac)` take `n2`.
pub fn planar_interface(
    shape: [usize; 2],
    interface_frac: f64,
    n1: f64,
    n2: f64,
) -> Result<SlownessField> {
    let split = split_col(shape[1], interface_frac);
    fill_with(shape, |_, c| if c >= split { n2 } else { n1 })
}

/// Three vertical slabs with interfaces at `x1_frac` and `x2_frac` of the width.
pub fn double_interface(
    shape: [usize; 2],
    x1_frac: f64,
    x2_frac: f64,
    n1: f64,
    n2: f64,
    n3: f64,
) -> Result<SlownessField> {
    let first = split_col(shape[1], x1_frac);
    let second = split_col(shape[1], x2_frac);
    fill_with(shape, |_, c| {
        if c >= second {
            n3
        } else if c >= first {
            n2
        } else {
            n1
        }
    })
}

/// A disc of slowness `n_lens` in a background of `n_bg`.
///
/// The centre sits at `center_frac` of each axis and the radius is
/// `radius_frac` of the shorter axis, both truncated to whole cells.
pub fn circular_lens(
    shape: [usize; 2],
    center_frac: [f64; 2],
    radius_frac: f64,
    n_lens: f64,
    n_bg: f64,
) -> Result<SlownessField> {
    let [rows, cols] = shape;
    let cy = (rows as f64 * center_frac[0]).floor();
    let cx = (cols as f64 * center_frac[1]).floor();
    let radius = (rows.min(cols) as f64 * radius_frac).floor();
    fill_with(shape, |r, c| {
        let d = (r as f64 - cy).hypot(c as f64 - cx);
        if d <= radius {
            n_lens
        } else {
            n_bg
        }
    })
}

/// Horizontal bands, one per entry of `values`, top to bottom.
///
/// Each band is `rows / values.len()` rows tall; the last band absorbs the
/// remainder.
pub fn layered(shape: [usize; 2], values: &[f64]) -> Result<SlownessField> {
    if values.is_empty() {
        return Err(EikonalError::Other(
            "layered field needs at least one layer value".to_string(),
        ));
    }
    let last = values.len() - 1;
    let band = shape[0] / values.len();
    fill_with(shape, |r, _| {
        let layer = if band == 0 { last } else { (r / band).min(last) };
        values[layer]
    })
}

/// A generated maze and the pixel positions of its two far corners.
#[derive(Debug, Clone)]
pub struct Maze {
    /// Corridor/wall slowness field.
    pub field: SlownessField,
    /// Centre pixel of maze cell (1, 1).
    pub start: [usize; 2],
    /// Centre pixel of maze cell (size-2, size-2).
    pub end: [usize; 2],
}

const CARVE_STEPS: [(isize, isize); 4] = [(0, 2), (0, -2), (2, 0), (-2, 0)];

struct CarveFrame {
    cell: [usize; 2],
    dirs: [(isize, isize); 4],
    next: usize,
}

/// Carve a perfect maze on a `size x size` lattice, returning open cells.
///
/// Depth-first backtracking from cell (1, 1), with a heap-allocated stack so
/// the depth is bounded only by memory.
fn carve_lattice(size: usize, rng: &mut StdRng) -> Vec<bool> {
    let mut open = vec![false; size * size];
    let frame = |cell: [usize; 2], rng: &mut StdRng| {
        let mut dirs = CARVE_STEPS;
        dirs.shuffle(rng);
        CarveFrame { cell, dirs, next: 0 }
    };

    open[size + 1] = true;
    let mut stack = vec![frame([1, 1], rng)];

    while let Some(top) = stack.last_mut() {
        if top.next == top.dirs.len() {
            stack.pop();
            continue;
        }
        let (dy, dx) = top.dirs[top.next];
        top.next += 1;

        let [cy, cx] = top.cell;
        let ny = cy as isize + dy;
        let nx = cx as isize + dx;
        if ny < 0 || nx < 0 || ny >= size as isize || nx >= size as isize {
            continue;
        }
        let (ny, nx) = (ny as usize, nx as usize);
        if open[ny * size + nx] {
            continue;
        }

        let wy = (cy + ny) / 2;
        let wx = (cx + nx) / 2;
        open[wy * size + wx] = true;
        open[ny * size + nx] = true;
        stack.push(frame([ny, nx], rng));
    }

    open
}

/// Random perfect maze scaled onto a pixel grid.
///
/// Maze cell `(my, mx)` covers a `rows/maze_size x cols/maze_size` block of
/// pixels; leftover pixels on the bottom and right stay walls. The same
/// `seed` always yields the same maze.
pub fn maze(shape: [usize; 2], maze_size: usize, seed: u64) -> Result<Maze> {
    let [rows, cols] = shape;
    validate_shape(shape)?;
    if maze_size < 3 || maze_size % 2 == 0 || maze_size > rows.min(cols) {
        return Err(EikonalError::InvalidMazeSize(maze_size));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let open = carve_lattice(maze_size, &mut rng);

    let cell_h = rows / maze_size;
    let cell_w = cols / maze_size;
    let field = fill_with(shape, |r, c| {
        let (my, mx) = (r / cell_h, c / cell_w);
        if my < maze_size && mx < maze_size && open[my * maze_size + mx] {
            CORRIDOR_SLOWNESS
        } else {
            OBSTACLE_SLOWNESS
        }
    })?;

    let centre = |m: usize| [m * cell_h + cell_h / 2, m * cell_w + cell_w / 2];
    Ok(Maze {
        field,
        start: centre(1),
        end: centre(maze_size - 2),
    })
}
