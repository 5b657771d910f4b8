// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::debug;

use crate::core::{ArrivalTimeField, GridData, SlownessField};
use crate::error::{EikonalError, Result};
use crate::update_kernels::update_cell;

/// Progress information passed to the optional callback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo {
    /// Number of cells frozen so far.
    pub cells_frozen: u64,
    /// Current number of entries in the narrow band, stale ones included.
    pub narrow_band_len: usize,
    /// Number of stale entries discarded so far.
    pub stale_skipped: u64,
    /// Arrival time of the cell that was just frozen.
    pub frontier_time: f64,
    /// Elapsed time since the solve started.
    pub elapsed: Duration,
}

/// Counters collected over one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
    /// Cells frozen, i.e. cells with a finite arrival time.
    pub cells_frozen: usize,
    /// Total entries ever pushed into the narrow band.
    pub pushes: u64,
    /// Entries popped after their cell was already frozen.
    pub stale_skipped: u64,
    /// Cells left at `+inf`.
    pub unreached: usize,
    /// Wall time of the solve.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy)]
struct BandEntry {
    time: f64,
    cell: usize,
}

impl PartialEq for BandEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BandEntry {}

impl PartialOrd for BandEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BandEntry {
    // Reversed so that `BinaryHeap` pops the smallest time first; ties go to
    // the lower flat index so the pop order is fully deterministic.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

/// The narrow band: a min-priority queue of `(tentative time, cell)` candidates.
///
/// Entries are never removed or decreased in place. When a cell's tentative
/// time improves, a new entry is pushed and the old one goes stale; the caller
/// discards stale entries at pop time by checking its frozen marker.
#[derive(Debug, Default)]
pub struct NarrowBand {
    heap: BinaryHeap<BandEntry>,
    pushes: u64,
}

impl NarrowBand {
    /// Create an empty narrow band.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty narrow band with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        NarrowBand {
            heap: BinaryHeap::with_capacity(capacity),
            pushes: 0,
        }
    }

    /// Insert a candidate for `cell` (a flat index).
    pub fn push(&mut self, time: f64, cell: usize) {
        self.heap.push(BandEntry { time, cell });
        self.pushes += 1;
    }

    /// Remove and return the entry with the smallest time.
    pub fn pop(&mut self) -> Option<(f64, usize)> {
        self.heap.pop().map(|e| (e.time, e.cell))
    }

    /// Number of entries currently held, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the band holds no entries.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Total number of pushes since creation.
    pub fn pushes(&self) -> u64 {
        self.pushes
    }
}

/// A Fast Marching Method solver for the 2D eikonal equation `|∇T| = n`.
///
/// The solver only holds configuration; every call to [`FmmSolver::solve`]
/// allocates its own state and returns a fresh [`ArrivalTimeField`]. Results
/// are bit-reproducible for identical inputs.
pub struct FmmSolver {
    spacing: f64,
    progress_interval: u64,
    progress_callback: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
}

impl FmmSolver {
    /// Create a new FMM solver with the given grid spacing.
    ///
    /// # Errors
    /// Returns an error if the spacing is not positive and finite.
    pub fn new(spacing: f64) -> Result<Self> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(EikonalError::InvalidGridSpacing(spacing));
        }
        Ok(FmmSolver {
            spacing,
            progress_interval: 1 << 16,
            progress_callback: None,
        })
    }

    /// Report progress every `cells` freezes (builder method). Default is 65536.
    /// An interval of 1 reports every single freeze, in pop order.
    pub fn with_progress_interval(mut self, cells: u64) -> Self {
        self.progress_interval = cells.max(1);
        self
    }

    /// Set a progress callback that will be invoked periodically during solving (builder method).
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Grid spacing used for every solve.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Compute arrival times from `source` over `slowness`.
    ///
    /// # Parameters
    /// - `slowness`: the slowness field
    /// - `source`: source cell as `[row, col]`
    /// - `progress_cb`: Optional callback for progress updates (overrides builder-set callback)
    ///
    /// # Errors
    /// Returns [`EikonalError::InvalidSource`] if `source` lies outside the grid.
    pub fn solve(
        &self,
        slowness: &SlownessField,
        source: [usize; 2],
        progress_cb: Option<&dyn Fn(ProgressInfo)>,
    ) -> Result<ArrivalTimeField> {
        self.solve_with_stats(slowness, source, progress_cb)
            .map(|(times, _)| times)
    }

    /// Same as [`FmmSolver::solve`], also returning the solve counters.
    ///
    /// # Errors
    /// Returns [`EikonalError::InvalidSource`] if `source` lies outside the grid.
    pub fn solve_with_stats(
        &self,
        slowness: &SlownessField,
        source: [usize; 2],
        progress_cb: Option<&dyn Fn(ProgressInfo)>,
    ) -> Result<(ArrivalTimeField, SolveStats)> {
        let shape = slowness.shape();
        if source[0] >= shape[0] || source[1] >= shape[1] {
            return Err(EikonalError::InvalidSource {
                coord: source,
                shape,
            });
        }

        debug!(
            rows = shape[0],
            cols = shape[1],
            spacing = self.spacing,
            source_row = source[0],
            source_col = source[1],
            "starting fast marching solve"
        );

        let h = self.spacing;
        let num_nodes = slowness.num_nodes();
        let mut times = vec![f64::INFINITY; num_nodes];
        let mut frozen = vec![false; num_nodes];

        let start_time = Instant::now();
        let emit = |info: ProgressInfo| {
            if let Some(cb) = progress_cb {
                cb(info);
            } else if let Some(cb) = &self.progress_callback {
                cb(info);
            }
        };
        let use_progress = progress_cb.is_some() || self.progress_callback.is_some();

        let src = slowness.nd_to_flat(source);
        times[src] = 0.0;
        let mut band = NarrowBand::with_capacity(num_nodes.min(1 << 20));
        band.push(0.0, src);

        let mut cells_frozen: u64 = 0;
        let mut stale_skipped: u64 = 0;

        while let Some((t, cell)) = band.pop() {
            if frozen[cell] {
                stale_skipped += 1;
                continue;
            }
            frozen[cell] = true;
            cells_frozen += 1;

            if use_progress && cells_frozen % self.progress_interval == 0 {
                emit(ProgressInfo {
                    cells_frozen,
                    narrow_band_len: band.len(),
                    stale_skipped,
                    frontier_time: t,
                    elapsed: start_time.elapsed(),
                });
            }

            let idx = slowness.flat_to_nd(cell);
            for nb in slowness.neighbors4(idx) {
                let nb_flat = slowness.nd_to_flat(nb);
                if frozen[nb_flat] {
                    continue;
                }
                let candidate = update_cell(&times, &frozen, slowness.values(), shape, nb, h);
                if candidate < times[nb_flat] {
                    times[nb_flat] = candidate;
                    band.push(candidate, nb_flat);
                }
            }
        }

        let stats = SolveStats {
            cells_frozen: cells_frozen as usize,
            pushes: band.pushes(),
            stale_skipped,
            unreached: num_nodes - cells_frozen as usize,
            elapsed: start_time.elapsed(),
        };

        debug!(
            frozen = stats.cells_frozen,
            pushes = stats.pushes,
            stale = stats.stale_skipped,
            unreached = stats.unreached,
            elapsed_ms = stats.elapsed.as_secs_f64() * 1e3,
            "fast marching solve finished"
        );

        Ok((ArrivalTimeField::from_parts(shape, h, times), stats))
    }

    /// Solve independently for each source, in parallel across sources.
    ///
    /// Each solve is the same sequential march as [`FmmSolver::solve`]; only
    /// whole solves run concurrently. Output order matches `sources`.
    ///
    /// # Errors
    /// Returns an [`EikonalError::InvalidSource`] if any source lies outside the grid.
    pub fn solve_batch(
        &self,
        slowness: &SlownessField,
        sources: &[[usize; 2]],
    ) -> Result<Vec<ArrivalTimeField>> {
        sources
            .par_iter()
            .map(|&source| self.solve(slowness, source, None))
            .collect()
    }
}

/// Compute the arrival-time field of a wavefront started at `source`.
///
/// Convenience wrapper over [`FmmSolver`] with no progress reporting.
///
/// # Errors
/// Returns an error if `spacing` is not positive and finite or `source` lies
/// outside the grid.
pub fn solve_eikonal(
    slowness: &SlownessField,
    source: [usize; 2],
    spacing: f64,
) -> Result<ArrivalTimeField> {
    FmmSolver::new(spacing)?.solve(slowness, source, None)
}
