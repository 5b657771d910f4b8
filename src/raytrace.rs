// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Characteristic rays by steepest descent through an arrival-time field.
//!
//! Positions are continuous `[row, col]` coordinates in cell units, with cell
//! centres at integer coordinates. Tracing never fails: every call returns a
//! [`RayPath`], and [`RayPath::stop`] says why integration ended.

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{trace, warn};

use crate::core::{ArrivalTimeField, GridData};

/// Why a ray stopped integrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last point is within `2 * step` of the source.
    ReachedSource,
    /// The gradient vanished or was not finite (flat or unreached region).
    Stationary,
    /// The next step would have left the grid.
    LeftGrid,
    /// The step budget ran out.
    MaxSteps,
    /// Target or step size was unusable; the path is empty.
    InvalidInput,
}

/// Integration settings for the ray tracer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceOptions {
    /// Distance moved per iteration, in cells.
    pub step: f64,
    /// Upper bound on iterations.
    pub max_steps: usize,
    /// Gradient magnitude below which the field counts as flat.
    pub min_gradient: f64,
}

impl Default for TraceOptions {
    fn default() -> Self {
        TraceOptions {
            step: 0.5,
            max_steps: 30_000,
            min_gradient: 1e-10,
        }
    }
}

/// An ordered polyline from a target point back toward the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RayPath {
    points: Vec<[f64; 2]>,
    stop: StopReason,
}

impl RayPath {
    fn invalid() -> Self {
        RayPath {
            points: Vec::new(),
            stop: StopReason::InvalidInput,
        }
    }

    /// The traced points, starting at the target.
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Why integration ended.
    pub fn stop(&self) -> StopReason {
        self.stop
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The terminal point.
    pub fn last(&self) -> Option<[f64; 2]> {
        self.points.last().copied()
    }

    /// Total polyline length in cells.
    pub fn arc_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1][0] - w[0][0]).hypot(w[1][1] - w[0][1]))
            .sum()
    }

    /// Distance from the terminal point to `point`.
    pub fn distance_to(&self, point: [f64; 2]) -> Option<f64> {
        self.last()
            .map(|[y, x]| (y - point[0]).hypot(x - point[1]))
    }

    /// Whether the terminal point lies within `tolerance` of `source`.
    ///
    /// Success of a trace is the caller's judgement; this is the usual test.
    pub fn reached(&self, source: [f64; 2], tolerance: f64) -> bool {
        self.distance_to(source).is_some_and(|d| d <= tolerance)
    }

    /// Copy the points into an `(n, 2)` array of `[row, col]`.
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.points.len(), 2), |(i, k)| self.points[i][k])
    }
}

/// Continuous gradient `(gy, gx)` of the arrival-time field at `(y, x)`.
///
/// The position is clamped into `[0.5, rows-1.5] x [0.5, cols-1.5]`; the
/// forward differences along each axis of the surrounding 2x2 block are then
/// blended by the fractional offsets. Grids narrower than two cells on either
/// axis have no such block and yield a zero gradient.
pub fn gradient(times: &ArrivalTimeField, y: f64, x: f64) -> (f64, f64) {
    let [rows, cols] = times.shape();
    if rows < 2 || cols < 2 {
        return (0.0, 0.0);
    }

    let y = y.min(rows as f64 - 1.5).max(0.5);
    let x = x.min(cols as f64 - 1.5).max(0.5);
    let iy = (y.floor() as usize).min(rows - 2);
    let ix = (x.floor() as usize).min(cols - 2);
    let fy = y - iy as f64;
    let fx = x - ix as f64;

    let t00 = times.get([iy, ix]);
    let t01 = times.get([iy, ix + 1]);
    let t10 = times.get([iy + 1, ix]);
    let t11 = times.get([iy + 1, ix + 1]);

    let gx = (1.0 - fy) * (t01 - t00) + fy * (t11 - t10);
    let gy = (1.0 - fx) * (t10 - t00) + fx * (t11 - t01);
    (gy, gx)
}

fn inside(times: &ArrivalTimeField, y: f64, x: f64) -> bool {
    let [rows, cols] = times.shape();
    y >= 0.0 && x >= 0.0 && y < rows as f64 && x < cols as f64
}

/// Trace the steepest-descent ray from `target` toward `source`.
///
/// Each iteration steps `step` cells against the normalized gradient. The ray
/// stops on a flat or non-finite gradient, when a step would leave the grid,
/// within `2 * step` of `source`, or after `max_steps` iterations.
pub fn trace_ray(
    times: &ArrivalTimeField,
    target: [f64; 2],
    source: [f64; 2],
    step: f64,
    max_steps: usize,
) -> RayPath {
    let opts = TraceOptions {
        step,
        max_steps,
        ..TraceOptions::default()
    };
    trace_ray_with(times, target, source, &opts)
}

/// [`trace_ray`] with explicit [`TraceOptions`].
pub fn trace_ray_with(
    times: &ArrivalTimeField,
    target: [f64; 2],
    source: [f64; 2],
    opts: &TraceOptions,
) -> RayPath {
    let step = opts.step;
    if !step.is_finite() || step <= 0.0 {
        warn!(step, "ray step must be positive and finite");
        return RayPath::invalid();
    }
    let [ty, tx] = target;
    if !ty.is_finite() || !tx.is_finite() || !inside(times, ty, tx) {
        warn!(row = ty, col = tx, "ray target outside the grid");
        return RayPath::invalid();
    }

    let arrive = 2.0 * step;
    let near_source = |y: f64, x: f64| (y - source[0]).hypot(x - source[1]) < arrive;

    let mut points = vec![target];
    if near_source(ty, tx) {
        return RayPath {
            points,
            stop: StopReason::ReachedSource,
        };
    }

    let (mut y, mut x) = (ty, tx);
    let mut stop = StopReason::MaxSteps;
    for _ in 0..opts.max_steps {
        let (gy, gx) = gradient(times, y, x);
        let g = gy.hypot(gx);
        if !g.is_finite() || g < opts.min_gradient {
            stop = StopReason::Stationary;
            break;
        }

        let ny = y - step * gy / g;
        let nx = x - step * gx / g;
        if !inside(times, ny, nx) {
            stop = StopReason::LeftGrid;
            break;
        }

        y = ny;
        x = nx;
        points.push([y, x]);

        if near_source(y, x) {
            stop = StopReason::ReachedSource;
            break;
        }
    }

    trace!(points = points.len(), ?stop, "ray traced");
    RayPath { points, stop }
}

/// Trace one ray per target against the same field, in parallel.
///
/// Rays share nothing but the read-only field; each result equals the
/// corresponding [`trace_ray_with`] call. Output order matches `targets`.
pub fn trace_rays(
    times: &ArrivalTimeField,
    targets: &[[f64; 2]],
    source: [f64; 2],
    opts: &TraceOptions,
) -> Vec<RayPath> {
    targets
        .par_iter()
        .map(|&target| trace_ray_with(times, target, source, opts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Field whose value is `f(row, col)`.
    fn field(shape: [usize; 2], f: impl Fn(f64, f64) -> f64) -> ArrivalTimeField {
        let mut values = Vec::with_capacity(shape[0] * shape[1]);
        for r in 0..shape[0] {
            for c in 0..shape[1] {
                values.push(f(r as f64, c as f64));
            }
        }
        ArrivalTimeField::from_parts(shape, 1.0, values)
    }

    #[test]
    fn gradient_of_linear_field_is_exact() {
        let times = field([8, 9], |r, c| 2.0 * r + 3.0 * c);
        for &(y, x) in &[(0.0, 0.0), (3.3, 4.7), (7.9, 8.9), (0.5, 7.5)] {
            let (gy, gx) = gradient(&times, y, x);
            assert!((gy - 2.0).abs() < 1e-12, "gy at ({}, {}) = {}", y, x, gy);
            assert!((gx - 3.0).abs() < 1e-12, "gx at ({}, {}) = {}", y, x, gx);
        }
    }

    #[test]
    fn gradient_blends_corners() {
        // Block [[0, 1], [0, 3]]: gx is 1 on row 0 and 3 on row 1
        let times = ArrivalTimeField::from_parts([2, 2], 1.0, vec![0.0, 1.0, 0.0, 3.0]);
        let (_, gx) = gradient(&times, 0.5, 0.5);
        assert!((gx - 2.0).abs() < 1e-12);
    }

    #[test]
    fn gradient_degenerate_grid_is_zero() {
        let times = field([1, 10], |_, c| c);
        assert_eq!(gradient(&times, 0.0, 4.0), (0.0, 0.0));
    }

    #[test]
    fn descends_straight_to_source() {
        let times = field([11, 11], |_, c| c);
        let ray = trace_ray(&times, [5.0, 10.0], [5.0, 0.0], 0.5, 1000);
        assert_eq!(ray.stop(), StopReason::ReachedSource);
        // 10.0 -> 0.5 in half-cell steps, plus the starting point
        assert_eq!(ray.len(), 20);
        assert_eq!(ray.points()[0], [5.0, 10.0]);
        assert!((ray.arc_length() - 9.5).abs() < 1e-12);
        assert!(ray.reached([5.0, 0.0], 1.0));
        assert!(ray.points().iter().all(|p| p[0] == 5.0));
    }

    #[test]
    fn flat_field_is_stationary() {
        let times = field([6, 6], |_, _| 4.0);
        let ray = trace_ray(&times, [2.0, 2.0], [0.0, 0.0], 0.5, 100);
        assert_eq!(ray.stop(), StopReason::Stationary);
        assert_eq!(ray.len(), 1);
    }

    #[test]
    fn infinite_neighbourhood_is_stationary() {
        let times = field([6, 6], |_, c| if c > 3.0 { f64::INFINITY } else { c });
        let ray = trace_ray(&times, [2.0, 4.5], [2.0, 0.0], 0.25, 100);
        assert_eq!(ray.stop(), StopReason::Stationary);
        assert!(ray.points().iter().all(|p| p[0].is_finite() && p[1].is_finite()));
    }

    #[test]
    fn leaving_the_grid_stops_inside() {
        // Times decrease toward the right edge; the source is elsewhere
        let times = field([5, 8], |_, c| 7.0 - c);
        let ray = trace_ray(&times, [2.0, 1.0], [2.0, -50.0], 0.5, 1000);
        assert_eq!(ray.stop(), StopReason::LeftGrid);
        for p in ray.points() {
            assert!(p[0] >= 0.0 && p[0] < 5.0 && p[1] >= 0.0 && p[1] < 8.0);
        }
        assert!(ray.last().unwrap()[1] > 7.0);
    }

    #[test]
    fn max_steps_bounds_the_path() {
        let times = field([11, 11], |_, c| c);
        let ray = trace_ray(&times, [5.0, 10.0], [5.0, 0.0], 0.5, 3);
        assert_eq!(ray.stop(), StopReason::MaxSteps);
        assert_eq!(ray.len(), 4);

        let ray = trace_ray(&times, [5.0, 10.0], [5.0, 0.0], 0.5, 0);
        assert_eq!(ray.stop(), StopReason::MaxSteps);
        assert_eq!(ray.len(), 1);
    }

    #[test]
    fn target_at_source_returns_immediately() {
        let times = field([4, 4], |r, c| r + c);
        let ray = trace_ray(&times, [1.0, 1.0], [1.0, 1.2], 0.5, 100);
        assert_eq!(ray.stop(), StopReason::ReachedSource);
        assert_eq!(ray.len(), 1);
    }

    #[test]
    fn invalid_inputs_yield_empty_path() {
        let times = field([4, 4], |r, c| r + c);
        let cases = [
            ([4.0, 0.0], 0.5),
            ([-0.1, 1.0], 0.5),
            ([f64::NAN, 1.0], 0.5),
            ([1.0, 1.0], 0.0),
            ([1.0, 1.0], f64::INFINITY),
        ];
        for (target, step) in cases {
            let ray = trace_ray(&times, target, [0.0, 0.0], step, 10);
            assert_eq!(ray.stop(), StopReason::InvalidInput);
            assert!(ray.is_empty());
            assert_eq!(ray.distance_to([0.0, 0.0]), None);
            assert!(!ray.reached([0.0, 0.0], 100.0));
        }
    }

    #[test]
    fn to_array_layout() {
        let times = field([11, 11], |_, c| c);
        let ray = trace_ray(&times, [5.0, 10.0], [5.0, 0.0], 0.5, 2);
        let arr = ray.to_array();
        assert_eq!(arr.dim(), (3, 2));
        assert_eq!(arr[[0, 1]], 10.0);
        assert_eq!(arr[[2, 1]], 9.0);
        assert_eq!(arr[[2, 0]], 5.0);
    }

    #[test]
    fn batch_matches_sequential() {
        let times = field([20, 20], |r, c| ((r - 10.0).powi(2) + c * c).sqrt());
        let targets = [[2.0, 18.0], [10.0, 19.0], [17.5, 15.0], [30.0, 1.0]];
        let opts = TraceOptions {
            step: 0.25,
            ..TraceOptions::default()
        };
        let batch = trace_rays(&times, &targets, [10.0, 0.0], &opts);
        assert_eq!(batch.len(), targets.len());
        for (ray, &target) in batch.iter().zip(&targets) {
            assert_eq!(ray, &trace_ray_with(&times, target, [10.0, 0.0], &opts));
        }
        assert_eq!(batch[3].stop(), StopReason::InvalidInput);
    }
}
