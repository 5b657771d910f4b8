// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! A Fast Marching eikonal solver and characteristic ray tracer for 2D grids.
//!
//! Given a slowness field `f` and a point source, [`FmmSolver`] computes the
//! first-arrival time `T` satisfying `|∇T| = f` by the Fast Marching Method:
//! a Dijkstra-like sweep that freezes cells in non-decreasing time order using
//! an upwind quadratic update. [`trace_ray`] then follows the steepest descent
//! of `T` from any target back to the source, recovering the minimum-time
//! path.
//!
//! ```no_run
//! use eikonal_fmm::{solve_eikonal, trace_ray, SlownessField, StopReason};
//!
//! let slowness = SlownessField::uniform([128, 128], 1.0)?;
//! let times = solve_eikonal(&slowness, [64, 10], 1.0)?;
//! let ray = trace_ray(&times, [20.0, 120.0], [64.0, 10.0], 0.5, 10_000);
//! assert_eq!(ray.stop(), StopReason::ReachedSource);
//! # Ok::<(), eikonal_fmm::EikonalError>(())
//! ```

#![warn(missing_docs)]

/// Grid fields and index helpers.
pub mod core;
/// Error types for the library.
pub mod error;
/// File I/O for loading slowness fields and saving arrival times and rays.
pub mod io;
/// Fast Marching solver and its narrow band.
pub mod marching;
/// Synthetic slowness field generators.
pub mod media;
/// Steepest-descent ray tracing.
pub mod raytrace;
/// Upwind eikonal update kernel.
pub mod update_kernels;

pub use crate::core::{ArrivalTimeField, GridData, SlownessField};
pub use crate::error::{EikonalError, Result};
pub use crate::marching::{solve_eikonal, FmmSolver, ProgressInfo, SolveStats};
pub use crate::raytrace::{trace_ray, trace_rays, RayPath, StopReason, TraceOptions};
