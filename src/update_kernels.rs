// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

/// Solve the 2D upwind eikonal update for a single cell.
///
/// Given the smallest frozen neighbour time along each axis, the cell's
/// slowness and spacing `h`, solves the Godunov upwind discretization
/// `((u-a)/h)^2 + ((u-b)/h)^2 = slowness^2`, i.e. the quadratic
/// `2u^2 - 2(t1+t2)u + (t1^2 + t2^2 - (slowness*h)^2) = 0`, taking the larger root.
///
/// The two-axis root is accepted only when it is not smaller than the larger
/// neighbour it depends on. Otherwise, or when the discriminant is negative,
/// falls back to the single-axis update `t1 + slowness*h`.
pub fn solve_2d(t_horiz: f64, t_vert: f64, slowness: f64, h: f64) -> f64 {
    let (t1, t2) = if t_horiz <= t_vert {
        (t_horiz, t_vert)
    } else {
        (t_vert, t_horiz)
    };

    // No frozen neighbour on either axis
    if t1.is_infinite() {
        return f64::INFINITY;
    }

    let fh = slowness * h;

    if t2.is_finite() {
        let diff = t1 - t2;
        let disc = 2.0 * fh * fh - diff * diff;
        if disc >= 0.0 {
            let u = (t1 + t2 + disc.sqrt()) / 2.0;
            // fh^2 can overflow while t1 + fh is still finite
            if u >= t2 && u.is_finite() {
                return u;
            }
        }
    }

    t1 + fh
}

/// Smallest frozen neighbour time along each axis of `idx`.
///
/// Returns `(t_horiz, t_vert)`: the minimum over the frozen left/right
/// neighbours and the minimum over the frozen up/down neighbours. Neighbours
/// outside the grid or not yet frozen contribute `+inf`.
pub fn upwind_neighbors(
    times: &[f64],
    frozen: &[bool],
    shape: [usize; 2],
    idx: [usize; 2],
) -> (f64, f64) {
    let [rows, cols] = shape;
    let [i, j] = idx;
    let flat = i * cols + j;

    let known = |f: usize| if frozen[f] { times[f] } else { f64::INFINITY };

    let mut t_horiz = f64::INFINITY;
    if j > 0 {
        t_horiz = t_horiz.min(known(flat - 1));
    }
    if j + 1 < cols {
        t_horiz = t_horiz.min(known(flat + 1));
    }

    let mut t_vert = f64::INFINITY;
    if i > 0 {
        t_vert = t_vert.min(known(flat - cols));
    }
    if i + 1 < rows {
        t_vert = t_vert.min(known(flat + cols));
    }

    (t_horiz, t_vert)
}

/// Compute the candidate arrival time for a single cell.
///
/// Reads the four neighbours, keeps only frozen ones, and calls `solve_2d`
/// with the cell's own slowness. Returns `+inf` when no neighbour is frozen.
pub fn update_cell(
    times: &[f64],
    frozen: &[bool],
    slowness: &[f64],
    shape: [usize; 2],
    idx: [usize; 2],
    h: f64,
) -> f64 {
    let (t_horiz, t_vert) = upwind_neighbors(times, frozen, shape, idx);
    let f = slowness[idx[0] * shape[1] + idx[1]];
    solve_2d(t_horiz, t_vert, f, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = f64::INFINITY;

    #[test]
    fn solve_2d_known_case() {
        // Both neighbors at 0, f=1, h=1
        // u = (0+0+sqrt(2))/2 = sqrt(2)/2 ≈ 0.707
        let u = solve_2d(0.0, 0.0, 1.0, 1.0);
        assert!((u - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn solve_2d_diagonal_of_unit_square() {
        // Neighbours one step from the source on each axis
        let u = solve_2d(1.0, 1.0, 1.0, 1.0);
        assert!((u - (1.0 + std::f64::consts::FRAC_1_SQRT_2)).abs() < 1e-12);
    }

    #[test]
    fn solve_2d_fallback_negative_discriminant() {
        // a=0, b=100: disc = 2 - 10000 < 0, single-axis: 0+1 = 1
        let u = solve_2d(0.0, 100.0, 1.0, 1.0);
        assert!((u - 1.0).abs() < 1e-12);
    }

    #[test]
    fn solve_2d_causality_guard_falls_back() {
        // disc = 2 - 1.44 >= 0 but the root (~0.974) is below t2 = 1.2,
        // so the single-axis update 0 + 1 is used instead.
        let u = solve_2d(0.0, 1.2, 1.0, 1.0);
        assert!((u - 1.0).abs() < 1e-12);
    }

    #[test]
    fn solve_2d_symmetric_in_axes() {
        let a = solve_2d(0.3, 0.9, 1.7, 0.5);
        let b = solve_2d(0.9, 0.3, 1.7, 0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn solve_2d_both_infinite() {
        let u = solve_2d(INF, INF, 1.0, 1.0);
        assert!(u.is_infinite());
    }

    #[test]
    fn solve_2d_one_infinite() {
        // t_horiz=inf, t_vert=5, f=1, h=1 → 5 + 1 = 6
        let u = solve_2d(INF, 5.0, 1.0, 1.0);
        assert!((u - 6.0).abs() < 1e-12);
    }

    #[test]
    fn solve_2d_two_axis_root_within_bounds() {
        let cases = [
            (0.0, 0.0, 1.0, 1.0),
            (0.0, 0.5, 1.0, 1.0),
            (3.0, 3.2, 2.0, 0.25),
            (0.0, 0.0, 1.0e4, 1.0),
            (7.0, 7.9, 1.0, 1.0),
        ];
        for (a, b, f, h) in cases {
            let u = solve_2d(a, b, f, h);
            assert!(u >= a.max(b) - 1e-12, "solve_2d({}, {}, {}, {}) = {}", a, b, f, h, u);
            assert!(u <= a.min(b) + f * h + 1e-12);
        }
    }

    #[test]
    fn solve_2d_huge_slowness_stays_finite() {
        let u = solve_2d(1.0, 2.0, 1.0e200, 1.0);
        assert!(u.is_finite());
        assert_eq!(u, 1.0 + 1.0e200);
    }

    #[test]
    fn upwind_ignores_unfrozen_neighbours() {
        // 3x3, centre [1,1]; left neighbour frozen at 2.0, right unfrozen at 0.5
        let shape = [3, 3];
        let mut times = vec![INF; 9];
        let mut frozen = vec![false; 9];
        times[3] = 2.0;
        frozen[3] = true;
        times[5] = 0.5;
        let (h, v) = upwind_neighbors(&times, &frozen, shape, [1, 1]);
        assert_eq!(h, 2.0);
        assert!(v.is_infinite());

        frozen[5] = true;
        let (h, _) = upwind_neighbors(&times, &frozen, shape, [1, 1]);
        assert_eq!(h, 0.5);
    }

    #[test]
    fn upwind_on_edges() {
        // 2x2 grid, query [0,0]: only right and down neighbours exist
        let shape = [2, 2];
        let times = vec![INF, 1.0, 3.0, INF];
        let frozen = vec![false, true, true, false];
        let (h, v) = upwind_neighbors(&times, &frozen, shape, [0, 0]);
        assert_eq!(h, 1.0);
        assert_eq!(v, 3.0);
    }

    #[test]
    fn update_cell_point_source() {
        // 5x5 grid, source at centre [2,2] frozen at 0
        let shape = [5, 5];
        let slowness = vec![1.0; 25];
        let mut times = vec![INF; 25];
        let mut frozen = vec![false; 25];
        times[12] = 0.0;
        frozen[12] = true;

        let u = update_cell(&times, &frozen, &slowness, shape, [2, 1], 1.0);
        assert!((u - 1.0).abs() < 1e-12);

        // Diagonal cell has no frozen neighbour yet
        let u = update_cell(&times, &frozen, &slowness, shape, [1, 1], 1.0);
        assert!(u.is_infinite());
    }

    #[test]
    fn update_cell_uses_own_slowness_and_spacing() {
        let shape = [1, 3];
        let slowness = vec![1.0, 4.0, 1.0];
        let times = vec![0.0, INF, INF];
        let frozen = vec![true, false, false];
        let u = update_cell(&times, &frozen, &slowness, shape, [0, 1], 0.5);
        assert!((u - 2.0).abs() < 1e-12);
    }

    #[test]
    fn no_nan_produced() {
        let cases = [
            (0.0, 0.0, 1.0, 1.0),
            (1.0, 1.0, 1.0, 1.0),
            (INF, 0.0, 1.0, 1.0),
            (0.0, INF, 1.0, 1.0),
            (INF, INF, 1.0, 1.0),
            (0.0, 0.0, 0.001, 0.001),
            (0.0, 0.0, 1000.0, 1.0),
            (0.0, 1.0e9, 1.0e4, 1.0),
        ];
        for (a, b, f, h) in cases {
            let u = solve_2d(a, b, f, h);
            assert!(!u.is_nan(), "NaN for solve_2d({}, {}, {}, {})", a, b, f, h);
        }
    }
}
