//! Stable-fluids primitives: relaxation solve, diffusion, projection, advection.
//!
//! Every pass finishes by rewriting the boundary ring with [`set_bnd`], so the
//! interior loops never need to read outside the grid.

use super::grid::{FieldKind, for_each_interior_row, for_each_interior_row_pair, ix, set_bnd};

/// Gauss-Seidel relaxation for `c * x - a * (sum of 4 neighbours) = x0`.
///
/// Runs a fixed number of sweeps instead of iterating to a tolerance, so the
/// per-frame cost is bounded. The in-place update makes this inherently
/// sequential.
pub fn lin_solve(
    kind: FieldKind,
    x: &mut [f32],
    x0: &[f32],
    a: f32,
    c: f32,
    iterations: usize,
    n: usize,
) {
    let c_inv = 1.0 / c;
    for _ in 0..iterations {
        for j in 1..n - 1 {
            for i in 1..n - 1 {
                let neighbours = x[ix(i - 1, j, n)]
                    + x[ix(i + 1, j, n)]
                    + x[ix(i, j - 1, n)]
                    + x[ix(i, j + 1, n)];
                x[ix(i, j, n)] = (x0[ix(i, j, n)] + a * neighbours) * c_inv;
            }
        }
        set_bnd(kind, x, n);
    }
}

/// Implicit diffusion of `x0` into `x`.
///
/// a = dt * rate * (n-2)^2, c = 1 + 4a. Stable for any `dt * rate`.
pub fn diffuse(
    kind: FieldKind,
    x: &mut [f32],
    x0: &[f32],
    rate: f32,
    dt: f32,
    iterations: usize,
    n: usize,
) {
    let inner = (n - 2) as f32;
    let a = dt * rate * inner * inner;
    x.copy_from_slice(x0);
    lin_solve(kind, x, x0, a, 1.0 + 4.0 * a, iterations, n);
}

/// Make `(vx, vy)` approximately divergence-free.
///
/// `p` and `div` are scratch buffers; their contents are overwritten.
pub fn project(
    vx: &mut [f32],
    vy: &mut [f32],
    p: &mut [f32],
    div: &mut [f32],
    iterations: usize,
    n: usize,
) {
    let h = 1.0 / (n - 2) as f32;

    {
        let (vx, vy) = (&*vx, &*vy);
        for_each_interior_row(div, n, |j, row| {
            for i in 1..n - 1 {
                row[i] = -0.5
                    * h
                    * (vx[ix(i + 1, j, n)] - vx[ix(i - 1, j, n)] + vy[ix(i, j + 1, n)]
                        - vy[ix(i, j - 1, n)]);
            }
        });
    }
    p.fill(0.0);
    set_bnd(FieldKind::Scalar, div, n);

    lin_solve(FieldKind::Scalar, p, div, 1.0, 4.0, iterations, n);

    let p = &*p;
    let inv_2h = 0.5 / h;
    for_each_interior_row_pair(vx, vy, n, |j, row_x, row_y| {
        for i in 1..n - 1 {
            row_x[i] -= inv_2h * (p[ix(i + 1, j, n)] - p[ix(i - 1, j, n)]);
            row_y[i] -= inv_2h * (p[ix(i, j + 1, n)] - p[ix(i, j - 1, n)]);
        }
    });
    set_bnd(FieldKind::VelocityX, vx, n);
    set_bnd(FieldKind::VelocityY, vy, n);
}

/// Semi-Lagrangian advection of `d0` into `d` through `(vx, vy)`.
///
/// Each interior cell traces back by `dt` and bilinearly samples `d0`. The
/// backtrace is clamped to `[0.5, n - 1.5]`, which keeps every sample inside
/// the grid and makes the result a convex combination of old values.
pub fn advect(
    kind: FieldKind,
    d: &mut [f32],
    d0: &[f32],
    vx: &[f32],
    vy: &[f32],
    dt: f32,
    n: usize,
) {
    let dt0 = dt * (n - 2) as f32;
    let hi = n as f32 - 1.5;

    for_each_interior_row(d, n, |j, row| {
        for i in 1..n - 1 {
            let idx = ix(i, j, n);
            // `max`/`min` also map a NaN backtrace onto the lower bound
            let x = (i as f32 - dt0 * vx[idx]).max(0.5).min(hi);
            let y = (j as f32 - dt0 * vy[idx]).max(0.5).min(hi);

            let i0 = x.floor() as usize;
            let j0 = y.floor() as usize;
            let s1 = x - i0 as f32;
            let s0 = 1.0 - s1;
            let t1 = y - j0 as f32;
            let t0 = 1.0 - t1;

            row[i] = s0 * (t0 * d0[ix(i0, j0, n)] + t1 * d0[ix(i0, j0 + 1, n)])
                + s1 * (t0 * d0[ix(i0 + 1, j0, n)] + t1 * d0[ix(i0 + 1, j0 + 1, n)]);
        }
    });
    set_bnd(kind, d, n);
}

/// Mean absolute divergence over the interior (diagnostics).
pub fn mean_abs_divergence(vx: &[f32], vy: &[f32], n: usize) -> f32 {
    let h = 1.0 / (n - 2) as f32;
    let mut sum = 0.0f32;
    for j in 1..n - 1 {
        for i in 1..n - 1 {
            let div = 0.5
                * (vx[ix(i + 1, j, n)] - vx[ix(i - 1, j, n)] + vy[ix(i, j + 1, n)]
                    - vy[ix(i, j - 1, n)])
                / h;
            sum += div.abs();
        }
    }
    sum / ((n - 2) * (n - 2)) as f32
}
