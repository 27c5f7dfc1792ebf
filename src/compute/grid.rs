//! Square grid storage helpers and boundary conditions.
//!
//! All grids are flat row-major `f32` buffers of `n * n` cells, indexed
//! `x + y * n`. Row/column 0 and `n - 1` form the boundary ring.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Which quantity a buffer holds, selecting its wall behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Density, pressure, divergence: copied from the interior neighbour.
    Scalar,
    /// Horizontal velocity: negated on the left/right walls.
    VelocityX,
    /// Vertical velocity: negated on the top/bottom walls.
    VelocityY,
}

/// Flat index of cell `(x, y)`.
#[inline(always)]
pub fn ix(x: usize, y: usize, n: usize) -> usize {
    x + y * n
}

/// Flat index of `(x, y)` if it lies inside `[0, n)`, otherwise `None`.
#[inline]
pub fn checked_index(x: i32, y: i32, n: usize) -> Option<usize> {
    let x = usize::try_from(x).ok()?;
    let y = usize::try_from(y).ok()?;
    (x < n && y < n).then(|| ix(x, y, n))
}

/// Rewrite the boundary ring from the interior.
///
/// Edges copy their single interior neighbour, negated for the velocity
/// component normal to that wall. Corners average their two edge neighbours.
pub fn set_bnd(kind: FieldKind, x: &mut [f32], n: usize) {
    debug_assert_eq!(x.len(), n * n);
    let last = n - 1;

    let flip_x = if kind == FieldKind::VelocityX { -1.0 } else { 1.0 };
    let flip_y = if kind == FieldKind::VelocityY { -1.0 } else { 1.0 };

    for i in 1..last {
        x[ix(i, 0, n)] = flip_y * x[ix(i, 1, n)];
        x[ix(i, last, n)] = flip_y * x[ix(i, last - 1, n)];
    }
    for j in 1..last {
        x[ix(0, j, n)] = flip_x * x[ix(1, j, n)];
        x[ix(last, j, n)] = flip_x * x[ix(last - 1, j, n)];
    }

    x[ix(0, 0, n)] = 0.5 * (x[ix(1, 0, n)] + x[ix(0, 1, n)]);
    x[ix(0, last, n)] = 0.5 * (x[ix(1, last, n)] + x[ix(0, last - 1, n)]);
    x[ix(last, 0, n)] = 0.5 * (x[ix(last - 1, 0, n)] + x[ix(last, 1, n)]);
    x[ix(last, last, n)] = 0.5 * (x[ix(last - 1, last, n)] + x[ix(last, last - 1, n)]);
}

/// Run `f(j, row)` on every interior row `1..n-1` of `buf`.
///
/// Rows are independent, so native builds process them in parallel.
pub fn for_each_interior_row<F>(buf: &mut [f32], n: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Sync + Send,
{
    let interior = &mut buf[n..n * (n - 1)];

    #[cfg(not(target_arch = "wasm32"))]
    interior
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(r, row)| f(r + 1, row));

    #[cfg(target_arch = "wasm32")]
    interior
        .chunks_mut(n)
        .enumerate()
        .for_each(|(r, row)| f(r + 1, row));
}

/// Like [`for_each_interior_row`] over two buffers in lockstep.
pub fn for_each_interior_row_pair<F>(a: &mut [f32], b: &mut [f32], n: usize, f: F)
where
    F: Fn(usize, &mut [f32], &mut [f32]) + Sync + Send,
{
    let a = &mut a[n..n * (n - 1)];
    let b = &mut b[n..n * (n - 1)];

    #[cfg(not(target_arch = "wasm32"))]
    a.par_chunks_mut(n)
        .zip(b.par_chunks_mut(n))
        .enumerate()
        .for_each(|(r, (ra, rb))| f(r + 1, ra, rb));

    #[cfg(target_arch = "wasm32")]
    a.chunks_mut(n)
        .zip(b.chunks_mut(n))
        .enumerate()
        .for_each(|(r, (ra, rb))| f(r + 1, ra, rb));
}

/// Sum of every cell, boundary ring included.
pub fn total(grid: &[f32]) -> f32 {
    grid.iter().sum()
}

/// Sum of the interior cells only.
pub fn interior_total(grid: &[f32], n: usize) -> f32 {
    (1..n - 1)
        .map(|j| grid[ix(1, j, n)..ix(n - 1, j, n)].iter().sum::<f32>())
        .sum()
}
