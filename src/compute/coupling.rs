//! Read-only view of a fluid velocity grid, borrowed for one particle update.

/// Borrowed `vx`/`vy` grids of an `n x n` fluid.
///
/// The view is tied to the lifetime of the buffers it borrows, so it cannot
/// outlive (or observe a reallocation of) the field that produced it.
#[derive(Debug, Clone, Copy)]
pub struct FluidVelocityView<'a> {
    vx: &'a [f32],
    vy: &'a [f32],
    size: usize,
}

impl<'a> FluidVelocityView<'a> {
    /// Wrap raw velocity buffers.
    ///
    /// Returns `None` when `size` is zero or either buffer length differs
    /// from `size * size`; callers treat that as "no coupling".
    pub fn new(vx: &'a [f32], vy: &'a [f32], size: usize) -> Option<Self> {
        let cells = size.checked_mul(size)?;
        if size == 0 || vx.len() != cells || vy.len() != cells {
            return None;
        }
        Some(Self { vx, vy, size })
    }

    /// View over grids whose length is already known to be `size * size`.
    pub(crate) fn from_grids(vx: &'a [f32], vy: &'a [f32], size: usize) -> Self {
        debug_assert_eq!(vx.len(), size * size);
        debug_assert_eq!(vy.len(), size * size);
        Self { vx, vy, size }
    }

    /// Grid edge length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Horizontal velocity grid.
    #[inline]
    pub fn vx(&self) -> &'a [f32] {
        self.vx
    }

    /// Vertical velocity grid.
    #[inline]
    pub fn vy(&self) -> &'a [f32] {
        self.vy
    }

    /// Bilinearly sample velocity at continuous grid coordinates.
    ///
    /// Cell `(i, j)` is centred on `(i, j)`. Points outside
    /// `[0, size - 1]` on either axis (or NaN) yield `None`.
    pub fn sample(&self, gx: f32, gy: f32) -> Option<(f32, f32)> {
        let max = (self.size - 1) as f32;
        if !(gx >= 0.0 && gx <= max && gy >= 0.0 && gy <= max) {
            return None;
        }

        let n = self.size;
        let i0 = (gx.floor() as usize).min(n.saturating_sub(2));
        let j0 = (gy.floor() as usize).min(n.saturating_sub(2));
        let i1 = (i0 + 1).min(n - 1);
        let j1 = (j0 + 1).min(n - 1);

        let s1 = (gx - i0 as f32).clamp(0.0, 1.0);
        let t1 = (gy - j0 as f32).clamp(0.0, 1.0);
        let s0 = 1.0 - s1;
        let t0 = 1.0 - t1;

        let lerp = |grid: &[f32]| {
            s0 * (t0 * grid[i0 + j0 * n] + t1 * grid[i0 + j1 * n])
                + s1 * (t0 * grid[i1 + j0 * n] + t1 * grid[i1 + j1 * n])
        };

        Some((lerp(self.vx), lerp(self.vy)))
    }
}
