//! Host input helpers: pointer and scroll injection, screen mapping.
//!
//! These turn normalised container coordinates (`[0, 1]^2`, y down) into
//! fluid injections or particle-space positions.

use super::FluidField;

/// Velocity added per cell of pointer travel.
pub const POINTER_VELOCITY_GAIN: f32 = 5.0;
/// Density dropped under the pointer on every move.
pub const POINTER_DENSITY: f32 = 100.0;

/// Scroll deltas at or below this magnitude are ignored.
const SCROLL_THRESHOLD: f32 = 1.0;
/// Rows above the bottom edge where scroll forcing is applied.
const SCROLL_ROW_OFFSET: i32 = 5;

/// Tracks hover state and turns pointer motion into fluid injections.
#[derive(Debug, Clone)]
pub struct PointerInjector {
    pub velocity_gain: f32,
    pub density_amount: f32,
    last_cell: Option<(i32, i32)>,
}

impl Default for PointerInjector {
    fn default() -> Self {
        Self {
            velocity_gain: POINTER_VELOCITY_GAIN,
            density_amount: POINTER_DENSITY,
            last_cell: None,
        }
    }
}

impl PointerInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the previous move landed inside the grid.
    pub fn is_hovering(&self) -> bool {
        self.last_cell.is_some()
    }

    /// Handle a pointer move at normalised `(nx, ny)`.
    ///
    /// Strictly interior cells get density, plus velocity proportional to the
    /// cell delta when the previous move was also inside. Anything on or past
    /// the edge ends hovering. Returns `true` if something was injected.
    pub fn pointer_moved(&mut self, field: &mut FluidField, nx: f32, ny: f32) -> bool {
        let size = field.size() as f32;
        let x = (nx * size).floor();
        let y = (ny * size).floor();

        // Also rejects NaN
        if !(x > 0.0 && x < size && y > 0.0 && y < size) {
            self.last_cell = None;
            return false;
        }
        let (x, y) = (x as i32, y as i32);

        if let Some((lx, ly)) = self.last_cell {
            field.add_velocity(
                x,
                y,
                (x - lx) as f32 * self.velocity_gain,
                (y - ly) as f32 * self.velocity_gain,
            );
        }
        field.add_density(x, y, self.density_amount);
        self.last_cell = Some((x, y));
        true
    }

    /// Pointer left the container.
    pub fn pointer_left(&mut self) {
        self.last_cell = None;
    }
}

/// Inject a scroll gesture near the bottom edge.
///
/// Pushes every second column of row `size - 5` upward by `delta * 0.5`
/// (grid y points down) and seeds density on every tenth column. Returns
/// `false` when `|delta| <= 1` or non-finite.
pub fn inject_scroll(field: &mut FluidField, delta: f32) -> bool {
    if !(delta.abs() > SCROLL_THRESHOLD) || !delta.is_finite() {
        return false;
    }
    let strength = delta * 0.5;
    let size = field.size() as i32;
    let row = size - SCROLL_ROW_OFFSET;

    for x in (0..size).step_by(2) {
        field.add_velocity(x, row, 0.0, -strength);
    }
    for x in (0..size).step_by(10) {
        field.add_density(x, row, strength.abs() * 5.0);
    }
    log::trace!("scroll delta {} injected at row {}", delta, row);
    true
}

/// Map normalised screen coordinates to particle space.
///
/// `(0, 0)` is the top-left corner and lands on `(-extent, extent)`.
#[inline]
pub fn to_particle_space(nx: f32, ny: f32, extent: f32) -> (f32, f32) {
    (nx * 2.0 * extent - extent, -ny * 2.0 * extent + extent)
}
