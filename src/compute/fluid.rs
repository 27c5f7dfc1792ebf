//! Fluid field - Square-grid stable-fluids solver driving the backdrop.
//!
//! Owns density and velocity grids plus the scratch grids the step pipeline
//! needs. All buffers are allocated once in the constructor and reused.

use serde::{Deserialize, Serialize};

use crate::schema::{ConfigError, FluidConfig};

use super::{
    FieldKind, FluidVelocityView, advect, checked_index, diffuse, mean_abs_divergence, project,
};

/// 2-D density + velocity grid advanced by a fixed `dt` per [`step`](Self::step).
pub struct FluidField {
    config: FluidConfig,
    density: Vec<f32>,
    density_prev: Vec<f32>,
    vx: Vec<f32>,
    vy: Vec<f32>,
    vx_prev: Vec<f32>,
    vy_prev: Vec<f32>,
    steps: u64,
}

impl FluidField {
    /// Create a zeroed field with default solver settings.
    ///
    /// Fails for `size <= 2` (no interior cell), a non-positive `dt`, or
    /// negative coefficients.
    pub fn new(size: usize, dt: f32, diffusion: f32, viscosity: f32) -> Result<Self, ConfigError> {
        Self::from_config(FluidConfig::new(size, dt, diffusion, viscosity))
    }

    /// Create a zeroed field from a full configuration.
    pub fn from_config(config: FluidConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cells = config.cell_count();
        log::debug!(
            "fluid field {}x{} (dt={}, diffusion={}, viscosity={}, iterations={})",
            config.size,
            config.size,
            config.dt,
            config.diffusion,
            config.viscosity,
            config.solver_iterations
        );

        Ok(Self {
            config,
            density: vec![0.0; cells],
            density_prev: vec![0.0; cells],
            vx: vec![0.0; cells],
            vy: vec![0.0; cells],
            vx_prev: vec![0.0; cells],
            vy_prev: vec![0.0; cells],
            steps: 0,
        })
    }

    /// Add `amount` of density at cell `(x, y)`. Out-of-range cells are ignored.
    pub fn add_density(&mut self, x: i32, y: i32, amount: f32) {
        if let Some(idx) = checked_index(x, y, self.config.size) {
            self.density[idx] += amount;
        }
    }

    /// Add velocity at cell `(x, y)`. Out-of-range cells are ignored.
    pub fn add_velocity(&mut self, x: i32, y: i32, amount_x: f32, amount_y: f32) {
        if let Some(idx) = checked_index(x, y, self.config.size) {
            self.vx[idx] += amount_x;
            self.vy[idx] += amount_y;
        }
    }

    /// Advance the field by one `dt`.
    ///
    /// Velocity: diffuse, project, advect through itself, project again.
    /// Density: diffuse, then advect through the projected velocity.
    pub fn step(&mut self) {
        let n = self.config.size;
        let dt = self.config.dt;
        let iterations = self.config.solver_iterations;

        diffuse(
            FieldKind::VelocityX,
            &mut self.vx_prev,
            &self.vx,
            self.config.viscosity,
            dt,
            iterations,
            n,
        );
        diffuse(
            FieldKind::VelocityY,
            &mut self.vy_prev,
            &self.vy,
            self.config.viscosity,
            dt,
            iterations,
            n,
        );

        // vx/vy are free to serve as pressure/divergence scratch here
        project(
            &mut self.vx_prev,
            &mut self.vy_prev,
            &mut self.vx,
            &mut self.vy,
            iterations,
            n,
        );

        advect(
            FieldKind::VelocityX,
            &mut self.vx,
            &self.vx_prev,
            &self.vx_prev,
            &self.vy_prev,
            dt,
            n,
        );
        advect(
            FieldKind::VelocityY,
            &mut self.vy,
            &self.vy_prev,
            &self.vx_prev,
            &self.vy_prev,
            dt,
            n,
        );

        diffuse(
            FieldKind::Scalar,
            &mut self.density_prev,
            &self.density,
            self.config.diffusion,
            dt,
            iterations,
            n,
        );

        project(
            &mut self.vx,
            &mut self.vy,
            &mut self.vx_prev,
            &mut self.vy_prev,
            iterations,
            n,
        );

        advect(
            FieldKind::Scalar,
            &mut self.density,
            &self.density_prev,
            &self.vx,
            &self.vy,
            dt,
            n,
        );

        let floor = self.config.density_floor;
        for d in &mut self.density {
            // Also clamps negative ink injected by the host
            if *d < floor {
                *d = 0.0;
            }
        }

        self.steps += 1;
    }

    /// Run `steps` consecutive steps.
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Zero every grid and the step counter.
    pub fn clear(&mut self) {
        for buf in [
            &mut self.density,
            &mut self.density_prev,
            &mut self.vx,
            &mut self.vy,
            &mut self.vx_prev,
            &mut self.vy_prev,
        ] {
            buf.fill(0.0);
        }
        self.steps = 0;
    }

    /// Grid edge length.
    #[inline]
    pub fn size(&self) -> usize {
        self.config.size
    }

    /// Configuration the field was built with.
    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Number of completed steps since construction or the last `clear`.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Density grid, row-major `x + y * size`.
    #[inline]
    pub fn density(&self) -> &[f32] {
        &self.density
    }

    /// Mutable density grid for hosts that paint directly into it.
    #[inline]
    pub fn density_mut(&mut self) -> &mut [f32] {
        &mut self.density
    }

    /// Horizontal velocity grid.
    #[inline]
    pub fn vx(&self) -> &[f32] {
        &self.vx
    }

    /// Vertical velocity grid.
    #[inline]
    pub fn vy(&self) -> &[f32] {
        &self.vy
    }

    /// Borrow the velocity grids for particle coupling.
    pub fn velocity_view(&self) -> FluidVelocityView<'_> {
        FluidVelocityView::from_grids(&self.vx, &self.vy, self.config.size)
    }

    /// Density at `(x, y)`, or `None` outside the grid.
    pub fn density_at(&self, x: i32, y: i32) -> Option<f32> {
        checked_index(x, y, self.config.size).map(|idx| self.density[idx])
    }
}

/// Fluid statistics for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidStats {
    pub total_density: f32,
    pub max_density: f32,
    pub max_speed: f32,
    pub mean_abs_divergence: f32,
    pub active_cells: usize,
    pub steps: u64,
}

impl FluidStats {
    /// Compute statistics from a field.
    pub fn from_field(field: &FluidField) -> Self {
        let mut total_density = 0.0f32;
        let mut max_density = 0.0f32;
        let mut active_cells = 0usize;
        for &d in field.density() {
            total_density += d;
            max_density = max_density.max(d);
            if d > 1e-6 {
                active_cells += 1;
            }
        }

        let max_speed = field
            .vx()
            .iter()
            .zip(field.vy())
            .map(|(x, y)| (x * x + y * y).sqrt())
            .fold(0.0f32, f32::max);

        Self {
            total_density,
            max_density,
            max_speed,
            mean_abs_divergence: mean_abs_divergence(field.vx(), field.vy(), field.size()),
            active_cells,
            steps: field.steps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{interior_total, ix};
    use proptest::prelude::*;

    fn scenario_field() -> FluidField {
        FluidField::new(16, 0.1, 0.0001, 0.0001).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_sizes() {
        for size in [0, 1, 2] {
            assert!(matches!(
                FluidField::new(size, 0.1, 0.0, 0.0),
                Err(ConfigError::GridTooSmall { .. })
            ));
        }
        assert!(FluidField::new(3, 0.1, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_rejects_overflowing_size() {
        let huge = 1usize.checked_shl(33).unwrap_or(usize::MAX);
        assert!(matches!(
            FluidField::new(huge, 0.1, 0.0, 0.0),
            Err(ConfigError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_buffers_have_equal_length() {
        let field = FluidField::new(7, 0.1, 0.0, 0.0).unwrap();
        assert_eq!(field.density().len(), 49);
        assert_eq!(field.vx().len(), 49);
        assert_eq!(field.vy().len(), 49);
        assert!(field.density().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_single_step_diffuses_locally() {
        let mut field = scenario_field();
        field.add_density(8, 8, 100.0);
        field.step();

        let d = field.density();
        let centre = d[ix(8, 8, 16)];
        assert!(centre < 100.0, "centre should decrease, got {}", centre);
        assert!(centre > 0.0);

        for (x, y) in [(7, 8), (9, 8), (8, 7), (8, 9)] {
            assert!(d[ix(x, y, 16)] > 0.0, "neighbour ({}, {}) should receive density", x, y);
        }

        for (x, y) in [(0, 0), (15, 0), (0, 15), (15, 15)] {
            assert_eq!(d[ix(x, y, 16)], 0.0, "corner ({}, {}) should stay empty", x, y);
        }
    }

    #[test]
    fn test_out_of_range_injection_is_noop() {
        let mut field = scenario_field();
        for (x, y) in [(-1, 0), (0, -1), (16, 0), (0, 16), (i32::MIN, i32::MAX), (100, 100)] {
            field.add_density(x, y, 5.0);
            field.add_velocity(x, y, 1.0, -1.0);
        }
        assert!(field.density().iter().all(|v| *v == 0.0));
        assert!(field.vx().iter().chain(field.vy()).all(|v| *v == 0.0));
        assert_eq!(field.density_at(-1, 3), None);
    }

    #[test]
    fn test_injection_adds_at_exact_cell() {
        let mut field = scenario_field();
        field.add_density(3, 5, 2.0);
        field.add_density(3, 5, 1.5);
        field.add_velocity(15, 0, 0.25, -0.5);

        assert_eq!(field.density()[ix(3, 5, 16)], 3.5);
        assert_eq!(field.density_at(3, 5), Some(3.5));
        assert_eq!(field.vx()[ix(15, 0, 16)], 0.25);
        assert_eq!(field.vy()[ix(15, 0, 16)], -0.5);
    }

    #[test]
    fn test_density_never_exceeds_initial_peak() {
        let mut field = FluidField::new(32, 0.1, 0.0005, 0.0001).unwrap();
        field.add_density(16, 16, 100.0);
        field.add_density(10, 20, 50.0);
        field.add_velocity(16, 16, 40.0, -25.0);
        field.add_velocity(10, 20, -30.0, 10.0);

        let initial_total = interior_total(field.density(), 32);
        for step in 0..300 {
            field.step();
            for &d in field.density() {
                assert!(d.is_finite() && d >= 0.0 && d <= 100.0, "density out of range: {}", d);
            }
            let total = interior_total(field.density(), 32);
            assert!(
                total <= initial_total * 1.001,
                "total density grew at step {}: {} -> {}",
                step,
                initial_total,
                total
            );
        }
    }

    #[test]
    fn test_pure_diffusion_does_not_create_mass() {
        let mut field = FluidField::new(24, 0.1, 0.001, 0.0).unwrap();
        field.add_density(12, 12, 10.0);
        field.step();
        let after_first = interior_total(field.density(), 24);

        let mut previous = after_first;
        for _ in 0..50 {
            field.step();
            let total = interior_total(field.density(), 24);
            assert!(total <= previous * 1.001 + 1e-5, "{} -> {}", previous, total);
            previous = total;
        }
    }

    #[test]
    fn test_negative_injection_is_clamped() {
        let mut field = scenario_field();
        field.add_density(5, 5, -10.0);
        field.step();
        assert!(field.density().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_deterministic() {
        let run = || {
            let mut field = FluidField::new(20, 0.1, 0.0002, 0.0001).unwrap();
            for i in 0..40 {
                let x = 4 + (i % 12);
                field.add_density(x, 10, 25.0);
                field.add_velocity(x, 10, 3.0, -2.0 + i as f32 * 0.1);
                field.step();
            }
            (field.density().to_vec(), field.vx().to_vec(), field.vy().to_vec())
        };

        let (d1, vx1, vy1) = run();
        let (d2, vx2, vy2) = run();

        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&d1), bits(&d2));
        assert_eq!(bits(&vx1), bits(&vx2));
        assert_eq!(bits(&vy1), bits(&vy2));
    }

    #[test]
    fn test_velocity_swirls_density_away() {
        let mut field = FluidField::new(32, 0.1, 0.0, 0.0).unwrap();
        field.add_density(16, 16, 50.0);
        for _ in 0..5 {
            field.add_velocity(16, 16, 80.0, 0.0);
            field.step();
        }
        let stats = FluidStats::from_field(&field);
        assert!(stats.max_speed > 0.0);
        // Density has moved off the injection cell
        assert!(field.density()[ix(16, 16, 32)] < 50.0);
        assert!(stats.active_cells > 1);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut field = scenario_field();
        field.add_density(4, 4, 10.0);
        field.add_velocity(4, 4, 1.0, 1.0);
        field.run(3);
        assert_eq!(field.steps(), 3);

        field.clear();
        assert_eq!(field.steps(), 0);
        assert!(field.density().iter().all(|v| *v == 0.0));
        assert!(field.vx().iter().chain(field.vy()).all(|v| *v == 0.0));
    }

    #[test]
    fn test_velocity_view_matches_buffers() {
        let mut field = scenario_field();
        field.add_velocity(2, 3, 1.0, 2.0);
        let view = field.velocity_view();
        assert_eq!(view.size(), 16);
        assert_eq!(view.vx().as_ptr(), field.vx().as_ptr());
        assert_eq!(view.sample(2.0, 3.0), Some((1.0, 2.0)));
    }

    #[test]
    fn test_stats_on_empty_field() {
        let field = scenario_field();
        let stats = FluidStats::from_field(&field);
        assert_eq!(stats.total_density, 0.0);
        assert_eq!(stats.max_speed, 0.0);
        assert_eq!(stats.active_cells, 0);
        assert_eq!(stats.steps, 0);
    }

    proptest! {
        #[test]
        fn prop_injections_never_escape_grid(
            size in 3usize..12,
            ops in prop::collection::vec(
                (-20i32..40, -20i32..40, -50.0f32..50.0, -50.0f32..50.0),
                1..40,
            ),
        ) {
            let mut field = FluidField::new(size, 0.1, 0.001, 0.001).unwrap();
            for &(x, y, a, b) in &ops {
                let before = field.density().to_vec();
                field.add_density(x, y, a.abs());
                field.add_velocity(x, y, a, b);

                let inside = x >= 0 && y >= 0 && (x as usize) < size && (y as usize) < size;
                if !inside {
                    prop_assert_eq!(&before, &field.density().to_vec());
                }
                field.step();
            }

            prop_assert_eq!(field.density().len(), size * size);
            for v in field.density().iter().chain(field.vx()).chain(field.vy()) {
                prop_assert!(v.is_finite());
            }
            for &d in field.density() {
                prop_assert!(d >= 0.0);
            }
        }
    }
}
