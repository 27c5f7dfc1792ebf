//! Configuration types for the fluid grid and the particle field.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Smallest grid that still has one interior cell inside the boundary ring.
pub const MIN_GRID_SIZE: usize = 3;

/// Density, velocity and their scratch copies.
const GRID_BUFFERS: usize = 6;

/// Top-level scene configuration (fluid + particles + raster tint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Fluid grid parameters.
    #[serde(default)]
    pub fluid: FluidConfig,
    /// Particle field parameters.
    #[serde(default)]
    pub particles: ParticleConfig,
    /// RGB tint used when rasterizing density.
    #[serde(default = "default_tint")]
    pub tint: [u8; 3],
}

fn default_tint() -> [u8; 3] {
    [168, 85, 247]
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fluid: FluidConfig::default(),
            particles: ParticleConfig::default(),
            tint: default_tint(),
        }
    }
}

impl SceneConfig {
    /// Parse a scene from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a scene from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validate both halves of the scene.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fluid.validate()?;
        self.particles.validate()
    }
}

/// Fluid grid parameters. Fixed for the lifetime of a `FluidField`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidConfig {
    /// Grid is `size` x `size` cells, boundary ring included.
    pub size: usize,
    /// Time step per `step()` call.
    pub dt: f32,
    /// Density diffusion rate.
    pub diffusion: f32,
    /// Velocity viscosity.
    pub viscosity: f32,
    /// Gauss-Seidel sweeps per linear solve.
    #[serde(default = "default_solver_iterations")]
    pub solver_iterations: usize,
    /// Density below this is flushed to zero after each step.
    #[serde(default = "default_density_floor")]
    pub density_floor: f32,
}

fn default_solver_iterations() -> usize {
    20
}

fn default_density_floor() -> f32 {
    1e-6
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            size: 128,
            dt: 0.1,
            diffusion: 0.0001,
            viscosity: 0.0001,
            solver_iterations: default_solver_iterations(),
            density_floor: default_density_floor(),
        }
    }
}

impl FluidConfig {
    /// Config with the given core parameters and default solver settings.
    pub fn new(size: usize, dt: f32, diffusion: f32, viscosity: f32) -> Self {
        Self {
            size,
            dt,
            diffusion,
            viscosity,
            ..Self::default()
        }
    }

    /// Number of cells in each grid buffer.
    ///
    /// Saturates for sizes that [`validate`](Self::validate) rejects.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.size.saturating_mul(self.size)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size < MIN_GRID_SIZE {
            return Err(ConfigError::GridTooSmall { size: self.size });
        }
        // Every grid buffer must be addressable as one allocation
        let grid_bytes = self
            .size
            .checked_mul(self.size)
            .and_then(|cells| cells.checked_mul(GRID_BUFFERS * std::mem::size_of::<f32>()));
        if !grid_bytes.is_some_and(|bytes| bytes <= isize::MAX as usize) {
            return Err(ConfigError::GridTooLarge { size: self.size });
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep);
        }
        check_non_negative("diffusion", self.diffusion)?;
        check_non_negative("viscosity", self.viscosity)?;
        check_non_negative("density_floor", self.density_floor)?;
        if self.solver_iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        Ok(())
    }
}

/// Particle field parameters.
///
/// Particle space spans `[-extent, extent]` on both axes with y pointing up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Number of particles (constant for the field's lifetime).
    pub count: usize,
    /// Seed for the initial distribution.
    pub seed: u64,
    /// Number of orbital rings.
    pub rings: usize,
    /// Radius of the innermost ring.
    pub ring_base: f32,
    /// Radial distance between rings.
    pub ring_spacing: f32,
    /// Vertical compression of the orbits (1.0 = circles).
    pub vertical_squash: f32,
    /// Inside this radius particles are pushed outward.
    pub core_radius: f32,
    /// Angular speed range in radians per second.
    pub orbit_speed: (f32, f32),
    /// Rate (1/s) at which velocity relaxes toward the base flow.
    pub steering: f32,
    /// Radial spring (1/s) pulling particles onto their ring.
    pub radial_pull: f32,
    /// Outward speed at the centre of the core.
    pub avoidance: f32,
    /// Factor applied to host pointer coordinates.
    pub pointer_scale: f32,
    /// Pointer influence radius.
    pub pointer_radius: f32,
    /// Distance floor for the pointer falloff.
    pub pointer_min_distance: f32,
    /// Pointer acceleration at the centre. Negative attracts.
    pub pointer_strength: f32,
    /// Rate (1/s) at which sampled fluid velocity is added.
    pub fluid_coupling: f32,
    /// Half-width of particle space.
    pub extent: f32,
    /// Particles beyond this on x or y are recycled.
    pub bounds: f32,
    /// Speed clamp.
    pub max_speed: f32,
    /// Largest accepted `dt` per update.
    pub max_dt: f32,
    /// Base depth of the innermost ring.
    pub depth_base: f32,
    /// Base size range.
    pub size_range: (f32, f32),
    /// Colors assigned round-robin by particle index.
    pub palette: Vec<[f32; 3]>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 10_000,
            seed: 0x5eed,
            rings: 5,
            ring_base: 35.0,
            ring_spacing: 12.0,
            vertical_squash: 0.6,
            core_radius: 25.0,
            orbit_speed: (0.6, 0.9),
            steering: 4.0,
            radial_pull: 2.0,
            avoidance: 40.0,
            pointer_scale: 0.5,
            pointer_radius: 30.0,
            pointer_min_distance: 10.0,
            pointer_strength: 1500.0,
            fluid_coupling: 8.0,
            extent: 100.0,
            bounds: 110.0,
            max_speed: 150.0,
            max_dt: 0.1,
            depth_base: -20.0,
            size_range: (0.3, 1.8),
            palette: vec![
                [0.6, 0.2, 0.9], // purple
                [0.9, 0.2, 0.6], // pink
                [0.2, 0.8, 0.9], // cyan
                [0.4, 0.2, 0.9], // blue-purple
                [0.8, 0.4, 0.9], // light purple
            ],
        }
    }
}

impl ParticleConfig {
    /// Default config with the given particle count.
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::InvalidParticleCount);
        }
        if self.rings == 0 {
            return Err(ConfigError::InvalidParticleParameter { name: "rings" });
        }
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        check_positive("extent", self.extent)?;
        check_positive("bounds", self.bounds)?;
        check_positive("max_speed", self.max_speed)?;
        check_positive("max_dt", self.max_dt)?;
        check_positive("vertical_squash", self.vertical_squash)?;
        check_positive("pointer_radius", self.pointer_radius)?;
        check_positive("pointer_min_distance", self.pointer_min_distance)?;
        check_non_negative("ring_base", self.ring_base)?;
        check_non_negative("ring_spacing", self.ring_spacing)?;
        check_non_negative("core_radius", self.core_radius)?;
        check_non_negative("steering", self.steering)?;
        check_non_negative("radial_pull", self.radial_pull)?;
        check_non_negative("avoidance", self.avoidance)?;
        check_non_negative("fluid_coupling", self.fluid_coupling)?;
        // Respawn points sit on the rings, so every ring must lie inside the recycle bounds
        let outer = self.ring_base + (self.rings - 1) as f32 * self.ring_spacing;
        if !(outer < self.bounds && outer * self.vertical_squash < self.bounds) {
            return Err(ConfigError::InvalidParticleParameter { name: "rings" });
        }
        if !self.pointer_strength.is_finite() || !self.pointer_scale.is_finite() {
            return Err(ConfigError::InvalidParticleParameter { name: "pointer" });
        }
        if !(self.orbit_speed.0.is_finite()
            && self.orbit_speed.1.is_finite()
            && self.orbit_speed.0 <= self.orbit_speed.1)
        {
            return Err(ConfigError::InvalidParticleParameter { name: "orbit_speed" });
        }
        if !(self.size_range.0 > 0.0
            && self.size_range.1.is_finite()
            && self.size_range.0 <= self.size_range.1)
        {
            return Err(ConfigError::InvalidParticleParameter { name: "size_range" });
        }
        Ok(())
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidCoefficient { name })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParticleParameter { name })
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid size {size} is too small (minimum {MIN_GRID_SIZE})")]
    GridTooSmall { size: usize },
    #[error("Grid size {size} is too large to allocate")]
    GridTooLarge { size: usize },
    #[error("Time step must be positive and finite")]
    InvalidTimeStep,
    #[error("Coefficient `{name}` must be finite and non-negative")]
    InvalidCoefficient { name: &'static str },
    #[error("Solver iteration count must be non-zero")]
    InvalidIterations,
    #[error("Particle count must be non-zero")]
    InvalidParticleCount,
    #[error("Particle parameter `{name}` is out of range")]
    InvalidParticleParameter { name: &'static str },
    #[error("Particle palette must contain at least one color")]
    EmptyPalette,
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FluidConfig::default().validate().is_ok());
        assert!(ParticleConfig::default().validate().is_ok());
        assert!(SceneConfig::default().validate().is_ok());
        assert_eq!(SceneConfig::default().tint, [168, 85, 247]);
    }

    #[test]
    fn test_rejects_degenerate_grid() {
        for size in [0, 1, 2] {
            let config = FluidConfig::new(size, 0.1, 0.0, 0.0);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::GridTooSmall { size: s }) if s == size
            ));
        }
        assert!(FluidConfig::new(3, 0.1, 0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_unallocatable_grid() {
        for size in [1usize.checked_shl(33).unwrap_or(usize::MAX), usize::MAX / 2, usize::MAX] {
            let config = FluidConfig::new(size, 0.1, 0.0, 0.0);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::GridTooLarge { size: s }) if s == size
            ));
        }
        assert_eq!(FluidConfig::new(usize::MAX, 0.1, 0.0, 0.0).cell_count(), usize::MAX);
        assert!(FluidConfig::new(1024, 0.1, 0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_time_step() {
        for dt in [0.0, -0.1, f32::NAN, f32::INFINITY] {
            let config = FluidConfig::new(16, dt, 0.0, 0.0);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeStep)));
        }
    }

    #[test]
    fn test_rejects_negative_coefficients() {
        let config = FluidConfig::new(16, 0.1, -1.0, 0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCoefficient { name: "diffusion" })
        ));

        let config = FluidConfig::new(16, 0.1, 0.0, f32::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCoefficient { name: "viscosity" })
        ));
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let config = FluidConfig {
            solver_iterations: 0,
            ..FluidConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidIterations)));
    }

    #[test]
    fn test_particle_validation() {
        assert!(matches!(
            ParticleConfig::with_count(0).validate(),
            Err(ConfigError::InvalidParticleCount)
        ));

        let config = ParticleConfig {
            palette: Vec::new(),
            ..ParticleConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPalette)));

        let config = ParticleConfig {
            orbit_speed: (1.0, 0.5),
            ..ParticleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParticleParameter { name: "orbit_speed" })
        ));
    }

    #[test]
    fn test_rings_must_fit_inside_bounds() {
        let outside = [
            // Innermost ring already past the bounds
            ParticleConfig {
                ring_base: 200.0,
                ..ParticleConfig::with_count(10)
            },
            // Outermost ring 70 + 4 * 12 = 118 crosses bounds 110
            ParticleConfig {
                ring_base: 70.0,
                ..ParticleConfig::default()
            },
            // Stretched vertically: 83 * 1.5 = 124.5
            ParticleConfig {
                vertical_squash: 1.5,
                ..ParticleConfig::default()
            },
        ];
        for config in outside {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidParticleParameter { name: "rings" })
            ));
        }

        let snug = ParticleConfig {
            ring_base: 61.0,
            ..ParticleConfig::default()
        };
        assert!(snug.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let scene = SceneConfig::from_json_str(
            r#"{ "fluid": { "size": 64, "dt": 0.05, "diffusion": 0.0, "viscosity": 0.0 } }"#,
        )
        .unwrap();

        assert_eq!(scene.fluid.size, 64);
        assert_eq!(scene.fluid.solver_iterations, 20);
        assert_eq!(scene.particles.count, ParticleConfig::default().count);
        assert_eq!(scene.tint, [168, 85, 247]);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            SceneConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SceneConfig::from_json_str(r#"{ "particles": { "count": 0 } }"#),
            Err(ConfigError::InvalidParticleCount)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");

        let mut scene = SceneConfig::default();
        scene.fluid.size = 32;
        scene.particles.count = 250;
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(serde_json::to_string_pretty(&scene).unwrap().as_bytes())
            .unwrap();

        let loaded = SceneConfig::load(&path).unwrap();
        assert_eq!(loaded.fluid.size, 32);
        assert_eq!(loaded.particles.count, 250);

        assert!(matches!(
            SceneConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
