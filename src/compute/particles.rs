//! Particle field - Orbiting particle population steered by a flow field.
//!
//! Particles live in a square particle space `[-extent, extent]^2` (y up) and
//! are stored as structure-of-arrays so renderers can upload the position,
//! color and size buffers directly.
//!
//! # Motion model
//!
//! Each update, a particle's velocity relaxes toward a base flow (orbit around
//! the centre plus a radial spring onto its ring, with an outward push inside
//! the core), then picks up a pointer push and, when a fluid view is supplied,
//! a share of the local fluid velocity. Particles that leave `bounds` are
//! recycled back onto their ring, so the population size never changes.

use std::f32::consts::TAU;

use rand::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::schema::{ConfigError, ParticleConfig};

use super::FluidVelocityView;

/// Per-particle orbit parameters fixed at construction.
#[derive(Debug, Clone, Copy)]
struct Orbit {
    /// Ring index as a float (drives phase offsets and depth).
    ring: f32,
    /// Rest radius of the ring.
    radius: f32,
    /// Angular speed in radians per second.
    angular_speed: f32,
    /// Size before the pulse is applied.
    base_size: f32,
}

/// Everything one particle needs from the current frame.
struct Frame<'a> {
    config: &'a ParticleConfig,
    dt: f32,
    time: f32,
    pointer: Option<(f32, f32)>,
    fluid: Option<FluidVelocityView<'a>>,
}

/// Fixed-size particle population.
pub struct ParticleField {
    config: ParticleConfig,
    /// x, y, z per particle.
    positions: Vec<f32>,
    /// vx, vy per particle.
    velocities: Vec<f32>,
    /// r, g, b per particle.
    colors: Vec<f32>,
    sizes: Vec<f32>,
    orbits: Vec<Orbit>,
    /// Recycle counter per particle, salts the respawn angle.
    generations: Vec<u32>,
    time: f32,
    recycled: u64,
}

impl ParticleField {
    /// Create `count` particles with the default motion parameters.
    pub fn new(count: usize) -> Result<Self, ConfigError> {
        Self::with_config(ParticleConfig::with_count(count))
    }

    /// Create a particle field from a full configuration.
    ///
    /// Particle `i` starts on ring `i % rings` along a seven-turn spiral, so
    /// the scene is populated from the first frame.
    pub fn with_config(config: ParticleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let count = config.count;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut positions = Vec::with_capacity(count * 3);
        let mut velocities = Vec::with_capacity(count * 2);
        let mut colors = Vec::with_capacity(count * 3);
        let mut sizes = Vec::with_capacity(count);
        let mut orbits = Vec::with_capacity(count);

        for i in 0..count {
            let ring = (i % config.rings) as f32;
            let radius = config.ring_base + ring * config.ring_spacing;
            let angle = i as f32 / count as f32 * TAU * 7.0;

            let orbit = Orbit {
                ring,
                radius,
                angular_speed: rng.gen_range(config.orbit_speed.0..=config.orbit_speed.1),
                base_size: rng.gen_range(config.size_range.0..=config.size_range.1),
            };

            let x = angle.cos() * radius;
            let y = angle.sin() * radius * config.vertical_squash;
            let (vx, vy) = base_flow(&config, &orbit, x, y, 0.0);

            positions.extend_from_slice(&[x, y, depth(&config, &orbit, i, 0.0)]);
            velocities.extend_from_slice(&[vx, vy]);
            colors.extend_from_slice(&config.palette[i % config.palette.len()]);
            sizes.push(orbit.base_size);
            orbits.push(orbit);
        }

        log::debug!(
            "particle field with {} particles on {} rings",
            count,
            config.rings
        );

        Ok(Self {
            config,
            positions,
            velocities,
            colors,
            sizes,
            orbits,
            generations: vec![0; count],
            time: 0.0,
            recycled: 0,
        })
    }

    /// Advance every particle by `dt`.
    ///
    /// `pointer_x`/`pointer_y` are in particle space before `pointer_scale`.
    /// With `fluid == None` the coupling term is skipped entirely. `dt` is
    /// clamped to `[0, max_dt]`; a NaN `dt` counts as zero.
    pub fn update(
        &mut self,
        dt: f32,
        pointer_x: f32,
        pointer_y: f32,
        fluid: Option<FluidVelocityView<'_>>,
    ) {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_dt)
        } else {
            0.0
        };
        let time = self.time + dt;

        let pointer = (pointer_x.is_finite() && pointer_y.is_finite()).then(|| {
            (
                pointer_x * self.config.pointer_scale,
                pointer_y * self.config.pointer_scale,
            )
        });

        let frame = Frame {
            config: &self.config,
            dt,
            time,
            pointer,
            fluid,
        };

        #[cfg(not(target_arch = "wasm32"))]
        let recycled = self
            .positions
            .par_chunks_mut(3)
            .zip(self.velocities.par_chunks_mut(2))
            .zip(self.sizes.par_iter_mut())
            .zip(self.orbits.par_iter())
            .zip(self.generations.par_iter_mut())
            .enumerate()
            .map(|(i, ((((pos, vel), size), orbit), generation))| {
                advance(&frame, i, pos, vel, size, orbit, generation)
            })
            .filter(|&recycled| recycled)
            .count();

        #[cfg(target_arch = "wasm32")]
        let recycled = self
            .positions
            .chunks_mut(3)
            .zip(self.velocities.chunks_mut(2))
            .zip(self.sizes.iter_mut())
            .zip(self.orbits.iter())
            .zip(self.generations.iter_mut())
            .enumerate()
            .map(|(i, ((((pos, vel), size), orbit), generation))| {
                advance(&frame, i, pos, vel, size, orbit, generation)
            })
            .filter(|&recycled| recycled)
            .count();

        if recycled > 0 {
            log::trace!("recycled {} particles", recycled);
        }
        self.recycled += recycled as u64;
        self.time = time;
    }

    /// Number of particles (constant).
    #[inline]
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Accumulated simulation time.
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Total number of recycles since construction.
    pub fn recycled(&self) -> u64 {
        self.recycled
    }

    /// Configuration the field was built with.
    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// Positions, `count * 3` floats (x, y, z).
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Colors, `count * 3` floats (r, g, b).
    #[inline]
    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    /// Sizes, `count` floats.
    #[inline]
    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    /// Position buffer as raw bytes for vertex buffer uploads.
    pub fn positions_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Color buffer as raw bytes.
    pub fn colors_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Size buffer as raw bytes.
    pub fn sizes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.sizes)
    }

    /// Mean particle speed in particle-space units per second.
    ///
    /// Same units as `max_speed`, which bounds it after any `update`. Meant
    /// for monitoring (the CLI progress line), not for the motion model.
    pub fn mean_speed(&self) -> f32 {
        let total: f32 = self
            .velocities
            .chunks_exact(2)
            .map(|v| (v[0] * v[0] + v[1] * v[1]).sqrt())
            .sum();
        total / self.count() as f32
    }
}

/// Move one particle. Returns `true` if it was recycled.
#[inline]
fn advance(
    frame: &Frame<'_>,
    i: usize,
    pos: &mut [f32],
    vel: &mut [f32],
    size: &mut f32,
    orbit: &Orbit,
    generation: &mut u32,
) -> bool {
    let cfg = frame.config;
    let dt = frame.dt;
    let (x, y) = (pos[0], pos[1]);
    let (mut vx, mut vy) = (vel[0], vel[1]);

    // Relax toward the base flow
    let (tx, ty) = base_flow(cfg, orbit, x, y, frame.time);
    let blend = 1.0 - (-cfg.steering * dt).exp();
    vx += (tx - vx) * blend;
    vy += (ty - vy) * blend;

    if let Some((px, py)) = frame.pointer {
        let dx = x - px;
        let dy = y - py;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < cfg.pointer_radius {
            let d = dist.max(cfg.pointer_min_distance);
            let push = cfg.pointer_strength * (cfg.pointer_radius - d) / cfg.pointer_radius;
            vx += dx / d * push * dt;
            vy += dy / d * push * dt;
        }
    }

    if let Some(view) = frame.fluid {
        if let Some((fx, fy)) = sample_fluid(&view, cfg.extent, x, y) {
            // Grid y points down, particle y points up
            let span = 2.0 * cfg.extent;
            vx += fx * span * cfg.fluid_coupling * dt;
            vy -= fy * span * cfg.fluid_coupling * dt;
        }
    }

    let speed = (vx * vx + vy * vy).sqrt();
    if !speed.is_finite() {
        vx = 0.0;
        vy = 0.0;
    } else if speed > cfg.max_speed {
        let scale = cfg.max_speed / speed;
        vx *= scale;
        vy *= scale;
    }

    let mut nx = x + vx * dt;
    let mut ny = y + vy * dt;

    // Negated comparison so NaN positions recycle too
    let recycled = !(nx.abs() <= cfg.bounds && ny.abs() <= cfg.bounds);
    if recycled {
        *generation = generation.wrapping_add(1);
        let angle = hash01(i as u32, *generation) * TAU;
        nx = angle.cos() * orbit.radius;
        ny = angle.sin() * orbit.radius * cfg.vertical_squash;
        vx = 0.0;
        vy = 0.0;
    }

    pos[0] = nx;
    pos[1] = ny;
    pos[2] = depth(cfg, orbit, i, frame.time);
    vel[0] = vx;
    vel[1] = vy;

    let pulse = 1.0 + (frame.time * 1.5 + i as f32 * 0.05).sin() * 0.15;
    *size = (orbit.base_size * pulse).clamp(0.2, 2.5);

    recycled
}

/// Orbital + avoidance flow at `(x, y)`.
///
/// Computed in orbit space (y divided by `vertical_squash`), where rings are
/// circles, then mapped back.
fn base_flow(cfg: &ParticleConfig, orbit: &Orbit, x: f32, y: f32, time: f32) -> (f32, f32) {
    let oy = y / cfg.vertical_squash;
    let r = (x * x + oy * oy).sqrt();
    if r < 1e-3 {
        return (cfg.avoidance, 0.0);
    }
    let (ux, uy) = (x / r, oy / r);

    let ring_radius = orbit.radius + (time * 0.5 + orbit.ring).sin() * 3.0;
    let mut radial = cfg.radial_pull * (ring_radius - r);
    if r < cfg.core_radius {
        radial += cfg.avoidance * (1.0 - r / cfg.core_radius);
    }

    let tangential = orbit.angular_speed * r;
    let vx = -uy * tangential + ux * radial;
    let vy = ux * tangential + uy * radial;
    (vx, vy * cfg.vertical_squash)
}

/// Gently oscillating depth, deeper for outer rings.
#[inline]
fn depth(cfg: &ParticleConfig, orbit: &Orbit, i: usize, time: f32) -> f32 {
    cfg.depth_base - orbit.ring * 5.0 + (time * 0.3 + i as f32 * 0.01).sin() * 5.0
}

/// Sample fluid velocity under a particle-space point.
///
/// `[-extent, extent]` maps onto the grid with y inverted; cell centres sit at
/// half-integer offsets. Non-finite samples are dropped.
fn sample_fluid(view: &FluidVelocityView<'_>, extent: f32, x: f32, y: f32) -> Option<(f32, f32)> {
    let n = view.size() as f32;
    let gx = (x + extent) / (2.0 * extent) * n - 0.5;
    let gy = (-y + extent) / (2.0 * extent) * n - 0.5;
    view.sample(gx, gy)
        .filter(|(fx, fy)| fx.is_finite() && fy.is_finite())
}

/// Deterministic hash of `(a, b)` to `[0, 1)`.
#[inline]
fn hash01(a: u32, b: u32) -> f32 {
    let mut h = a.wrapping_mul(0x9E37_79B1) ^ b.wrapping_mul(0x85EB_CA77);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^= h >> 16;
    (h >> 8) as f32 / (1u32 << 24) as f32
}
