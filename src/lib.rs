//! Fluid Backdrop - Interactive 2-D fluid and particle field for animated backgrounds.
//!
//! This crate provides a stable-fluids solver on a square grid and an
//! orbiting particle population that can optionally be steered by the
//! fluid's velocity. Both are driven frame by frame by a host (browser
//! canvas via WebAssembly, or the headless CLI).
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types and validation
//! - `compute`: Fluid solver, particle field, input mapping and rasterisation
//!
//! # Example
//!
//! ```rust,no_run
//! use fluid_backdrop::compute::{FluidField, FluidStats, ParticleField};
//!
//! let mut fluid = FluidField::new(128, 0.1, 0.0001, 0.0001)?;
//! let mut particles = ParticleField::new(10_000)?;
//!
//! fluid.add_density(64, 64, 100.0);
//! fluid.add_velocity(64, 64, 5.0, 0.0);
//!
//! for _ in 0..60 {
//!     fluid.step();
//!     particles.update(1.0 / 60.0, 0.0, 0.0, Some(fluid.velocity_view()));
//! }
//!
//! println!("{:?}", FluidStats::from_field(&fluid));
//! # Ok::<(), fluid_backdrop::schema::ConfigError>(())
//! ```

pub mod compute;
pub mod schema;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use compute::{FluidField, FluidStats, FluidVelocityView, ParticleField};
pub use schema::{ConfigError, FluidConfig, ParticleConfig, SceneConfig};
