//! Compute module - Fluid solver, particle field and host glue.

mod coupling;
mod fluid;
mod grid;
mod input;
mod particles;
mod raster;
mod solver;

pub use coupling::*;
pub use fluid::*;
pub use grid::*;
pub use input::*;
pub use particles::*;
pub use raster::*;
pub use solver::*;
