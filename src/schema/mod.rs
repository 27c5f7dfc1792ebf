//! Schema module - Configuration types for the fluid and particle simulations.

mod config;

pub use config::*;
