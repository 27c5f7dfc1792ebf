//! Browser smoke tests for the WebAssembly bindings.
//!
//! Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use fluid_backdrop::wasm::{FluidSimulator, ParticleSystem};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn fluid_simulator_steps() {
    let mut fluid = FluidSimulator::new(32, 0.1, 0.0001, 0.0001).unwrap();
    fluid.add_density(16, 16, 100.0);
    fluid.add_velocity(16, 16, 2.0, 0.0);
    fluid.step();

    assert_eq!(fluid.size(), 32);
    assert_eq!(fluid.density_view().length(), 32 * 32);

    let mut rgba = vec![0u8; 32 * 32 * 4];
    assert_eq!(fluid.render_rgba(&mut rgba), 32 * 32);
    assert!(rgba.chunks_exact(4).any(|px| px[3] > 0));
}

#[wasm_bindgen_test]
fn fluid_simulator_rejects_tiny_grid() {
    assert!(FluidSimulator::new(2, 0.1, 0.0, 0.0).is_err());
}

#[wasm_bindgen_test]
fn pointer_and_scroll_inject() {
    let mut fluid = FluidSimulator::new(32, 0.1, 0.0001, 0.0001).unwrap();
    assert!(fluid.pointer_move(0.5, 0.5));
    assert!(fluid.pointer_move(0.55, 0.5));
    assert!(fluid.scroll(12.0));
    fluid.pointer_leave();
    assert!(!fluid.pointer_move(1.5, 0.5));
}

#[wasm_bindgen_test]
fn particles_follow_fluid() {
    let mut fluid = FluidSimulator::new(32, 0.1, 0.0001, 0.0001).unwrap();
    let mut particles = ParticleSystem::new(100).unwrap();
    for _ in 0..10 {
        fluid.pointer_move(0.5, 0.5);
        fluid.step();
        particles.update_with_fluid(0.016, 0.0, 0.0, &fluid);
    }
    particles.update(0.016, 0.0, 0.0);

    assert_eq!(particles.count(), 100);
    assert_eq!(particles.positions_view().length(), 300);
    assert_eq!(particles.sizes_view().length(), 100);
    assert!(particles.get_time() > 0.0);
}

#[wasm_bindgen_test]
fn particles_reject_empty() {
    assert!(ParticleSystem::new(0).is_err());
    assert!(ParticleSystem::from_config(r#"{ "count": 0 }"#).is_err());
    assert!(ParticleSystem::from_config(r#"{ "count": 8 }"#).is_ok());
}
