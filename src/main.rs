//! Fluid Backdrop CLI - Run a headless scripted session from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::Instant;

use fluid_backdrop::{
    compute::{
        FluidField, FluidStats, ParticleField, PointerInjector, density_image, inject_scroll,
        to_particle_space,
    },
    schema::SceneConfig,
};

/// Host frame time the scripted session pretends to run at.
const FRAME_DT: f32 = 1.0 / 60.0;

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scene.json> [frames]", args[0]);
        eprintln!();
        eprintln!("Run a headless fluid + particle session from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  scene.json   Path to scene configuration file");
        eprintln!("  frames       Number of frames to simulate (default: 600)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let frames: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(600);

    let scene = SceneConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading scene config: {}", e);
        std::process::exit(1);
    });

    println!("Fluid Backdrop Session");
    println!("======================");
    println!(
        "Fluid: {}x{} (dt={}, diffusion={}, viscosity={})",
        scene.fluid.size,
        scene.fluid.size,
        scene.fluid.dt,
        scene.fluid.diffusion,
        scene.fluid.viscosity
    );
    println!("Particles: {}", scene.particles.count);
    println!("Frames: {}", frames);
    println!();

    let mut fluid = FluidField::from_config(scene.fluid.clone()).unwrap_or_else(|e| {
        eprintln!("Error creating fluid: {}", e);
        std::process::exit(1);
    });
    let mut particles = ParticleField::with_config(scene.particles.clone()).unwrap_or_else(|e| {
        eprintln!("Error creating particles: {}", e);
        std::process::exit(1);
    });
    let mut pointer = PointerInjector::new();
    let extent = scene.particles.extent;

    println!("Running session...");
    let start = Instant::now();

    for frame in 0..frames {
        // Pointer circles the centre once every ~4 seconds
        let angle = frame as f32 * FRAME_DT * TAU / 4.0;
        let nx = 0.5 + 0.3 * angle.cos();
        let ny = 0.5 + 0.3 * angle.sin();

        pointer.pointer_moved(&mut fluid, nx, ny);
        if frame % 120 == 60 {
            inject_scroll(&mut fluid, 20.0);
        }
        fluid.step();

        let (px, py) = to_particle_space(nx, ny, extent);
        particles.update(FRAME_DT, px, py, Some(fluid.velocity_view()));

        // Print progress every 10%
        if (frame + 1) % (frames / 10).max(1) == 0 {
            let stats = FluidStats::from_field(&fluid);
            let elapsed = start.elapsed().as_secs_f32();
            let fps = (frame + 1) as f32 / elapsed;
            println!(
                "  Frame {}/{}: density={:.3}, max_speed={:.4}, div={:.2e}, particle_speed={:.2}, {:.1} frames/s",
                frame + 1,
                frames,
                stats.total_density,
                stats.max_speed,
                stats.mean_abs_divergence,
                particles.mean_speed(),
                fps
            );
        }
    }

    let elapsed = start.elapsed();
    let stats = FluidStats::from_field(&fluid);
    let image = density_image(fluid.density(), scene.tint);
    let visible = image.chunks_exact(4).filter(|px| px[3] > 0).count();

    println!();
    println!("Final state:");
    println!("  Total density: {:.6}", stats.total_density);
    println!("  Max density: {:.6}", stats.max_density);
    println!("  Active cells: {}", stats.active_cells);
    println!("  Visible pixels: {}/{}", visible, fluid.size() * fluid.size());
    println!(
        "  Particles: {} (recycled {}), t={:.2}s",
        particles.count(),
        particles.recycled(),
        particles.time()
    );
    println!();
    println!(
        "Time: {:.2}s ({:.1} frames/s)",
        elapsed.as_secs_f32(),
        frames as f32 / elapsed.as_secs_f32()
    );
}

fn print_example_config() {
    match serde_json::to_string_pretty(&SceneConfig::default()) {
        Ok(json) => {
            println!("Example configuration (scene.json):");
            println!("{}", json);
        }
        Err(e) => {
            eprintln!("Error serializing example config: {}", e);
            std::process::exit(1);
        }
    }
}
