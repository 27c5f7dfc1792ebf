//! WebAssembly bindings for Fluid Backdrop.
//!
//! Provides thin wrappers around `FluidField` and `ParticleField` for browser
//! environments. Buffers are exposed both as raw pointers into linear memory
//! and as zero-copy `Float32Array` views.

use wasm_bindgen::prelude::*;

use crate::{
    compute::{
        FluidField, FluidStats, ParticleField, PointerInjector, density_image, inject_scroll,
        rasterize_density, to_particle_space,
    },
    schema::{ParticleConfig, SceneConfig},
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    // Initialize WASM logger
    wasm_logger::init(wasm_logger::Config::default());
}

/// Map normalised container coordinates to particle space `[-100, 100]^2`.
#[wasm_bindgen(js_name = toParticleSpace)]
pub fn to_particle_space_js(nx: f32, ny: f32) -> Vec<f32> {
    let (x, y) = to_particle_space(nx, ny, ParticleConfig::default().extent);
    vec![x, y]
}

/// WebAssembly wrapper for the fluid solver.
#[wasm_bindgen]
pub struct FluidSimulator {
    field: FluidField,
    pointer: PointerInjector,
    tint: [u8; 3],
}

#[wasm_bindgen]
impl FluidSimulator {
    /// Create a fluid of `size x size` cells.
    #[wasm_bindgen(constructor)]
    pub fn new(
        size: usize,
        dt: f32,
        diffusion: f32,
        viscosity: f32,
    ) -> Result<FluidSimulator, JsValue> {
        let field = FluidField::new(size, dt, diffusion, viscosity)
            .map_err(|e| JsValue::from_str(&format!("Invalid fluid parameters: {e}")))?;

        Ok(FluidSimulator {
            field,
            pointer: PointerInjector::new(),
            tint: SceneConfig::default().tint,
        })
    }

    /// Create a fluid from a JSON `SceneConfig` (particle section ignored).
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(scene_json: &str) -> Result<FluidSimulator, JsValue> {
        let scene = SceneConfig::from_json_str(scene_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid scene config: {e}")))?;
        let field = FluidField::from_config(scene.fluid)
            .map_err(|e| JsValue::from_str(&format!("Invalid fluid parameters: {e}")))?;

        Ok(FluidSimulator {
            field,
            pointer: PointerInjector::new(),
            tint: scene.tint,
        })
    }

    #[wasm_bindgen(js_name = addDensity)]
    pub fn add_density(&mut self, x: i32, y: i32, amount: f32) {
        self.field.add_density(x, y, amount);
    }

    #[wasm_bindgen(js_name = addVelocity)]
    pub fn add_velocity(&mut self, x: i32, y: i32, amount_x: f32, amount_y: f32) {
        self.field.add_velocity(x, y, amount_x, amount_y);
    }

    /// Perform one simulation step.
    #[wasm_bindgen]
    pub fn step(&mut self) {
        self.field.step();
    }

    /// Run multiple simulation steps.
    #[wasm_bindgen]
    pub fn run(&mut self, steps: u32) {
        self.field.run(steps as u64);
    }

    /// Zero every grid (e.g. when the page becomes visible again).
    #[wasm_bindgen]
    pub fn clear(&mut self) {
        self.field.clear();
        self.pointer.pointer_left();
    }

    /// Pointer moved to normalised container coordinates.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, nx: f32, ny: f32) -> bool {
        self.pointer.pointer_moved(&mut self.field, nx, ny)
    }

    /// Pointer left the container.
    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self) {
        self.pointer.pointer_left();
    }

    /// Inject a wheel/scroll delta.
    #[wasm_bindgen]
    pub fn scroll(&mut self, delta: f32) -> bool {
        inject_scroll(&mut self.field, delta)
    }

    /// Grid edge length.
    #[wasm_bindgen]
    pub fn size(&self) -> usize {
        self.field.size()
    }

    /// Steps taken since construction or the last `clear`.
    #[wasm_bindgen(js_name = getStep)]
    pub fn get_step(&self) -> u64 {
        self.field.steps()
    }

    /// Address of the density grid in linear memory.
    #[wasm_bindgen(js_name = densityPtr)]
    pub fn density_ptr(&self) -> *const f32 {
        self.field.density().as_ptr()
    }

    /// Address of the horizontal velocity grid in linear memory.
    #[wasm_bindgen(js_name = vxPtr)]
    pub fn vx_ptr(&self) -> *const f32 {
        self.field.vx().as_ptr()
    }

    /// Address of the vertical velocity grid in linear memory.
    #[wasm_bindgen(js_name = vyPtr)]
    pub fn vy_ptr(&self) -> *const f32 {
        self.field.vy().as_ptr()
    }

    /// Zero-copy view of the density grid.
    ///
    /// Invalidated by any allocation that grows WASM memory; re-fetch it
    /// every frame instead of caching it.
    #[wasm_bindgen(js_name = densityView)]
    pub fn density_view(&self) -> js_sys::Float32Array {
        // SAFETY: the view is handed straight to JS and the grid is never
        // reallocated while the simulator lives.
        unsafe { js_sys::Float32Array::view(self.field.density()) }
    }

    /// Render density into a caller-provided RGBA buffer.
    #[wasm_bindgen(js_name = renderRgba)]
    pub fn render_rgba(&self, out: &mut [u8]) -> usize {
        rasterize_density(self.field.density(), self.tint, out)
    }

    /// Render density into a freshly allocated RGBA buffer.
    #[wasm_bindgen(js_name = densityImage)]
    pub fn density_image(&self) -> Vec<u8> {
        density_image(self.field.density(), self.tint)
    }

    /// Get fluid statistics as a JS object.
    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        let stats = FluidStats::from_field(&self.field);
        serde_wasm_bindgen::to_value(&stats)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }
}

/// WebAssembly wrapper for the particle field.
#[wasm_bindgen]
pub struct ParticleSystem {
    field: ParticleField,
}

#[wasm_bindgen]
impl ParticleSystem {
    /// Create `count` particles with default motion parameters.
    #[wasm_bindgen(constructor)]
    pub fn new(count: usize) -> Result<ParticleSystem, JsValue> {
        let field = ParticleField::new(count)
            .map_err(|e| JsValue::from_str(&format!("Invalid particle count: {e}")))?;
        log::info!("particle system with {} particles", count);
        Ok(ParticleSystem { field })
    }

    /// Create particles from a JSON `ParticleConfig`.
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(config_json: &str) -> Result<ParticleSystem, JsValue> {
        let config: ParticleConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid particle config JSON: {e}")))?;
        let field = ParticleField::with_config(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid particle config: {e}")))?;
        Ok(ParticleSystem { field })
    }

    /// Advance without fluid coupling.
    #[wasm_bindgen]
    pub fn update(&mut self, dt: f32, pointer_x: f32, pointer_y: f32) {
        self.field.update(dt, pointer_x, pointer_y, None);
    }

    /// Advance, pulled along by `fluid`'s current velocity.
    #[wasm_bindgen(js_name = updateWithFluid)]
    pub fn update_with_fluid(
        &mut self,
        dt: f32,
        pointer_x: f32,
        pointer_y: f32,
        fluid: &FluidSimulator,
    ) {
        self.field
            .update(dt, pointer_x, pointer_y, Some(fluid.field.velocity_view()));
    }

    #[wasm_bindgen]
    pub fn count(&self) -> usize {
        self.field.count()
    }

    #[wasm_bindgen(js_name = getTime)]
    pub fn get_time(&self) -> f32 {
        self.field.time()
    }

    /// Address of the `count * 3` position buffer.
    #[wasm_bindgen(js_name = positionsPtr)]
    pub fn positions_ptr(&self) -> *const f32 {
        self.field.positions().as_ptr()
    }

    /// Address of the `count * 3` color buffer.
    #[wasm_bindgen(js_name = colorsPtr)]
    pub fn colors_ptr(&self) -> *const f32 {
        self.field.colors().as_ptr()
    }

    /// Address of the `count` size buffer.
    #[wasm_bindgen(js_name = sizesPtr)]
    pub fn sizes_ptr(&self) -> *const f32 {
        self.field.sizes().as_ptr()
    }

    /// Zero-copy view of the positions. Re-fetch every frame.
    #[wasm_bindgen(js_name = positionsView)]
    pub fn positions_view(&self) -> js_sys::Float32Array {
        // SAFETY: see `FluidSimulator::density_view`.
        unsafe { js_sys::Float32Array::view(self.field.positions()) }
    }

    /// Zero-copy view of the colors. Re-fetch every frame.
    #[wasm_bindgen(js_name = colorsView)]
    pub fn colors_view(&self) -> js_sys::Float32Array {
        // SAFETY: see `FluidSimulator::density_view`.
        unsafe { js_sys::Float32Array::view(self.field.colors()) }
    }

    /// Zero-copy view of the sizes. Re-fetch every frame.
    #[wasm_bindgen(js_name = sizesView)]
    pub fn sizes_view(&self) -> js_sys::Float32Array {
        // SAFETY: see `FluidSimulator::density_view`.
        unsafe { js_sys::Float32Array::view(self.field.sizes()) }
    }
}
