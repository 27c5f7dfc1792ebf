//! Density to RGBA conversion for canvas upload.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Write one RGBA pixel per density cell into `out`.
///
/// Color is the constant `tint`; alpha is `min(density * 255, 255)`, with
/// negative and NaN densities fully transparent. Converts
/// `min(density.len(), out.len() / 4)` cells and returns that count.
pub fn rasterize_density(density: &[f32], tint: [u8; 3], out: &mut [u8]) -> usize {
    let pixels = density.len().min(out.len() / 4);
    let out = &mut out[..pixels * 4];
    let density = &density[..pixels];

    let write = |(px, d): (&mut [u8], &f32)| {
        px[0] = tint[0];
        px[1] = tint[1];
        px[2] = tint[2];
        // `clamp` keeps NaN, and the cast maps NaN to 0
        px[3] = (d * 255.0).clamp(0.0, 255.0) as u8;
    };

    #[cfg(not(target_arch = "wasm32"))]
    out.par_chunks_mut(4).zip(density.par_iter()).for_each(write);

    #[cfg(target_arch = "wasm32")]
    out.chunks_mut(4).zip(density.iter()).for_each(write);

    pixels
}

/// Allocate and fill an RGBA image for `density`.
pub fn density_image(density: &[f32], tint: [u8; 3]) -> Vec<u8> {
    let mut out = vec![0u8; density.len() * 4];
    rasterize_density(density, tint, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINT: [u8; 3] = [168, 85, 247];

    #[test]
    fn test_alpha_ramp() {
        let density = [0.0, 0.5, 1.0, 3.0, -2.0, f32::NAN, f32::INFINITY];
        let image = density_image(&density, TINT);

        let alpha: Vec<u8> = image.chunks_exact(4).map(|px| px[3]).collect();
        assert_eq!(alpha, vec![0, 127, 255, 255, 0, 0, 255]);
        assert!(image.chunks_exact(4).all(|px| px[..3] == TINT));
    }

    #[test]
    fn test_short_output_is_truncated() {
        let density = [1.0f32; 4];
        let mut out = [9u8; 10];
        assert_eq!(rasterize_density(&density, TINT, &mut out), 2);
        assert_eq!(&out[..8], &[168, 85, 247, 255, 168, 85, 247, 255]);
        // Trailing partial pixel untouched
        assert_eq!(&out[8..], &[9, 9]);
    }

    #[test]
    fn test_empty_input() {
        let mut out = [0u8; 8];
        assert_eq!(rasterize_density(&[], TINT, &mut out), 0);
        assert!(density_image(&[], TINT).is_empty());
    }
}
