/// Color to luminance conversion.
///
/// Y = 0.299*R + 0.587*G + 0.114*B, computed with integer weights:
/// Y = (76*R + 150*G + 29*B) >> 8
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: i32 = 76;
const COEF_G: i32 = 150;
const COEF_B: i32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as i32 + COEF_G * g as i32 + COEF_B * b as i32) >> 8;
    lum.min(255) as u8
}

/// Convert packed pixels with `channels` bytes each, one row per rayon task
fn to_grayscale_parallel(pixels: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * channels;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * channels;
            *out = luma(pixels[idx], pixels[idx + 1], pixels[idx + 2]);
        }
    });

    gray
}

/// Convert RGB to grayscale using parallel processing
pub fn rgb_to_grayscale_parallel(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_grayscale_parallel(rgb, width, height, 3)
}

/// Convert RGBA to grayscale using parallel processing (alpha ignored)
pub fn rgba_to_grayscale_parallel(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    to_grayscale_parallel(rgba, width, height, 4)
}
