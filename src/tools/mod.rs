//! Helpers shared by the CLI, benches and integration tests.

/// Synthetic symbol renderers
pub mod synth;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::GenericImageView;

use crate::models::{BitMatrix, GrayImage, PixelSource};

fn max_dim_from_env() -> Option<u32> {
    match env::var("BARCODE_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image file as 8-bit grayscale.
///
/// When `BARCODE_MAX_DIM` is set, larger images are downscaled so their
/// longer side fits.
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayImage, image::ImageError> {
    let img = image::open(path)?;
    let luma = match max_dim_from_env() {
        Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => img
            .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            .to_luma8(),
        _ => img.to_luma8(),
    };
    Ok(GrayImage::from(luma))
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Summary statistics for a binary matrix.
#[derive(Debug, Clone, Copy)]
pub struct BinaryStats {
    /// Count of black pixels.
    pub black_pixels: usize,
    /// Total pixels in the matrix.
    pub total_pixels: usize,
    /// Ratio of black pixels to total pixels.
    pub black_ratio: f64,
}

/// Compute min/max/avg over every pixel of `source`.
pub fn grayscale_stats(source: &dyn PixelSource) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for y in 0..source.height() {
        for &v in source.row(y) {
            min = min.min(v);
            max = max.max(v);
            sum += v as u64;
        }
        count += source.width() as u64;
    }
    let avg = if count == 0 { 0 } else { (sum / count) as u8 };
    GrayStats { min, max, avg }
}

/// Compute black pixel stats for a binary matrix.
pub fn binary_stats(binary: &BitMatrix) -> BinaryStats {
    let black = binary.count_ones();
    let total = binary.width() * binary.height();
    let ratio = if total == 0 {
        0.0
    } else {
        black as f64 / total as f64
    };
    BinaryStats {
        black_pixels: black,
        total_pixels: total,
        black_ratio: ratio,
    }
}

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("BARCODE_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Default bench limit from environment variables.
///
/// Returns `None` (full dataset) when `BARCODE_BENCH_LIMIT` is unset or `0`.
pub fn bench_limit_from_env() -> Option<usize> {
    match env::var("BARCODE_BENCH_LIMIT") {
        Ok(value) => value
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Smoke test flag from environment variables.
pub fn smoke_from_env() -> bool {
    matches!(
        env::var("BARCODE_SMOKE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}

/// Expected values listed in a sidecar text file, one per line.
///
/// Blank lines and `#` comments are skipped; surrounding whitespace is
/// trimmed. An unreadable file yields no values.
pub fn parse_expected_values<P: AsRef<Path>>(txt_path: P) -> Vec<String> {
    let Ok(content) = fs::read_to_string(txt_path) else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Sidecar label path of an image (`foo.png` -> `foo.txt`)
pub fn expected_values_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

/// Iterate dataset image paths with optional smoke list and limit.
pub fn dataset_iter<P: AsRef<Path>>(
    root: P,
    limit: Option<usize>,
    smoke: bool,
) -> impl Iterator<Item = PathBuf> {
    let root = root.as_ref();
    let mut images = if smoke {
        load_smoke_list(root).unwrap_or_else(|| collect_images(root))
    } else {
        collect_images(root)
    };

    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn load_smoke_list(root: &Path) -> Option<Vec<PathBuf>> {
    let contents = fs::read_to_string(root.join("_smoke.txt")).ok()?;
    let paths: Vec<PathBuf> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let candidate = Path::new(line);
            if candidate.is_absolute() {
                candidate.to_path_buf()
            } else {
                root.join(candidate)
            }
        })
        .filter(|path| path.exists())
        .collect();
    if paths.is_empty() { None } else { Some(paths) }
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff") {
                    images.push(path);
                }
            }
        }
    }
    images
}
