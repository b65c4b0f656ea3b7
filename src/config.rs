//! Scan configuration.
//!
//! `ScanConfig` is plain data with serde derives so profile loaders can fill
//! it from JSON; `with_env_overrides` applies `BARCODE_*` variables on top.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::models::BarcodeFormat;

/// Binarization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// `black = pixel < threshold_level`
    Fixed,
    /// Per-line 32-bucket histogram valley
    Histogram,
    /// 8x8 block thresholds smoothed over 5x5 blocks and 6x6 superblocks
    Block,
    /// Block filter with integer math, no superblocks and a contrast split of 24
    LegacyBlock,
    /// Block filter followed by integral-image removal of thin strokes
    Grid,
    /// Block filter with a 4/8-neighbor median before or after thresholding
    Median,
    /// Block filter followed by corner filling for dot-peened marks
    Smoothed,
    /// Source is already binary (0 = black)
    Bypass,
}

impl FilterKind {
    /// Parse the names used by the CLI and environment variables
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fixed" | "threshold" => Some(FilterKind::Fixed),
            "histogram" | "global" => Some(FilterKind::Histogram),
            "block" | "hybrid" => Some(FilterKind::Block),
            "legacy" | "legacy_block" => Some(FilterKind::LegacyBlock),
            "grid" => Some(FilterKind::Grid),
            "median" => Some(FilterKind::Median),
            "smoothed" | "dpm" => Some(FilterKind::Smoothed),
            "bypass" | "binary" => Some(FilterKind::Bypass),
            _ => None,
        }
    }
}

/// Median neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedianNeighbors {
    /// Center plus the 4 edge neighbors
    Four,
    /// Center plus all 8 neighbors
    Eight,
}

/// Where the median is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedianStage {
    /// On grayscale, before block thresholding
    Prefilter,
    /// On the bitmap, after block thresholding
    Postfilter,
}

/// Settings of the median filter variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedianConfig {
    /// Neighborhood shape
    pub neighbors: MedianNeighbors,
    /// Pre- or post-filtering
    pub stage: MedianStage,
}

impl Default for MedianConfig {
    fn default() -> Self {
        Self {
            neighbors: MedianNeighbors::Four,
            stage: MedianStage::Prefilter,
        }
    }
}

/// MICR line recognition tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrConfig {
    /// Smallest accepted segment radius in pixels
    pub min_radius: f32,
    /// Largest accepted segment radius in pixels
    pub max_radius: f32,
    /// A line needs more matched symbols than this
    pub min_digits: usize,
    /// Placeholder for blank positions
    pub space_char: char,
    /// Placeholder for inked positions that match no glyph
    pub unknown_char: char,
    /// Largest line skew searched by the Hough transform, in degrees
    pub max_skew_degrees: f32,
    /// Votes a Hough cell needs to be read, inclusive
    pub min_line_segments: usize,
}

impl Default for MicrConfig {
    fn default() -> Self {
        Self {
            min_radius: 4.0,
            max_radius: 60.0,
            min_digits: 4,
            space_char: ' ',
            unknown_char: '?',
            max_skew_degrees: 10.0,
            min_line_segments: 3,
        }
    }
}

/// Everything a scan can be tuned with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Primary binarization strategy
    pub filter: FilterKind,
    /// Strategies tried in order while fewer than `min_count` symbols were found
    pub fallback_filters: Vec<FilterKind>,
    /// Level of the fixed-threshold filter
    pub threshold_level: u8,
    /// Block contrast above which the block mean becomes the threshold
    pub adjustment_level: u8,
    /// Window radius of the grid filter
    pub grid_radius: usize,
    /// Fraction of the grid window that must be black to keep a pixel
    pub grid_sensitivity: f32,
    /// Median filter settings (used by `FilterKind::Median`)
    pub median: MedianConfig,
    /// Corner-fill radius of the smoothed filter
    pub smooth_radius: usize,
    /// Vertical sub-sampling of the row scanner
    pub scan_step: usize,
    /// Stop after this many symbols
    pub max_count: usize,
    /// Try fallback filters until at least this many symbols were found
    pub min_count: usize,
    /// Ignore decoded values shorter than this
    pub min_value_length: usize,
    /// Decode deadline in milliseconds
    pub timeout_ms: Option<u64>,
    /// Also scan every row reversed
    pub mirrored: bool,
    /// Require blank margins around 1D symbols
    pub quiet_zone: bool,
    /// Rotations to scan, in degrees
    pub angles: Vec<f32>,
    /// Symbologies to look for
    pub formats: Vec<BarcodeFormat>,
    /// MICR tuning
    pub micr: MicrConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            filter: FilterKind::Block,
            fallback_filters: vec![FilterKind::Histogram],
            threshold_level: 128,
            adjustment_level: 24,
            grid_radius: 2,
            grid_sensitivity: 0.25,
            median: MedianConfig::default(),
            smooth_radius: 2,
            scan_step: 1,
            max_count: 32,
            min_count: 1,
            min_value_length: 3,
            timeout_ms: Some(5_000),
            mirrored: false,
            quiet_zone: true,
            angles: vec![0.0],
            formats: vec![BarcodeFormat::Ean13, BarcodeFormat::Micr],
            micr: MicrConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.scan_step == 0 {
            return Err(ScanError::InvalidConfig("scan_step must be >= 1".into()));
        }
        if self.max_count == 0 {
            return Err(ScanError::InvalidConfig("max_count must be >= 1".into()));
        }
        if self.min_count > self.max_count {
            return Err(ScanError::InvalidConfig(format!(
                "min_count {} exceeds max_count {}",
                self.min_count, self.max_count
            )));
        }
        if self.angles.is_empty() {
            return Err(ScanError::InvalidConfig("angles must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.grid_sensitivity) {
            return Err(ScanError::InvalidConfig(
                "grid_sensitivity must be within 0..=1".into(),
            ));
        }
        if self.micr.min_radius > self.micr.max_radius {
            return Err(ScanError::InvalidConfig(
                "micr.min_radius exceeds micr.max_radius".into(),
            ));
        }
        Ok(())
    }

    /// Apply `BARCODE_*` environment variables. Unparsable values keep the
    /// current setting.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse::<u64>("BARCODE_TIMEOUT_MS") {
            self.timeout_ms = if ms == 0 { None } else { Some(ms) };
        }
        self.scan_step = parse_env_usize("BARCODE_SCAN_STEP", self.scan_step).max(1);
        self.max_count = parse_env_usize("BARCODE_MAX_COUNT", self.max_count).max(1);
        self.mirrored = parse_env_bool("BARCODE_MIRRORED", self.mirrored);
        if let Ok(name) = std::env::var("BARCODE_FILTER") {
            match FilterKind::parse(&name) {
                Some(kind) => self.filter = kind,
                None => log::warn!("ignoring unknown BARCODE_FILTER value {name:?}"),
            }
        }
        self
    }

    /// True when `format` is enabled
    pub fn wants(&self, format: BarcodeFormat) -> bool {
        self.formats.contains(&format)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    env_parse::<usize>(name).unwrap_or(default)
}

fn parse_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = ScanConfig {
            scan_step: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ScanError::InvalidConfig(_))));

        let cfg = ScanConfig {
            min_count: 5,
            max_count: 2,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ScanConfig {
            angles: vec![],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_filter_names() {
        assert_eq!(FilterKind::parse("Block"), Some(FilterKind::Block));
        assert_eq!(FilterKind::parse(" legacy "), Some(FilterKind::LegacyBlock));
        assert_eq!(FilterKind::parse("nope"), None);
    }

    #[test]
    fn test_json_profile_round_trip() {
        let json = r#"{"filter":"grid","scan_step":2,"micr":{"min_digits":6}}"#;
        let cfg: ScanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.filter, FilterKind::Grid);
        assert_eq!(cfg.scan_step, 2);
        assert_eq!(cfg.micr.min_digits, 6);
        assert_eq!(cfg.micr.unknown_char, '?');
        assert_eq!(cfg.threshold_level, 128);
    }
}
