//! Utility functions for image processing
//!
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Integral images for O(1) window sums
//! - Fixed-point helpers for module-width matching

/// Shift-scaled integers for pattern matching
pub mod fixed_point;
/// RGB and RGBA to luminance
pub mod grayscale;
/// Summed-area tables
pub mod integral;
