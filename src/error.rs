//! Error type shared by every fallible operation in the crate.

/// Errors raised while configuring or running a scan.
///
/// Recognition failures (no pattern in a row, bad checksum, a row with too
/// little contrast) are not errors; they simply produce no detection.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The decode deadline passed. Raised at row, pass and cluster boundaries
    /// and unwinds every open pass.
    #[error("decode timed out after {elapsed_ms} ms")]
    Timeout {
        /// Milliseconds spent before the deadline was noticed.
        elapsed_ms: u128,
    },
    /// The pixel source has no pixels.
    #[error("image is {width}x{height}, expected a non-empty image")]
    EmptyImage {
        /// Reported width.
        width: usize,
        /// Reported height.
        height: usize,
    },
    /// A pixel buffer does not match the declared dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize {
        /// Bytes required by the dimensions.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ScanError>;
