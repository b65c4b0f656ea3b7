use std::time::{Duration, Instant};

use crate::error::{Result, ScanError};

/// Cooperative decode deadline, polled at row, pass and cluster boundaries
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Deadline `timeout_ms` from now; `None` never expires
    pub fn new(timeout_ms: Option<u64>) -> Self {
        Self {
            start: Instant::now(),
            limit: timeout_ms.map(Duration::from_millis),
        }
    }

    /// Deadline that never expires
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Deadline that has already passed
    pub fn expired() -> Self {
        Self {
            start: Instant::now(),
            limit: Some(Duration::ZERO),
        }
    }

    /// Time since the deadline was created
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// True once the limit is reached
    pub fn is_expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() >= limit)
    }

    /// `Err(ScanError::Timeout)` once the limit is reached
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(ScanError::Timeout {
                elapsed_ms: self.start.elapsed().as_millis(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_never_expires() {
        assert!(Deadline::unlimited().check().is_ok());
        assert!(Deadline::new(Some(60_000)).check().is_ok());
    }

    #[test]
    fn test_expired_reports_timeout() {
        let d = Deadline::expired();
        assert!(d.is_expired());
        assert!(matches!(d.check(), Err(ScanError::Timeout { .. })));
    }
}
