/// Integer fixed-point helpers for the module-width hot path.
///
/// Values carry 8 fractional bits (24.8). A ratio of 1.0 is `ONE` (256).

/// Number of fractional bits
pub const SHIFT: u32 = 8;
/// 1.0 in fixed point
pub const ONE: u32 = 1 << SHIFT;

/// Fixed-point value with 8 fractional bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(u32);

impl Fixed {
    /// Largest representable value, used as a "no match" marker
    pub const MAX: Fixed = Fixed(u32::MAX);

    /// Create from integer
    pub const fn from_u32(n: u32) -> Self {
        Fixed(n << SHIFT)
    }

    /// Create from a ratio such as 0.48
    pub const fn from_ratio(num: u32, den: u32) -> Self {
        Fixed((num << SHIFT) / den)
    }

    /// Wrap raw fixed-point bits
    pub const fn from_raw(raw: u32) -> Self {
        Fixed(raw)
    }

    /// Raw fixed-point bits
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Convert to float
    pub fn to_f32(&self) -> f32 {
        self.0 as f32 / ONE as f32
    }

    /// Multiply two fixed-point values
    pub fn mul(&self, other: Fixed) -> Fixed {
        Fixed(((self.0 as u64 * other.0 as u64) >> SHIFT) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_basic() {
        let three = Fixed::from_u32(3);
        assert_eq!(three.raw(), 768);
        let half = Fixed::from_ratio(1, 2);
        assert_eq!(three.mul(half).to_f32(), 1.5);
        assert!(Fixed::from_ratio(48, 100) < Fixed::from_ratio(70, 100));
    }
}
