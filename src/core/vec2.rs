//! Fixed-Point 2D Vector
//!
//! Positions, velocities and impulses in world units. Distances are
//! accumulated in wide integers so that range checks between far-apart
//! entities saturate instead of wrapping back into range.

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, FIXED_SCALE,
    fixed_mul, fixed_div, fixed_abs, isqrt_wide, to_float,
};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Add another vector.
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_add(other.x),
            y: self.y.saturating_add(other.y),
        }
    }

    /// Subtract another vector.
    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_sub(other.x),
            y: self.y.saturating_sub(other.y),
        }
    }

    /// Scale by a fixed-point scalar.
    #[inline]
    pub fn scale(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_mul(self.x, scalar),
            y: fixed_mul(self.y, scalar),
        }
    }

    /// Divide by a fixed-point scalar.
    #[inline]
    pub fn div_scalar(self, scalar: Fixed) -> Self {
        Self {
            x: fixed_div(self.x, scalar),
            y: fixed_div(self.y, scalar),
        }
    }

    /// Raw squared magnitude in Q32.32, never overflowing.
    #[inline]
    fn wide_length_squared(self) -> u128 {
        let x = self.x as i128;
        let y = self.y as i128;
        (x * x + y * y) as u128
    }

    /// Squared length, saturating at `Fixed::MAX`.
    #[inline]
    pub fn length_squared(self) -> Fixed {
        let q = self.wide_length_squared() >> FIXED_SCALE;
        q.min(i32::MAX as u128) as Fixed
    }

    /// Length (magnitude), saturating at `Fixed::MAX`.
    #[inline]
    pub fn length(self) -> Fixed {
        isqrt_wide(self.wide_length_squared()).min(i32::MAX as u128) as Fixed
    }

    /// Squared distance to another point. Saturates for far-apart points.
    #[inline]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x as i128 - other.x as i128;
        let dy = self.y as i128 - other.y as i128;
        let q = ((dx * dx + dy * dy) as u128) >> FIXED_SCALE;
        q.min(i32::MAX as u128) as Fixed
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> Fixed {
        let dx = self.x as i128 - other.x as i128;
        let dy = self.y as i128 - other.y as i128;
        isqrt_wide((dx * dx + dy * dy) as u128).min(i32::MAX as u128) as Fixed
    }

    /// True when `other` lies within `range` (inclusive).
    #[inline]
    pub fn within(self, other: Self, range: Fixed) -> bool {
        self.distance(other) <= range
    }

    /// Absolute horizontal separation.
    #[inline]
    pub fn dx_abs(self, other: Self) -> Fixed {
        fixed_abs(self.x.saturating_sub(other.x))
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0 {
            return Self::ZERO;
        }
        self.div_scalar(len)
    }

    /// Negate both components.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            x: self.x.saturating_neg(),
            y: self.y.saturating_neg(),
        }
    }

    /// Mirror horizontally when `facing_right` is false.
    #[inline]
    pub fn facing(self, facing_right: bool) -> Self {
        if facing_right {
            self
        } else {
            Self::new(self.x.saturating_neg(), self.y)
        }
    }

    /// Convert to float tuple for display.
    #[inline]
    pub fn to_floats(self) -> (f32, f32) {
        (to_float(self.x), to_float(self.y))
    }
}

impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        FixedVec2::add(self, rhs)
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        FixedVec2::sub(self, rhs)
    }
}

impl Neg for FixedVec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        self.negate()
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, FIXED_ONE};

    #[test]
    fn test_vec2_add_sub() {
        let a = FixedVec2::new(to_fixed(3.0), to_fixed(4.0));
        let b = FixedVec2::new(to_fixed(1.0), to_fixed(2.0));
        assert_eq!(a + b, FixedVec2::from_ints(4, 6));
        assert_eq!(a - b, FixedVec2::from_ints(2, 2));
        assert_eq!(-a, FixedVec2::from_ints(-3, -4));
    }

    #[test]
    fn test_vec2_length_exact() {
        let v = FixedVec2::from_ints(3, 4);
        assert_eq!(v.length_squared(), to_fixed(25.0));
        assert_eq!(v.length(), to_fixed(5.0));
    }

    #[test]
    fn test_distance_saturates_instead_of_wrapping() {
        let a = FixedVec2::from_ints(-300, 0);
        let b = FixedVec2::from_ints(300, 0);
        assert_eq!(a.distance_squared(b), i32::MAX);
        assert_eq!(a.distance(b), to_fixed(600.0));
        assert!(!a.within(b, to_fixed(20.0)));
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = FixedVec2::from_ints(3, 4).normalize();
        assert!((norm.length() - FIXED_ONE).abs() < 4);
        assert_eq!(FixedVec2::ZERO.normalize(), FixedVec2::ZERO);
    }

    #[test]
    fn test_facing_mirror() {
        let offset = FixedVec2::new(to_fixed(1.5), to_fixed(3.0));
        assert_eq!(offset.facing(true), offset);
        assert_eq!(offset.facing(false).x, to_fixed(-1.5));
        assert_eq!(offset.facing(false).y, to_fixed(3.0));
    }

    #[test]
    fn test_dx_abs() {
        let a = FixedVec2::from_ints(-2, 7);
        let b = FixedVec2::from_ints(5, -1);
        assert_eq!(a.dx_abs(b), to_fixed(7.0));
    }
}
