//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic scalar math for the simulation. Gameplay code never touches
//! floats; they only appear when authoring constants (`to_fixed`) and when
//! formatting values for logs, the HUD or the save record (`to_float`).
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Levels span a few hundred world units, so the range is generous and a
//! physics step of 1/60 s still resolves sub-millimetre motion.

use std::fmt;
use std::ops::{Add, Sub, Mul, Div, Neg};

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

// =============================================================================
// WORLD CONSTANTS
// =============================================================================

/// One physics step: 1/60 second = round(65536/60) = 1092
pub const TICK_DT: Fixed = 1092;

/// World gravity magnitude: 9.8 units/s² (applied downward)
pub const GRAVITY: Fixed = to_fixed(9.8);

/// Tilt limit before the upright guard resets rotation: π/3 rad (60°)
pub const TILT_LIMIT: Fixed = to_fixed(std::f64::consts::FRAC_PI_3);

/// Vertical speed under which a body counts as grounded: 0.01 units/s
pub const GROUNDED_EPSILON: Fixed = to_fixed(0.01);

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in tick loop.
///
/// # Example
/// ```
/// use souq_cat::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Integer number of whole units to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Multiply two fixed-point numbers through an i64 intermediate.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Returns 0 on divide-by-zero instead of panicking.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root, exact to the last fractional bit (floor).
///
/// Returns 0 for non-positive inputs.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }
    // sqrt(x / 2^16) * 2^16 == sqrt(x * 2^16)
    isqrt_wide((x as u128) << FIXED_SCALE) as Fixed
}

/// Integer square root (floor) by Newton iteration from above.
pub(crate) fn isqrt_wide(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    fixed_max(min, fixed_min(max, value))
}

/// Sign as -1, 0 or +1 (plain integers).
#[inline]
pub fn fixed_signum(x: Fixed) -> i32 {
    x.signum()
}

/// Ratio `num / den` of two tick counts as a fixed-point fraction.
///
/// Saturates instead of overflowing for very long holds.
#[inline]
pub fn ticks_ratio(num: u32, den: u32) -> Fixed {
    if den == 0 {
        return 0;
    }
    let wide = ((num as i64) << FIXED_SCALE) / den as i64;
    wide.min(i32::MAX as i64) as Fixed
}

// =============================================================================
// FIXEDNUM WRAPPER
// =============================================================================

/// Ergonomic wrapper around fixed-point with operator overloading.
///
/// Used by config and HUD code; the tick loop works on raw `Fixed`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedNum(pub Fixed);

impl FixedNum {
    /// Zero constant
    pub const ZERO: Self = Self(0);

    /// One constant
    pub const ONE: Self = Self(FIXED_ONE);

    /// Create from raw fixed-point value
    #[inline]
    pub const fn from_raw(raw: Fixed) -> Self {
        Self(raw)
    }

    /// Get raw fixed-point value
    #[inline]
    pub const fn raw(self) -> Fixed {
        self.0
    }

    /// Convert to float for display
    #[inline]
    pub fn to_float(self) -> f32 {
        to_float(self.0)
    }
}

impl Add for FixedNum {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for FixedNum {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for FixedNum {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(fixed_mul(self.0, rhs.0))
    }
}

impl Div for FixedNum {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self(fixed_div(self.0, rhs.0))
    }
}

impl Neg for FixedNum {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Debug for FixedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({:.4})", self.to_float())
    }
}

impl fmt::Display for FixedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.to_float())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(from_int(3), 3 * FIXED_ONE);
        // 60 steps make (almost exactly) one second
        assert!((TICK_DT * 60 - FIXED_ONE).abs() < 60);
    }

    #[test]
    fn test_mul_div() {
        assert_eq!(fixed_mul(to_fixed(2.5), to_fixed(4.0)), to_fixed(10.0));
        assert_eq!(fixed_div(to_fixed(10.0), to_fixed(4.0)), to_fixed(2.5));
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_sqrt_exact_squares() {
        assert_eq!(fixed_sqrt(to_fixed(25.0)), to_fixed(5.0));
        assert_eq!(fixed_sqrt(to_fixed(400.0)), to_fixed(20.0));
        assert_eq!(fixed_sqrt(FIXED_ONE), FIXED_ONE);
        assert_eq!(fixed_sqrt(0), 0);
        assert_eq!(fixed_sqrt(-FIXED_ONE), 0);
    }

    #[test]
    fn test_sqrt_large_values_converge() {
        let r = fixed_sqrt(to_fixed(10000.0));
        assert_eq!(r, to_fixed(100.0));
        let max = fixed_sqrt(i32::MAX);
        assert!(max > to_fixed(181.0) && max < to_fixed(182.0));
    }

    #[test]
    fn test_ticks_ratio() {
        assert_eq!(ticks_ratio(60, 120), FIXED_HALF);
        assert_eq!(ticks_ratio(120, 120), FIXED_ONE);
        assert_eq!(ticks_ratio(5, 0), 0);
        assert_eq!(ticks_ratio(u32::MAX, 1), i32::MAX);
    }

    #[test]
    fn test_clamp_and_abs() {
        assert_eq!(fixed_clamp(to_fixed(5.0), 0, to_fixed(2.0)), to_fixed(2.0));
        assert_eq!(fixed_clamp(to_fixed(-5.0), 0, to_fixed(2.0)), 0);
        assert_eq!(fixed_abs(-FIXED_ONE), FIXED_ONE);
        assert_eq!(fixed_signum(-3), -1);
    }

    #[test]
    fn test_fixednum_ops() {
        let a = FixedNum::from_raw(to_fixed(1.5));
        let b = FixedNum::ONE;
        assert_eq!((a + b).raw(), to_fixed(2.5));
        assert_eq!((a * a).raw(), to_fixed(2.25));
        assert_eq!(format!("{}", a), "1.500");
    }
}
