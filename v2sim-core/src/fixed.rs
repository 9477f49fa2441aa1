//! Fixed-point arithmetic for deterministic simulation.
//!
//! All economy values use this type so that results are identical across
//! platforms and thread counts. Floats (f32/f64) are banned in sim logic due to
//! x87/SSE/FMA differences; they only appear at the scenario parse layer.
//!
//! Addition is exactly associative and commutative, which is what lets the
//! parallel reporters accumulate into shared totals in any order.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::sync::atomic::{AtomicI64, Ordering};

/// Fixed-point value with scale 10000.
///
/// Represents decimal values as integers: 0.25 → 2500, 1.0 → 10000.
/// All arithmetic stays in integer domain for determinism.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Fixed(pub i64);

impl Fixed {
    /// Scale factor: 10000 = 1.0
    pub const SCALE: i64 = 10000;

    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(10000);
    pub const HALF: Fixed = Fixed(5000);
    pub const POINT_ZERO_ONE: Fixed = Fixed(100);

    /// Smallest representable positive value.
    pub const EPSILON: Fixed = Fixed(1);

    /// Largest value the economy treats as meaningful (2^31).
    ///
    /// Prices are capped here and stockpile weights are expressed as
    /// `USABLE_MAX / cost`, so products with ordinary quantities stay within i64.
    pub const USABLE_MAX: Fixed = Fixed((1i64 << 31) * Self::SCALE);

    /// Create from raw scaled value
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Fixed(raw)
    }

    /// Create from integer (e.g., 5 → 50_000)
    #[inline]
    pub const fn from_int(v: i64) -> Self {
        Fixed(v * Self::SCALE)
    }

    /// Convert from f64 (parse layer only, not in sim logic).
    ///
    /// Uses `.round()` for cross-platform determinism. Guards against NaN/Inf/overflow.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        if !v.is_finite() {
            return Fixed::ZERO;
        }

        let scaled = v * Self::SCALE as f64;
        if scaled > i64::MAX as f64 {
            return Fixed(i64::MAX);
        }
        if scaled < i64::MIN as f64 {
            return Fixed(i64::MIN);
        }

        Fixed(scaled.round() as i64)
    }

    /// Convert to f64 (display only)
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Raw integer value
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Returns the smaller of two Fixed values (deterministic)
    #[inline]
    pub fn min(self, other: Fixed) -> Fixed {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Returns the larger of two Fixed values (deterministic)
    #[inline]
    pub fn max(self, other: Fixed) -> Fixed {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn abs(self) -> Fixed {
        Fixed(self.0.abs())
    }

    /// `self × numerator / denominator` with a single rounding step.
    ///
    /// The intermediate product is held in i128. Returns ZERO when the
    /// denominator is zero, matching [`Div`].
    #[inline]
    pub fn mul_div(self, numerator: Fixed, denominator: Fixed) -> Fixed {
        if denominator.0 == 0 {
            return Fixed::ZERO;
        }
        Fixed((self.0 as i128 * numerator.0 as i128 / denominator.0 as i128) as i64)
    }

    /// Multiply by a plain integer (pop sizes, counts).
    #[inline]
    pub fn mul_int(self, v: i64) -> Fixed {
        Fixed(self.0 * v)
    }

    /// Divide by a plain integer, truncating toward zero.
    #[inline]
    pub fn div_int(self, v: i64) -> Fixed {
        if v == 0 {
            return Fixed::ZERO;
        }
        Fixed(self.0 / v)
    }

    /// Arithmetic right shift on the raw representation.
    #[inline]
    pub const fn shr(self, bits: u32) -> Fixed {
        Fixed(self.0 >> bits)
    }

    /// Left shift on the raw representation.
    #[inline]
    pub const fn shl(self, bits: u32) -> Fixed {
        Fixed(self.0 << bits)
    }

    /// Substitutes ONE for an exact zero.
    ///
    /// Used for modifier-driven maxima where "absent" means the default bound.
    #[inline]
    pub fn nonzero_or_one(self) -> Fixed {
        if self.0 == 0 {
            Fixed::ONE
        } else {
            self
        }
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, other: Fixed) -> Fixed {
        Fixed(self.0 + other.0)
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Fixed) {
        self.0 += other.0;
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, other: Fixed) -> Fixed {
        Fixed(self.0 - other.0)
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Fixed) {
        self.0 -= other.0;
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, other: Fixed) -> Fixed {
        Fixed((self.0 as i128 * other.0 as i128 / Fixed::SCALE as i128) as i64)
    }
}

impl MulAssign for Fixed {
    #[inline]
    fn mul_assign(&mut self, other: Fixed) {
        *self = *self * other;
    }
}

impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, other: Fixed) -> Fixed {
        if other.0 == 0 {
            return Fixed::ZERO; // Safe default for division by zero
        }
        Fixed((self.0 as i128 * Fixed::SCALE as i128 / other.0 as i128) as i64)
    }
}

impl DivAssign for Fixed {
    #[inline]
    fn div_assign(&mut self, other: Fixed) {
        *self = *self / other;
    }
}

impl std::iter::Sum for Fixed {
    fn sum<I: Iterator<Item = Fixed>>(iter: I) -> Fixed {
        iter.fold(Fixed::ZERO, |acc, v| acc + v)
    }
}

impl std::fmt::Debug for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed({} = {})", self.0, self.to_f64())
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

/// Lock-free [`Fixed`] cell for hot scalar counters written from worker threads.
///
/// Only accumulation is exposed during parallel phases; ordering between
/// threads is irrelevant because the sum is associative.
#[derive(Default)]
pub struct AtomicFixed(AtomicI64);

impl AtomicFixed {
    pub const fn new(value: Fixed) -> Self {
        Self(AtomicI64::new(value.0))
    }

    #[inline]
    pub fn load(&self) -> Fixed {
        Fixed(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: Fixed) {
        self.0.store(value.0, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(&self, value: Fixed) {
        self.0.fetch_add(value.0, Ordering::Relaxed);
    }

    #[inline]
    pub fn sub(&self, value: Fixed) {
        self.0.fetch_sub(value.0, Ordering::Relaxed);
    }

    /// Returns the current value and resets it to zero.
    #[inline]
    pub fn take(&self) -> Fixed {
        Fixed(self.0.swap(0, Ordering::Relaxed))
    }
}

impl std::fmt::Debug for AtomicFixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtomicFixed({:?})", self.load())
    }
}

impl Clone for AtomicFixed {
    fn clone(&self) -> Self {
        Self::new(self.load())
    }
}

/// Serde adapter that reads and writes [`Fixed`] as a decimal number.
///
/// Used by configuration and scenario files; in-memory state keeps the raw form.
pub mod decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.to_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        f64::deserialize(deserializer).map(Fixed::from_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(Fixed::ZERO.0, 0);
        assert_eq!(Fixed::ONE.0, 10000);
        assert_eq!(Fixed::HALF.0, 5000);
        assert_eq!(Fixed::EPSILON.0, 1);
        assert_eq!(Fixed::USABLE_MAX.raw(), (1 << 31) * Fixed::SCALE);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Fixed::from_f64(0.25), Fixed(2500));
        assert_eq!(Fixed::from_f64(1.0), Fixed::ONE);
        assert_eq!(Fixed::from_f64(f64::NAN), Fixed::ZERO);
        assert_eq!(Fixed::from_f64(f64::INFINITY), Fixed::ZERO);
        assert_eq!(Fixed::from_f64(1e30), Fixed(i64::MAX));
    }

    #[test]
    fn test_multiply_and_divide() {
        assert_eq!(Fixed::from_int(2) * Fixed::from_int(3), Fixed::from_int(6));
        assert_eq!(Fixed::HALF * Fixed::HALF, Fixed(2500));
        assert_eq!(Fixed::from_int(6) / Fixed::from_int(2), Fixed::from_int(3));
        assert_eq!(Fixed::from_int(6) / Fixed::ZERO, Fixed::ZERO);
    }

    #[test]
    fn test_mul_div_single_rounding() {
        // 1/3 of 10, then × 3, loses precision; mul_div does not.
        let ten = Fixed::from_int(10);
        let three = Fixed::from_int(3);
        assert_eq!(ten.mul_div(three, three), ten);
        assert_eq!(ten.mul_div(Fixed::ONE, Fixed::ZERO), Fixed::ZERO);
        assert_eq!(Fixed::from_int(60).mul_div(Fixed::from_int(1), Fixed::from_int(4)), Fixed::from_int(15));
    }

    #[test]
    fn test_nonzero_or_one() {
        assert_eq!(Fixed::ZERO.nonzero_or_one(), Fixed::ONE);
        assert_eq!(Fixed::HALF.nonzero_or_one(), Fixed::HALF);
        assert_eq!((-Fixed::HALF).nonzero_or_one(), -Fixed::HALF);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(Fixed::from_int(128).shr(7), Fixed::ONE);
        assert_eq!(Fixed::EPSILON.shl(7), Fixed(128));
    }

    #[test]
    fn test_atomic_fixed_accumulates() {
        let cell = AtomicFixed::new(Fixed::from_int(5));
        cell.add(Fixed::HALF);
        cell.sub(Fixed::ONE);
        assert_eq!(cell.load(), Fixed::from_int(5) + Fixed::HALF - Fixed::ONE);
        assert_eq!(cell.take(), Fixed(45000));
        assert_eq!(cell.load(), Fixed::ZERO);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn game_value() -> impl Strategy<Value = i64> {
            -1_000_000..=1_000_000i64
        }

        proptest! {
            #[test]
            fn mul_is_commutative(a in game_value(), b in game_value()) {
                let x = Fixed::from_int(a);
                let y = Fixed::from_int(b);
                prop_assert_eq!(x * y, y * x);
            }

            #[test]
            fn mul_one_is_identity(a in game_value()) {
                let x = Fixed::from_int(a);
                prop_assert_eq!(x * Fixed::ONE, x);
            }

            #[test]
            fn div_zero_is_safe(a in game_value()) {
                prop_assert_eq!(Fixed::from_int(a) / Fixed::ZERO, Fixed::ZERO);
            }

            /// Accumulation order never changes the total.
            #[test]
            fn sum_is_order_independent(values in proptest::collection::vec(-1_000_000_000..1_000_000_000i64, 0..64)) {
                let forward: Fixed = values.iter().map(|&v| Fixed(v)).sum();
                let backward: Fixed = values.iter().rev().map(|&v| Fixed(v)).sum();
                prop_assert_eq!(forward, backward);
            }

            /// A proportional share never exceeds the whole.
            #[test]
            fn mul_div_share_bounded(total in 0..1_000_000_000i64, part in 0..1_000_000i64, extra in 0..1_000_000i64) {
                let whole = Fixed(part + extra);
                let share = Fixed(total).mul_div(Fixed(part), whole);
                prop_assert!(share <= Fixed(total));
            }
        }
    }
}
