//! `Number64` and the extended-precision double used to order mixed numbers.

use std::cmp::Ordering;
use std::fmt;

/// Number of explicit mantissa bits in an IEEE-754 double.
const MANTISSA_BITS: u32 = 52;
const EXPONENT_BIAS: i64 = 1023;
const MANTISSA_MASK: u64 = (1 << MANTISSA_BITS) - 1;
/// The low 62 bits: a normalized magnitude with the implicit one stripped.
const NORMALIZED_MASK: u64 = (1 << 62) - 1;

/// A JSON number holding either a 64-bit integer or a double, never both.
#[derive(Debug, Clone, Copy)]
pub enum Number64 {
    Integer(i64),
    Double(f64),
}

impl Number64 {
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Self::Double(_))
    }

    /// Converts to an integer. Doubles truncate toward zero and saturate;
    /// NaN becomes 0.
    pub fn to_long(&self) -> i64 {
        match *self {
            Self::Integer(i) => i,
            Self::Double(d) => d as i64,
        }
    }

    /// Converts to a double, rounding integers beyond 53 bits.
    pub fn to_double(&self) -> f64 {
        match *self {
            Self::Integer(i) => i as f64,
            Self::Double(d) => d,
        }
    }

    /// Projects the number onto the extended-precision double.
    pub fn to_double_ex(&self) -> DoubleEx {
        match *self {
            Self::Integer(i) => DoubleEx::from_long(i),
            Self::Double(d) => DoubleEx::from_double(d),
        }
    }

    /// Returns the integer this number holds exactly, if any.
    ///
    /// A double qualifies when it has no fractional part, lies inside the
    /// `i64` range and is not negative zero.
    pub fn as_exact_integer(&self) -> Option<i64> {
        match *self {
            Self::Integer(i) => Some(i),
            Self::Double(d) => {
                // 2^63 is exactly representable; everything below it that is
                // integral converts without loss.
                const LIMIT: f64 = 9_223_372_036_854_775_808.0;
                let integral = d.is_finite() && d.fract() == 0.0;
                if integral && d >= -LIMIT && d < LIMIT && !(d == 0.0 && d.is_sign_negative()) {
                    Some(d as i64)
                } else {
                    None
                }
            }
        }
    }
}

impl From<i64> for Number64 {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Number64 {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Number64 {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl PartialEq for Number64 {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(&b)),
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(&b),
            _ => self.to_double_ex().partial_cmp(&other.to_double_ex()),
        }
    }
}

impl fmt::Display for Number64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
        }
    }
}

/// A double plus the low-order bits of a 64-bit integer that its mantissa
/// could not hold.
///
/// `extra_bits` is zero exactly when `value` represents the source integer
/// without loss. Otherwise `value` is the source truncated toward zero to 53
/// significant bits and `extra_bits` carries the next 10 bits, left-aligned.
#[derive(Debug, Clone, Copy)]
pub struct DoubleEx {
    value: f64,
    extra_bits: u16,
}

impl DoubleEx {
    pub fn new(value: f64, extra_bits: u16) -> Self {
        Self { value, extra_bits }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            value,
            extra_bits: 0,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn extra_bits(&self) -> u16 {
        self.extra_bits
    }

    pub fn from_long(value: i64) -> Self {
        if value == i64::MIN {
            // -2^63 is a power of two, exact as a double.
            return Self::from_double(value as f64);
        }

        let magnitude = value.unsigned_abs();
        if magnitude == 0 {
            return Self::from_double(0.0);
        }
        let msb = 63 - magnitude.leading_zeros();
        let lsb = magnitude.trailing_zeros();
        if msb <= MANTISSA_BITS || msb - lsb <= MANTISSA_BITS {
            return Self::from_double(value as f64);
        }

        let exponent_bits = ((i64::from(msb) + EXPONENT_BIAS) as u64) << MANTISSA_BITS;
        let normalized = (magnitude << (62 - msb)) & NORMALIZED_MASK;
        let mantissa_bits = normalized >> 10;
        let extra_bits = ((normalized & 0x3FF) << 6) as u16;
        let sign_bit = if value < 0 { 1u64 << 63 } else { 0 };

        Self {
            value: f64::from_bits(sign_bit | exponent_bits | mantissa_bits),
            extra_bits,
        }
    }

    pub fn to_long(&self) -> i64 {
        if self.extra_bits == 0 {
            return self.value as i64;
        }

        let bits = self.value.to_bits();
        let exponent = ((bits >> MANTISSA_BITS) & 0x7FF) as i64 - EXPONENT_BIAS;
        if !(0..=62).contains(&exponent) {
            // Only values built by `from_long` carry extra bits; anything
            // else falls back to plain truncation.
            return self.value as i64;
        }
        let normalized = ((bits & MANTISSA_MASK) << 10) | u64::from(self.extra_bits >> 6);
        let magnitude = (normalized | (1 << 62)) >> (62 - exponent);
        if self.value.is_sign_negative() {
            -(magnitude as i64)
        } else {
            magnitude as i64
        }
    }
}

impl PartialEq for DoubleEx {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for DoubleEx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.value.partial_cmp(&other.value)? {
            Ordering::Equal => {
                let extra = self.extra_bits.cmp(&other.extra_bits);
                if self.value < 0.0 {
                    Some(extra.reverse())
                } else {
                    Some(extra)
                }
            }
            ord => Some(ord),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integers_have_no_extra_bits() {
        for v in [0i64, 1, -1, 42, 1 << 52, -(1 << 52), (1 << 53) - 1] {
            let ex = DoubleEx::from_long(v);
            assert_eq!(ex.extra_bits(), 0, "value {v}");
            assert_eq!(ex.value(), v as f64);
        }
    }

    #[test]
    fn wide_powers_of_two_have_no_extra_bits() {
        // Large but with a short span between MSB and LSB.
        let v = 0x7FF0_0000_0000_0000i64;
        assert_eq!(DoubleEx::from_long(v).extra_bits(), 0);
    }

    #[test]
    fn boundary_round_trips() {
        for v in [
            i64::MIN,
            i64::MIN + 1,
            i64::MAX,
            i64::MAX - 1,
            (1 << 53) + 1,
            -((1 << 53) + 1),
            0x1234_5678_9ABC_DEF1,
        ] {
            assert_eq!(DoubleEx::from_long(v).to_long(), v, "value {v}");
        }
    }

    #[test]
    fn lossy_integers_carry_extra_bits() {
        let ex = DoubleEx::from_long(i64::MAX);
        assert_ne!(ex.extra_bits(), 0);
        assert_eq!(ex.value(), 9_223_372_036_854_774_784.0);
    }

    #[test]
    fn extra_bits_break_ties() {
        let a = Number64::Integer((1 << 60) + 1);
        let b = Number64::Double((1u64 << 60) as f64);
        assert!(a > b);
        let c = Number64::Integer(-(1 << 60) - 1);
        let d = Number64::Double(-((1u64 << 60) as f64));
        assert!(c < d);
    }

    #[test]
    fn mixed_tags_compare_numerically() {
        assert_eq!(Number64::Integer(3), Number64::Double(3.0));
        assert!(Number64::Integer(3) < Number64::Double(3.5));
        assert!(Number64::Double(f64::NEG_INFINITY) < Number64::Integer(i64::MIN));
        assert!(Number64::Double(f64::NAN) != Number64::Double(f64::NAN));
        assert_eq!(Number64::Integer(1).partial_cmp(&Number64::Double(f64::NAN)), None);
    }

    #[test]
    fn double_to_long_truncates() {
        assert_eq!(Number64::Double(2.9).to_long(), 2);
        assert_eq!(Number64::Double(-2.9).to_long(), -2);
        assert_eq!(Number64::Double(f64::NAN).to_long(), 0);
    }

    #[test]
    fn exact_integer_detection() {
        assert_eq!(Number64::Double(42.0).as_exact_integer(), Some(42));
        assert_eq!(Number64::Double(-0.0).as_exact_integer(), None);
        assert_eq!(Number64::Double(0.5).as_exact_integer(), None);
        assert_eq!(Number64::Double(9.3e18).as_exact_integer(), None);
        assert_eq!(
            Number64::Double(-9_223_372_036_854_775_808.0).as_exact_integer(),
            Some(i64::MIN)
        );
    }
}
