//! Deterministic fixed-point scalar.
//!
//! A [`Fixed`] is a signed 64-bit raw integer plus an implicit number of
//! fractional bits (the *scale*, default [`DEFAULT_SCALE`]). The value
//! represented is `raw / 2^scale`.
//!
//! Every operation here is pure integer arithmetic, so the same inputs give
//! bit-identical outputs on every machine. That includes the trigonometric
//! functions, which use fixed-point polynomials instead of the host's
//! floating-point library.
//!
//! # Scale handling
//!
//! A binary operation between two values re-expresses the right operand at
//! the left operand's scale before combining them. The result always keeps
//! the left operand's scale.
//!
//! # Edge cases
//!
//! - Multiplication and division use a 128-bit accumulator and saturate to
//!   the `i64` range instead of wrapping.
//! - Division by zero yields zero.
//! - The square root of a non-positive value is zero.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::MathError;

/// Number of fractional bits used by every constructor that does not take an
/// explicit scale.
pub const DEFAULT_SCALE: u32 = 16;

/// Largest supported scale. `1 << MAX_SCALE` must still fit in an `i64`.
pub const MAX_SCALE: u32 = 62;

/// Newton-Raphson iteration cap for [`Fixed::sqrt`].
pub const SQRT_ITERATIONS: u32 = 10;

// ---------------------------------------------------------------------------
// Q30 internals for trigonometry
// ---------------------------------------------------------------------------

const Q30: u32 = 30;
const Q30_ONE: i64 = 1 << Q30;
const PI_Q30: i64 = 3_373_259_426;
const HALF_PI_Q30: i64 = 1_686_629_713;
const TAU_Q30: i64 = 6_746_518_852;
const DEG_TO_RAD_Q30: i64 = 18_740_330;
const RAD_TO_DEG_Q30: i64 = 61_520_874_802;

/// Chebyshev-derived coefficients for `atan(z)` on `|z| <= 1`, in Q30.
const ATAN_COEFFS_Q30: [i64; 7] = [
    -357_911_807,
    214_641_949,
    -152_478_688,
    114_189_736,
    -80_412_880,
    46_140_957,
    -17_228_193,
];

#[inline]
fn saturate(v: i128) -> i64 {
    v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[inline]
fn q30_mul(a: i64, b: i64) -> i64 {
    saturate((a as i128 * b as i128) >> Q30)
}

#[inline]
fn q30_div(a: i64, b: i64) -> i64 {
    if b == 0 {
        return 0;
    }
    saturate(((a as i128) << Q30) / b as i128)
}

/// Integer square root (floor) of a non-negative 128-bit value.
fn isqrt_u128(n: u128) -> u128 {
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

fn sqrt_q30(v: i64) -> i64 {
    if v <= 0 {
        return 0;
    }
    isqrt_u128((v as u128) << Q30) as i64
}

/// `sin(x)` for `x` in Q30 radians.
fn sin_q30(x: i64) -> i64 {
    // Reduce to (-pi, pi], then fold into [-pi/2, pi/2].
    let mut x = x.rem_euclid(TAU_Q30);
    if x > PI_Q30 {
        x -= TAU_Q30;
    }
    if x > HALF_PI_Q30 {
        x = PI_Q30 - x;
    } else if x < -HALF_PI_Q30 {
        x = -PI_Q30 - x;
    }

    // Taylor series to x^11 in Horner form; error < 1e-7 on the folded range.
    let x2 = q30_mul(x, x);
    let mut t = Q30_ONE - q30_mul(x2, Q30_ONE) / 110;
    t = Q30_ONE - q30_mul(x2, t) / 72;
    t = Q30_ONE - q30_mul(x2, t) / 42;
    t = Q30_ONE - q30_mul(x2, t) / 20;
    t = Q30_ONE - q30_mul(x2, t) / 6;
    q30_mul(x, t)
}

/// `atan(z)` for `z` in Q30, any magnitude.
fn atan_q30(z: i64) -> i64 {
    let negative = z < 0;
    let a = z.saturating_abs();
    let (reduced, invert) = if a > Q30_ONE {
        (q30_div(Q30_ONE, a), true)
    } else {
        (a, false)
    };

    let z2 = q30_mul(reduced, reduced);
    let mut poly = ATAN_COEFFS_Q30[6];
    for &c in ATAN_COEFFS_Q30[..6].iter().rev() {
        poly = c + q30_mul(z2, poly);
    }
    let mut angle = q30_mul(reduced, Q30_ONE + q30_mul(z2, poly));
    if invert {
        angle = HALF_PI_Q30 - angle;
    }
    if negative {
        -angle
    } else {
        angle
    }
}

fn atan2_q30(y: i64, x: i64) -> i64 {
    if x == 0 && y == 0 {
        return 0;
    }
    if x == 0 {
        return if y > 0 { HALF_PI_Q30 } else { -HALF_PI_Q30 };
    }
    if y == 0 {
        return if x > 0 { 0 } else { PI_Q30 };
    }
    let base = atan_q30(q30_div(y, x));
    if x > 0 {
        base
    } else if y >= 0 {
        base + PI_Q30
    } else {
        base - PI_Q30
    }
}

// ---------------------------------------------------------------------------
// Fixed
// ---------------------------------------------------------------------------

/// A deterministic fixed-point number.
///
/// Equality, ordering and hashing look at the raw integer only, so values
/// are expected to share a scale when compared.
///
/// Serialized layout (in field order): `scale: u32` then `raw: i64`.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "FixedRepr")]
pub struct Fixed {
    scale: u32,
    raw: i64,
}

/// Wire form of [`Fixed`], validated on the way in.
#[derive(Deserialize)]
struct FixedRepr {
    scale: u32,
    raw: i64,
}

impl TryFrom<FixedRepr> for Fixed {
    type Error = MathError;

    fn try_from(repr: FixedRepr) -> Result<Self, Self::Error> {
        if repr.scale > MAX_SCALE {
            return Err(MathError::ScaleOutOfRange {
                scale: repr.scale,
                max: MAX_SCALE,
            });
        }
        Ok(Self {
            scale: repr.scale,
            raw: repr.raw,
        })
    }
}

impl Fixed {
    pub const ZERO: Fixed = Fixed::from_raw(0);
    pub const ONE: Fixed = Fixed::from_raw(1 << DEFAULT_SCALE);
    pub const NEG_ONE: Fixed = Fixed::from_raw(-(1 << DEFAULT_SCALE));
    pub const TWO: Fixed = Fixed::from_raw(2 << DEFAULT_SCALE);
    pub const HALF: Fixed = Fixed::from_raw(1 << (DEFAULT_SCALE - 1));
    /// Smallest positive value at the default scale.
    pub const EPSILON: Fixed = Fixed::from_raw(1);
    pub const MAX: Fixed = Fixed::from_raw(i64::MAX);
    pub const MIN: Fixed = Fixed::from_raw(i64::MIN);
    pub const PI: Fixed = Fixed::from_raw(205_887);
    pub const HALF_PI: Fixed = Fixed::from_raw(102_944);
    pub const TAU: Fixed = Fixed::from_raw(411_775);

    // -- construction -------------------------------------------------------

    /// Build from a raw integer at the default scale.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self {
            scale: DEFAULT_SCALE,
            raw,
        }
    }

    /// Build from a raw integer at an explicit scale.
    ///
    /// # Panics
    ///
    /// Panics if `scale` exceeds [`MAX_SCALE`].
    #[inline]
    pub const fn from_raw_scaled(raw: i64, scale: u32) -> Self {
        assert!(scale <= MAX_SCALE, "fixed-point scale out of range");
        Self { scale, raw }
    }

    /// Build from a whole number at the default scale (saturating).
    #[inline]
    pub const fn from_int(v: i64) -> Self {
        Self::from_raw(v.saturating_mul(1 << DEFAULT_SCALE))
    }

    /// `num / den` at the default scale. A zero denominator yields zero.
    pub fn from_ratio(num: i64, den: i64) -> Self {
        if den == 0 {
            return Self::ZERO;
        }
        Self::from_raw(saturate(((num as i128) << DEFAULT_SCALE) / den as i128))
    }

    /// Convert from a float, rounding to the nearest representable value.
    ///
    /// Only for setup data and tests. Simulation code must not feed host
    /// floating-point results back into the state.
    pub fn from_f64(v: f64) -> Self {
        Self::from_raw((v * (1u64 << DEFAULT_SCALE) as f64).round() as i64)
    }

    // -- accessors ----------------------------------------------------------

    #[inline]
    pub const fn raw(self) -> i64 {
        self.raw
    }

    #[inline]
    pub const fn scale(self) -> u32 {
        self.scale
    }

    /// Lossy conversion for presentation.
    pub fn to_f64(self) -> f64 {
        self.raw as f64 / (1u64 << self.scale) as f64
    }

    /// Integer part, truncated toward zero.
    pub fn to_int(self) -> i64 {
        self.raw / (1i64 << self.scale)
    }

    /// The same number re-expressed with `scale` fractional bits.
    ///
    /// Increasing the scale is exact (saturating on overflow); decreasing it
    /// rounds toward negative infinity.
    pub fn with_scale(self, scale: u32) -> Self {
        assert!(scale <= MAX_SCALE, "fixed-point scale out of range");
        let raw = match scale.cmp(&self.scale) {
            Ordering::Equal => self.raw,
            Ordering::Greater => saturate((self.raw as i128) << (scale - self.scale)),
            Ordering::Less => self.raw >> (self.scale - scale),
        };
        Self { scale, raw }
    }

    /// Like [`with_scale`](Self::with_scale), but reports an out-of-range
    /// scale instead of panicking.
    pub fn try_with_scale(self, scale: u32) -> Result<Self, MathError> {
        if scale > MAX_SCALE {
            return Err(MathError::ScaleOutOfRange {
                scale,
                max: MAX_SCALE,
            });
        }
        Ok(self.with_scale(scale))
    }

    #[inline]
    fn aligned(self, other: Self) -> i64 {
        if other.scale == self.scale {
            other.raw
        } else {
            other.with_scale(self.scale).raw
        }
    }

    #[inline]
    fn one_raw(self) -> i64 {
        1i64 << self.scale
    }

    #[inline]
    fn same_scale(self, raw: i64) -> Self {
        Self {
            scale: self.scale,
            raw,
        }
    }

    // -- basic math ---------------------------------------------------------

    pub fn is_zero(self) -> bool {
        self.raw == 0
    }

    pub fn is_negative(self) -> bool {
        self.raw < 0
    }

    pub fn abs(self) -> Self {
        self.same_scale(self.raw.saturating_abs())
    }

    /// `-1`, `0` or `1` at this value's scale.
    pub fn signum(self) -> Self {
        self.same_scale(self.raw.signum() * self.one_raw())
    }

    pub fn min(self, other: Self) -> Self {
        if self.aligned(other) < self.raw {
            self.same_scale(self.aligned(other))
        } else {
            self
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self.aligned(other) > self.raw {
            self.same_scale(self.aligned(other))
        } else {
            self
        }
    }

    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }

    pub fn clamp01(self) -> Self {
        self.same_scale(self.raw.clamp(0, self.one_raw()))
    }

    pub fn floor(self) -> Self {
        self.same_scale((self.raw >> self.scale) << self.scale)
    }

    pub fn ceil(self) -> Self {
        -(-self).floor()
    }

    /// Round half up.
    pub fn round(self) -> Self {
        if self.scale == 0 {
            return self;
        }
        self.same_scale(self.raw.saturating_add(self.one_raw() >> 1))
            .floor()
    }

    /// Fractional part, always in `[0, 1)`.
    pub fn fract(self) -> Self {
        self - self.floor()
    }

    /// Linear interpolation with `t` clamped to `[0, 1]`.
    pub fn lerp(self, to: Self, t: Self) -> Self {
        self + (to - self) * t.clamp01()
    }

    /// Multiply by a whole number without going through a fixed conversion.
    pub fn mul_int(self, n: i64) -> Self {
        self.same_scale(saturate(self.raw as i128 * n as i128))
    }

    /// Square root by Newton-Raphson.
    ///
    /// Starts from `self / 2` and runs at most [`SQRT_ITERATIONS`] rounds,
    /// stopping early once successive estimates differ by at most one raw
    /// unit. Non-positive inputs return zero.
    ///
    /// Each early round only halves the estimate, so the cap bounds the
    /// range where the result has converged: at the default scale it is
    /// within 0.01 of the true root for inputs up to about 130,000. Larger
    /// inputs return an overestimate (`sqrt(1_000_000)` is about 1033.84),
    /// and vector lengths inherit the same limit.
    pub fn sqrt(self) -> Self {
        if self.raw <= 0 {
            return self.same_scale(0);
        }
        let mut estimate = self.same_scale((self.raw / 2).max(1));
        for _ in 0..SQRT_ITERATIONS {
            let quotient = self / estimate;
            let next = self.same_scale(estimate.raw.saturating_add(quotient.raw) / 2);
            let converged = (next.raw - estimate.raw).abs() <= 1;
            estimate = next;
            if converged {
                break;
            }
        }
        estimate
    }

    // -- trigonometry (radians) -----------------------------------------------

    fn to_q30(self) -> i64 {
        self.with_scale(Q30).raw
    }

    fn rescale_from_q30(self, raw: i64) -> Self {
        Self::from_raw_scaled(raw, Q30).with_scale(self.scale)
    }

    pub fn sin(self) -> Self {
        self.rescale_from_q30(sin_q30(self.to_q30()))
    }

    pub fn cos(self) -> Self {
        self.rescale_from_q30(sin_q30(self.to_q30().saturating_add(HALF_PI_Q30)))
    }

    /// Tangent. Zero where the cosine vanishes.
    pub fn tan(self) -> Self {
        let x = self.to_q30();
        self.rescale_from_q30(q30_div(sin_q30(x), sin_q30(x.saturating_add(HALF_PI_Q30))))
    }

    pub fn atan(self) -> Self {
        self.rescale_from_q30(atan_q30(self.to_q30()))
    }

    /// Four-quadrant arctangent of `self / x`, in `[-pi, pi]`.
    pub fn atan2(self, x: Self) -> Self {
        self.rescale_from_q30(atan2_q30(self.to_q30(), x.with_scale(Q30).raw))
    }

    /// Arcsine with the input clamped to `[-1, 1]`.
    pub fn asin(self) -> Self {
        let v = self.to_q30().clamp(-Q30_ONE, Q30_ONE);
        let c = sqrt_q30(Q30_ONE - q30_mul(v, v));
        self.rescale_from_q30(atan2_q30(v, c))
    }

    /// Arccosine with the input clamped to `[-1, 1]`.
    pub fn acos(self) -> Self {
        let v = self.to_q30().clamp(-Q30_ONE, Q30_ONE);
        let s = sqrt_q30(Q30_ONE - q30_mul(v, v));
        self.rescale_from_q30(atan2_q30(s, v))
    }

    pub fn to_radians(self) -> Self {
        self.rescale_from_q30(q30_mul(self.to_q30(), DEG_TO_RAD_Q30))
    }

    pub fn to_degrees(self) -> Self {
        self.rescale_from_q30(q30_mul(self.to_q30(), RAD_TO_DEG_Q30))
    }
}

impl Default for Fixed {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i32> for Fixed {
    fn from(v: i32) -> Self {
        Self::from_int(v as i64)
    }
}

// ---------------------------------------------------------------------------
// Comparison (raw only)
// ---------------------------------------------------------------------------

impl PartialEq for Fixed {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Fixed {}

impl PartialOrd for Fixed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fixed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Hash for Fixed {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

impl Add for Fixed {
    type Output = Fixed;

    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        self.same_scale(self.raw.saturating_add(self.aligned(rhs)))
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    #[inline]
    fn sub(self, rhs: Fixed) -> Fixed {
        self.same_scale(self.raw.saturating_sub(self.aligned(rhs)))
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    #[inline]
    fn mul(self, rhs: Fixed) -> Fixed {
        let product = self.raw as i128 * self.aligned(rhs) as i128;
        self.same_scale(saturate(product >> self.scale))
    }
}

impl Div for Fixed {
    type Output = Fixed;

    /// Truncates toward zero. Division by zero yields zero.
    #[inline]
    fn div(self, rhs: Fixed) -> Fixed {
        let divisor = self.aligned(rhs);
        if divisor == 0 {
            return self.same_scale(0);
        }
        self.same_scale(saturate(((self.raw as i128) << self.scale) / divisor as i128))
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    #[inline]
    fn neg(self) -> Fixed {
        self.same_scale(self.raw.saturating_neg())
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Fixed) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Fixed) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fixed {
    fn mul_assign(&mut self, rhs: Fixed) {
        *self = *self * rhs;
    }
}

impl DivAssign for Fixed {
    fn div_assign(&mut self, rhs: Fixed) {
        *self = *self / rhs;
    }
}

impl Sum for Fixed {
    fn sum<I: Iterator<Item = Fixed>>(iter: I) -> Fixed {
        iter.fold(Fixed::ZERO, |acc, v| acc + v)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == DEFAULT_SCALE {
            write!(f, "Fixed({})", self.to_f64())
        } else {
            write!(f, "Fixed({}@q{})", self.to_f64(), self.scale)
        }
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
