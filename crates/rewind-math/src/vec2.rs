//! Two-dimensional fixed-point vector.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed;

/// A 2D vector of [`Fixed`] components. Serialized as `x` then `y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FVec2 {
    pub x: Fixed,
    pub y: Fixed,
}

impl FVec2 {
    pub const ZERO: FVec2 = FVec2::new(Fixed::ZERO, Fixed::ZERO);
    pub const ONE: FVec2 = FVec2::new(Fixed::ONE, Fixed::ONE);
    pub const RIGHT: FVec2 = FVec2::new(Fixed::ONE, Fixed::ZERO);
    pub const LEFT: FVec2 = FVec2::new(Fixed::NEG_ONE, Fixed::ZERO);
    pub const UP: FVec2 = FVec2::new(Fixed::ZERO, Fixed::ONE);
    pub const DOWN: FVec2 = FVec2::new(Fixed::ZERO, Fixed::NEG_ONE);

    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    pub const fn from_ints(x: i64, y: i64) -> Self {
        Self::new(Fixed::from_int(x), Fixed::from_int(y))
    }

    pub fn sqr_magnitude(self) -> Fixed {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(self) -> Fixed {
        self.sqr_magnitude().sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalized(self) -> Self {
        let len = self.magnitude();
        if len.is_zero() {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len)
    }

    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(self, other: Self) -> Fixed {
        self.x * other.y - self.y * other.x
    }

    pub fn distance(self, other: Self) -> Fixed {
        (other - self).magnitude()
    }

    /// Component-wise product.
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }

    /// Counter-clockwise perpendicular.
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Interpolate with `t` clamped to `[0, 1]`.
    pub fn lerp(self, to: Self, t: Fixed) -> Self {
        let t = t.clamp01();
        self + (to - self) * t
    }

    pub fn clamp_magnitude(self, max_len: Fixed) -> Self {
        if self.sqr_magnitude() > max_len * max_len {
            self.normalized() * max_len
        } else {
            self
        }
    }

    pub fn move_towards(self, target: Self, max_delta: Fixed) -> Self {
        let delta = target - self;
        let dist = delta.magnitude();
        if dist <= max_delta || dist.is_zero() {
            target
        } else {
            self + delta / dist * max_delta
        }
    }

    /// Reflect off a surface with unit `normal`.
    pub fn reflect(self, normal: Self) -> Self {
        self - normal * (Fixed::TWO * self.dot(normal))
    }

    /// Unsigned angle in degrees, in `[0, 180]`.
    pub fn angle(from: Self, to: Self) -> Fixed {
        let denom = (from.sqr_magnitude() * to.sqr_magnitude()).sqrt();
        if denom.is_zero() {
            return Fixed::ZERO;
        }
        let cos = (from.dot(to) / denom).clamp(Fixed::NEG_ONE, Fixed::ONE);
        cos.acos().to_degrees()
    }

    /// Angle in degrees, negative when `to` is clockwise from `from`.
    pub fn signed_angle(from: Self, to: Self) -> Fixed {
        let unsigned = Self::angle(from, to);
        if from.cross(to).is_negative() {
            -unsigned
        } else {
            unsigned
        }
    }
}

impl Add for FVec2 {
    type Output = FVec2;
    fn add(self, rhs: FVec2) -> FVec2 {
        FVec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for FVec2 {
    type Output = FVec2;
    fn sub(self, rhs: FVec2) -> FVec2 {
        FVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<Fixed> for FVec2 {
    type Output = FVec2;
    fn mul(self, rhs: Fixed) -> FVec2 {
        FVec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<Fixed> for FVec2 {
    type Output = FVec2;
    fn div(self, rhs: Fixed) -> FVec2 {
        FVec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for FVec2 {
    type Output = FVec2;
    fn neg(self) -> FVec2 {
        FVec2::new(-self.x, -self.y)
    }
}

impl AddAssign for FVec2 {
    fn add_assign(&mut self, rhs: FVec2) {
        *self = *self + rhs;
    }
}

impl SubAssign for FVec2 {
    fn sub_assign(&mut self, rhs: FVec2) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> FVec2 {
        FVec2::new(Fixed::from_f64(x), Fixed::from_f64(y))
    }

    #[test]
    fn magnitude_of_3_4_is_5() {
        assert_eq!(v(3.0, 4.0).magnitude(), Fixed::from_int(5));
    }

    #[test]
    fn normalize_zero_is_noop() {
        assert_eq!(FVec2::ZERO.normalized(), FVec2::ZERO);
    }

    #[test]
    fn normalize_produces_unit_length() {
        let n = v(3.0, 4.0).normalized();
        assert_eq!(n, FVec2::new(Fixed::from_ratio(3, 5), Fixed::from_ratio(4, 5)));
    }

    #[test]
    fn reflect_flips_normal_component() {
        let r = v(1.0, -1.0).reflect(FVec2::UP);
        assert_eq!(r, v(1.0, 1.0));
    }

    #[test]
    fn lerp_clamps_t() {
        let a = FVec2::ZERO;
        let b = FVec2::from_ints(10, 0);
        assert_eq!(a.lerp(b, Fixed::HALF), FVec2::from_ints(5, 0));
        assert_eq!(a.lerp(b, Fixed::TWO), b);
        assert_eq!(a.lerp(b, Fixed::NEG_ONE), a);
    }

    #[test]
    fn angles_in_degrees() {
        let right_angle = FVec2::angle(FVec2::RIGHT, FVec2::UP);
        assert!((right_angle.to_f64() - 90.0).abs() < 0.05);
        let signed = FVec2::signed_angle(FVec2::UP, FVec2::RIGHT);
        assert!((signed.to_f64() + 90.0).abs() < 0.05);
        assert_eq!(FVec2::angle(FVec2::ZERO, FVec2::UP), Fixed::ZERO);
    }

    #[test]
    fn move_towards_stops_at_target() {
        let start = FVec2::ZERO;
        let target = FVec2::from_ints(3, 4);
        assert_eq!(start.move_towards(target, Fixed::from_int(10)), target);
        assert_eq!(start.move_towards(target, Fixed::from_int(5)), target);
        assert_eq!(
            start.move_towards(target, Fixed::ONE),
            FVec2::new(Fixed::from_ratio(3, 5), Fixed::from_ratio(4, 5))
        );
    }
}
