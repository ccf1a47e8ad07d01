//! Three-dimensional fixed-point vector.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed;
use crate::vec2::FVec2;

/// A 3D vector of [`Fixed`] components. Serialized as `x`, `y`, `z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FVec3 {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
}

impl FVec3 {
    pub const ZERO: FVec3 = FVec3::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO);
    pub const ONE: FVec3 = FVec3::new(Fixed::ONE, Fixed::ONE, Fixed::ONE);
    pub const RIGHT: FVec3 = FVec3::new(Fixed::ONE, Fixed::ZERO, Fixed::ZERO);
    pub const UP: FVec3 = FVec3::new(Fixed::ZERO, Fixed::ONE, Fixed::ZERO);
    pub const FORWARD: FVec3 = FVec3::new(Fixed::ZERO, Fixed::ZERO, Fixed::ONE);

    #[inline]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    pub const fn from_ints(x: i64, y: i64, z: i64) -> Self {
        Self::new(Fixed::from_int(x), Fixed::from_int(y), Fixed::from_int(z))
    }

    /// Drop the `z` component.
    pub fn xy(self) -> FVec2 {
        FVec2::new(self.x, self.y)
    }

    pub fn sqr_magnitude(self) -> Fixed {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Accurate only while the squared length stays inside the range where
    /// [`Fixed::sqrt`] converges.
    pub fn magnitude(self) -> Fixed {
        self.sqr_magnitude().sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalized(self) -> Self {
        let len = self.magnitude();
        if len.is_zero() {
            return Self::ZERO;
        }
        self / len
    }

    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn distance(self, other: Self) -> Fixed {
        (other - self).magnitude()
    }

    /// Component-wise product.
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Component-wise quotient; zero components of `other` give zero.
    pub fn inverse_scale(self, other: Self) -> Self {
        Self::new(self.x / other.x, self.y / other.y, self.z / other.z)
    }

    /// Interpolate with `t` clamped to `[0, 1]`.
    pub fn lerp(self, to: Self, t: Fixed) -> Self {
        self + (to - self) * t.clamp01()
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

    /// Projection onto `onto`. Projecting onto zero gives zero.
    pub fn project(self, onto: Self) -> Self {
        let len_sq = onto.sqr_magnitude();
        if len_sq.is_zero() {
            return Self::ZERO;
        }
        onto * (self.dot(onto) / len_sq)
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

    /// Angle in degrees around `axis`, negative for clockwise rotation.
    pub fn signed_angle(from: Self, to: Self, axis: Self) -> Fixed {
        let unsigned = Self::angle(from, to);
        if axis.dot(from.cross(to)).is_negative() {
            -unsigned
        } else {
            unsigned
        }
    }
}

impl From<FVec2> for FVec3 {
    fn from(v: FVec2) -> Self {
        FVec3::new(v.x, v.y, Fixed::ZERO)
    }
}

impl Add for FVec3 {
    type Output = FVec3;
    fn add(self, rhs: FVec3) -> FVec3 {
        FVec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for FVec3 {
    type Output = FVec3;
    fn sub(self, rhs: FVec3) -> FVec3 {
        FVec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<Fixed> for FVec3 {
    type Output = FVec3;
    fn mul(self, rhs: Fixed) -> FVec3 {
        FVec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<Fixed> for FVec3 {
    type Output = FVec3;
    fn div(self, rhs: Fixed) -> FVec3 {
        FVec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for FVec3 {
    type Output = FVec3;
    fn neg(self) -> FVec3 {
        FVec3::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for FVec3 {
    fn add_assign(&mut self, rhs: FVec3) {
        *self = *self + rhs;
    }
}

impl SubAssign for FVec3 {
    fn sub_assign(&mut self, rhs: FVec3) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_of_basis_vectors() {
        assert_eq!(FVec3::RIGHT.cross(FVec3::UP), FVec3::FORWARD);
        assert_eq!(FVec3::UP.cross(FVec3::FORWARD), FVec3::RIGHT);
        assert_eq!(FVec3::UP.cross(FVec3::RIGHT), -FVec3::FORWARD);
    }

    #[test]
    fn magnitude_and_normalize() {
        let v = FVec3::from_ints(2, 3, 6);
        assert_eq!(v.magnitude(), Fixed::from_int(7));
        assert_eq!(FVec3::ZERO.normalized(), FVec3::ZERO);
        let n = FVec3::from_ints(0, 0, 5).normalized();
        assert_eq!(n, FVec3::FORWARD);
    }

    #[test]
    fn project_onto_axis() {
        let v = FVec3::from_ints(3, 4, 5);
        assert_eq!(v.project(FVec3::UP), FVec3::from_ints(0, 4, 0));
        assert_eq!(v.project(FVec3::ZERO), FVec3::ZERO);
    }

    #[test]
    fn signed_angle_uses_axis_orientation() {
        let ccw = FVec3::signed_angle(FVec3::RIGHT, FVec3::FORWARD, FVec3::UP);
        assert!((ccw.to_f64() + 90.0).abs() < 0.05, "got {ccw:?}");
        let cw = FVec3::signed_angle(FVec3::FORWARD, FVec3::RIGHT, FVec3::UP);
        assert!((cw.to_f64() - 90.0).abs() < 0.05, "got {cw:?}");
    }

    #[test]
    fn inverse_scale_by_zero_component_is_zero() {
        let v = FVec3::from_ints(4, 4, 4);
        let s = FVec3::from_ints(2, 0, 4);
        assert_eq!(v.inverse_scale(s), FVec3::from_ints(2, 0, 1));
    }
}
