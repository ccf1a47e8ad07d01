//! Fixed-point rotation quaternion.
//!
//! Angles at this API surface are in degrees. Rotations are only meaningful
//! for unit quaternions; [`FQuat::inverse`] is the conjugate and assumes the
//! quaternion is normalized.

use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed;
use crate::vec3::FVec3;

/// A quaternion `(x, y, z, w)`. Serialized component-wise in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FQuat {
    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub w: Fixed,
}

impl Default for FQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FQuat {
    pub const IDENTITY: FQuat = FQuat::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO, Fixed::ONE);

    #[inline]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed, w: Fixed) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `degrees` around `axis` (need not be normalized).
    pub fn angle_axis(degrees: Fixed, axis: FVec3) -> Self {
        let axis = axis.normalized();
        if axis == FVec3::ZERO {
            return Self::IDENTITY;
        }
        let half = degrees.to_radians() * Fixed::HALF;
        let s = half.sin();
        Self::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    /// Rotation from Euler angles in degrees.
    ///
    /// Each axis contributes a half-angle quaternion; they compose so that the
    /// X rotation applies first, then Y, then Z (`qz * qy * qx`). The result
    /// is normalized.
    pub fn from_euler(x_deg: Fixed, y_deg: Fixed, z_deg: Fixed) -> Self {
        let qx = Self::angle_axis(x_deg, FVec3::RIGHT);
        let qy = Self::angle_axis(y_deg, FVec3::UP);
        let qz = Self::angle_axis(z_deg, FVec3::FORWARD);
        (qz * qy * qx).normalized()
    }

    /// Rotation whose forward (+Z) axis points along `forward` and whose up
    /// axis is as close to `up` as possible.
    ///
    /// Builds an orthonormal basis by Gram-Schmidt and converts the basis
    /// matrix to a quaternion. A zero `forward` gives identity; an `up`
    /// parallel to `forward` falls back to an arbitrary perpendicular right
    /// vector.
    pub fn look_rotation(forward: FVec3, up: FVec3) -> Self {
        let f = forward.normalized();
        if f == FVec3::ZERO {
            return Self::IDENTITY;
        }
        let mut r = up.cross(f).normalized();
        if r == FVec3::ZERO {
            let axis = if f.x.abs() < Fixed::HALF {
                FVec3::RIGHT
            } else {
                FVec3::FORWARD
            };
            r = (axis - f * axis.dot(f)).normalized();
        }
        let u = f.cross(r);

        let (m00, m01, m02) = (r.x, u.x, f.x);
        let (m10, m11, m12) = (r.y, u.y, f.y);
        let (m20, m21, m22) = (r.z, u.z, f.z);
        let quarter = Fixed::from_ratio(1, 4);

        let trace = m00 + m11 + m22;
        let q = if trace > Fixed::ZERO {
            let s = (trace + Fixed::ONE).sqrt() * Fixed::TWO;
            Self::new((m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, s * quarter)
        } else if m00 > m11 && m00 > m22 {
            let s = (Fixed::ONE + m00 - m11 - m22).sqrt() * Fixed::TWO;
            Self::new(s * quarter, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
        } else if m11 > m22 {
            let s = (Fixed::ONE + m11 - m00 - m22).sqrt() * Fixed::TWO;
            Self::new((m01 + m10) / s, s * quarter, (m12 + m21) / s, (m02 - m20) / s)
        } else {
            let s = (Fixed::ONE + m22 - m00 - m11).sqrt() * Fixed::TWO;
            Self::new((m02 + m20) / s, (m12 + m21) / s, s * quarter, (m10 - m01) / s)
        };
        q.normalized()
    }

    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn magnitude(self) -> Fixed {
        self.dot(self).sqrt()
    }

    /// Unit quaternion in the same direction; the zero quaternion becomes
    /// identity.
    pub fn normalized(self) -> Self {
        let len = self.magnitude();
        if len.is_zero() {
            return Self::IDENTITY;
        }
        Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }

    /// Conjugate. Equal to the inverse only for unit quaternions.
    pub fn inverse(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Component-wise linear interpolation (shortest arc) followed by
    /// renormalization. `t` is clamped to `[0, 1]`.
    pub fn lerp(self, to: Self, t: Fixed) -> Self {
        let t = t.clamp01();
        let to = if self.dot(to).is_negative() {
            Self::new(-to.x, -to.y, -to.z, -to.w)
        } else {
            to
        };
        Self::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.z + (to.z - self.z) * t,
            self.w + (to.w - self.w) * t,
        )
        .normalized()
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: FVec3) -> FVec3 {
        let q = FVec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * Fixed::TWO;
        v + t * self.w + q.cross(t)
    }
}

impl Mul for FQuat {
    type Output = FQuat;

    /// Hamilton product: `self * rhs` applies `rhs` first, then `self`.
    fn mul(self, rhs: FQuat) -> FQuat {
        FQuat::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<FVec3> for FQuat {
    type Output = FVec3;

    fn mul(self, rhs: FVec3) -> FVec3 {
        self.rotate(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(actual: FVec3, expected: FVec3) {
        let d = actual - expected;
        let tol = 0.002;
        assert!(
            d.x.to_f64().abs() < tol && d.y.to_f64().abs() < tol && d.z.to_f64().abs() < tol,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn identity_leaves_vectors_alone() {
        let v = FVec3::from_ints(1, -2, 3);
        assert_eq!(FQuat::IDENTITY * v, v);
        assert_eq!(FQuat::IDENTITY * FQuat::IDENTITY, FQuat::IDENTITY);
    }

    #[test]
    fn yaw_90_turns_forward_to_right() {
        let q = FQuat::from_euler(Fixed::ZERO, Fixed::from_int(90), Fixed::ZERO);
        assert_vec_close(q * FVec3::FORWARD, FVec3::RIGHT);
    }

    #[test]
    fn roll_90_turns_right_to_up() {
        let q = FQuat::angle_axis(Fixed::from_int(90), FVec3::FORWARD);
        assert_vec_close(q * FVec3::RIGHT, FVec3::UP);
    }

    #[test]
    fn inverse_undoes_rotation() {
        let q = FQuat::from_euler(Fixed::from_int(30), Fixed::from_int(45), Fixed::from_int(10));
        let v = FVec3::from_ints(2, 1, -3);
        assert_vec_close(q.inverse() * (q * v), v);
    }

    #[test]
    fn look_rotation_forward_is_identity() {
        let q = FQuat::look_rotation(FVec3::FORWARD, FVec3::UP);
        assert_vec_close(q * FVec3::FORWARD, FVec3::FORWARD);
        assert_vec_close(q * FVec3::UP, FVec3::UP);
    }

    #[test]
    fn look_rotation_points_forward_axis() {
        let q = FQuat::look_rotation(FVec3::RIGHT, FVec3::UP);
        assert_vec_close(q * FVec3::FORWARD, FVec3::RIGHT);
        let q = FQuat::look_rotation(-FVec3::FORWARD, FVec3::UP);
        assert_vec_close(q * FVec3::FORWARD, -FVec3::FORWARD);
    }

    #[test]
    fn look_rotation_zero_forward_is_identity() {
        assert_eq!(FQuat::look_rotation(FVec3::ZERO, FVec3::UP), FQuat::IDENTITY);
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = FQuat::IDENTITY;
        let b = FQuat::angle_axis(Fixed::from_int(90), FVec3::UP);
        assert_eq!(a.lerp(b, Fixed::ZERO), a);
        let mid = a.lerp(b, Fixed::HALF);
        assert_vec_close(
            mid * FVec3::FORWARD,
            FQuat::angle_axis(Fixed::from_int(45), FVec3::UP) * FVec3::FORWARD,
        );
    }

    #[test]
    fn normalize_zero_is_identity() {
        let zero = FQuat::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO, Fixed::ZERO);
        assert_eq!(zero.normalized(), FQuat::IDENTITY);
    }
}
