//! Rewind Math -- deterministic fixed-point scalar and geometry.
//!
//! Everything in this crate is integer arithmetic underneath, so a simulation
//! built on it produces bit-identical results on every machine. This is the
//! foundation the rollback core relies on: two peers that feed the same
//! inputs into the same state must arrive at the same bytes.
//!
//! # Quick Start
//!
//! ```
//! use rewind_math::prelude::*;
//!
//! let a = Fixed::from_int(3);
//! let b = Fixed::from_ratio(1, 2);
//! assert_eq!((a * b).to_f64(), 1.5);
//!
//! let v = FVec2::from_ints(3, 4);
//! assert_eq!(v.magnitude(), Fixed::from_int(5));
//! ```

#![deny(unsafe_code)]

pub mod fixed;
pub mod quat;
pub mod vec2;
pub mod vec3;

/// Errors from checked fixed-point conversions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("fixed-point scale {scale} exceeds maximum {max}")]
    ScaleOutOfRange { scale: u32, max: u32 },
}

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::fixed::{Fixed, DEFAULT_SCALE};
    pub use crate::quat::FQuat;
    pub use crate::vec2::FVec2;
    pub use crate::vec3::FVec3;
    pub use crate::MathError;
}
