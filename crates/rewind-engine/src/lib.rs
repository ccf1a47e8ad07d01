//! Rewind Engine -- the frame-stepped world driver for a deterministic,
//! rollback-replayable simulation.
//!
//! This crate builds on [`rewind_ecs`] to provide the simulation driver: a
//! [`World`](world::World) that advances one fixed step per call in a single
//! canonical phase order, a collision pass with Enter/Stay/Exit semantics,
//! byte-exact snapshots for rollback, a ring of per-frame snapshots for a
//! rollback transport, and input replay with hash checkpoints.
//!
//! # Quick Start
//!
//! ```
//! use rewind_engine::prelude::*;
//!
//! let mut world = World::new(WorldConfig {
//!     fixed_dt: Fixed::ONE,
//!     ..Default::default()
//! });
//! let ball = world.spawn(
//!     Entity::new("ball")
//!         .with_collider(Collider::solid_box(FVec2::ONE))
//!         .with_component(KinematicBody::new(FVec3::RIGHT)),
//! );
//! world.activate(ball);
//!
//! let saved = world.save_state().unwrap();
//! for _ in 0..10 {
//!     world.update([0, 0], 0);
//! }
//! assert_eq!(world.frame(), 10);
//! assert_eq!(world.entities().core(ball).unwrap().position().x, Fixed::from_int(10));
//!
//! world.load_state(&saved).unwrap();
//! assert_eq!(world.frame(), 0);
//! assert_eq!(world.save_state().unwrap(), saved);
//! ```

#![deny(unsafe_code)]

pub mod collision;
pub mod replay;
pub mod rollback;
pub mod snapshot;
pub mod world;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use rewind_ecs;

/// Re-export the math crate for convenience.
pub use rewind_math;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while saving or restoring world state.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The bytes could not be encoded or decoded (truncated, garbled, or a
    /// component layout mismatch).
    #[error("snapshot is truncated or garbled: {0}")]
    Codec(#[from] rewind_ecs::codec::CodecError),

    /// Bytes were left over after the last entity record.
    #[error("snapshot has {remaining} trailing bytes")]
    TrailingBytes { remaining: usize },

    /// The snapshot lists an entity this world no longer has.
    #[error("snapshot references entity {entity:?}, which does not exist")]
    MissingEntity { entity: rewind_ecs::entity::EntityId },

    /// A stored checksum does not match the bytes it was stored with.
    #[error("snapshot checksum mismatch for frame {frame}: stored {expected:#018x}, computed {actual:#018x}")]
    HashMismatch { frame: u32, expected: u64, actual: u64 },

    /// The rollback ring no longer holds the requested frame.
    #[error("frame {frame} is not retained in the snapshot ring")]
    FrameNotRetained { frame: u32 },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS and math preludes.
    pub use rewind_ecs::prelude::*;
    pub use rewind_math::prelude::*;

    // Engine-specific exports.
    pub use crate::collision::{CollisionEvent, IgnorePairs};
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayError, ReplayLog, ReplayRecorder,
        ReplayResult,
    };
    pub use crate::rollback::{FrameSnapshot, SnapshotRing};
    pub use crate::world::{PreStepHook, PresentationPose, World, WorldConfig};
    pub use crate::SnapshotError;
}
