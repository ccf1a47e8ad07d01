//! Rewind ECS -- entities, components, colliders and scheduled actions for a
//! deterministic, rollback-replayable simulation.
//!
//! Entities live in a generational arena ([`store::Entities`]). Each entity
//! owns a [`transform::Transform`], zero or more [`collider::Collider`]s and
//! an ordered list of [`component::Component`] trait objects whose hooks run
//! in insertion order. Everything that makes up simulation state (entity
//! cores, component state, the scheduler registry, the RNG, queued commands)
//! serializes through the fixed-width [`codec`] so a world can be saved,
//! restored and resimulated bit-for-bit.
//!
//! The step driver that ties these pieces together lives in `rewind-engine`.
//!
//! # Quick Start
//!
//! ```
//! use rewind_ecs::prelude::*;
//! use rewind_math::prelude::*;
//!
//! let mut entities = Entities::new();
//! let parent = entities.spawn(Entity::new("cart").at(FVec3::from_ints(10, 0, 0)));
//! let child = entities.spawn(
//!     Entity::new("crate")
//!         .at(FVec3::from_ints(0, 1, 0))
//!         .with_collider(Collider::solid_box(FVec2::ONE))
//!         .with_component(KinematicBody::new(FVec3::RIGHT)),
//! );
//! entities.set_parent(child, Some(parent)).unwrap();
//!
//! assert_eq!(entities.world_position(child), Some(FVec3::from_ints(10, 1, 0)));
//! assert!(entities.get(child).unwrap().get::<KinematicBody>().is_some());
//! ```

#![deny(unsafe_code)]

pub mod codec;
pub mod collider;
pub mod command;
pub mod component;
pub mod entity;
pub mod input;
pub mod kinematic;
pub mod object;
pub mod rng;
pub mod scheduler;
pub mod store;
pub mod transform;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by entity and hierarchy operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// Parenting would make an entity its own ancestor.
    #[error("cannot parent {child:?} under {parent:?}: would create a cycle")]
    HierarchyCycle {
        child: entity::EntityId,
        parent: entity::EntityId,
    },

    /// A scheduled action names a callback or predicate that is not in the
    /// action table.
    #[error("no action or condition registered as '{name}'")]
    UnknownAction { name: String },

    /// Encoding or decoding rollback state failed.
    #[error(transparent)]
    Codec(#[from] codec::CodecError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::codec::{CodecError, StateReader, StateWriter};
    pub use crate::collider::{
        Collider, ColliderId, ColliderMode, ColliderShape, Collision, ContactPhase, Facing,
        OverlapKey, OverlapSet,
    };
    pub use crate::command::{Command, CommandQueue};
    pub use crate::component::{Capabilities, Component, EntityContext, StepEnv};
    pub use crate::entity::{AllocatorState, IdAllocator, EntityId};
    pub use crate::input::{Buttons, InputFrame, InputSource, InputState, ScriptedInput, PLAYER_COUNT};
    pub use crate::kinematic::KinematicBody;
    pub use crate::object::{Entity, EntityCore};
    pub use crate::rng::SimRng;
    pub use crate::scheduler::{
        ActionContext, ActionEnv, ActionFn, ActionId, ActionKind, ActionSpec, ActionTable,
        ConditionFn, LoopMode, ScheduledAction, Scheduler,
    };
    pub use crate::store::{Entities, Pose};
    pub use crate::transform::Transform;
    pub use crate::EcsError;
}
