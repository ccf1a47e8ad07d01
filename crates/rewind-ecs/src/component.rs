//! Behaviour components and the context they run in.
//!
//! A [`Component`] is a trait object attached to an [`Entity`](crate::object::Entity).
//! Every hook has a no-op default; a component opts into the per-step hooks
//! by advertising [`Capabilities`], which the world checks before it
//! dispatches. Lifecycle hooks (`init`, `begin`, `end`) always run.
//!
//! Components see their own entity's core (name, transform, colliders) and
//! the shared step services through an [`EntityContext`]. Anything that
//! changes world structure goes through the deferred
//! [`CommandQueue`](crate::command::CommandQueue).

use std::any::Any;

use rewind_math::prelude::*;

use crate::codec::{CodecError, StateReader, StateWriter};
use crate::collider::{Collider, ColliderId, Collision};
use crate::command::CommandQueue;
use crate::entity::EntityId;
use crate::input::InputState;
use crate::object::EntityCore;
use crate::rng::SimRng;
use crate::scheduler::Scheduler;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Which optional hooks a component wants dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(pub u32);

impl Capabilities {
    pub const NONE: Self = Self(0);
    /// `tick` every step.
    pub const TICK: Self = Self(1 << 0);
    /// `late_tick` every step, after collisions.
    pub const LATE_TICK: Self = Self(1 << 1);
    /// `on_hit_*` for solid contacts.
    pub const HIT: Self = Self(1 << 2);
    /// `on_overlap_*` for trigger contacts.
    pub const OVERLAP: Self = Self(1 << 3);
    /// `save` / `load` carry state.
    pub const STATE: Self = Self(1 << 4);
    pub const ALL: Self = Self(
        Self::TICK.0 | Self::LATE_TICK.0 | Self::HIT.0 | Self::OVERLAP.0 | Self::STATE.0,
    );

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Upcast to [`Any`] for typed lookup. Implemented for every `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A behaviour attached to an entity.
///
/// Hooks run in component insertion order. Implementations must be
/// deterministic: no wall-clock time, no host floats feeding back into
/// simulation state, no iteration over hash-ordered containers.
pub trait Component: AsAny + 'static {
    /// Stable tag written ahead of the component's state in snapshots.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Called once when the entity is spawned into a world.
    fn init(&mut self, _ctx: &mut EntityContext<'_>) {}

    /// Called on the first tick phase after activation.
    fn begin(&mut self, _ctx: &mut EntityContext<'_>) {}

    fn tick(&mut self, _ctx: &mut EntityContext<'_>) {}

    fn late_tick(&mut self, _ctx: &mut EntityContext<'_>) {}

    /// Called when the entity is deactivated, if `begin` has run since it
    /// was activated.
    fn end(&mut self, _ctx: &mut EntityContext<'_>) {}

    /// Write rollback state. Only called with [`Capabilities::STATE`].
    fn save(&self, _out: &mut StateWriter) -> Result<(), CodecError> {
        Ok(())
    }

    /// Exact inverse of [`save`](Self::save).
    fn load(&mut self, _input: &mut StateReader<'_>) -> Result<(), CodecError> {
        Ok(())
    }

    fn on_hit_enter(&mut self, _hit: &Collision, _ctx: &mut EntityContext<'_>) {}
    fn on_hit_stay(&mut self, _hit: &Collision, _ctx: &mut EntityContext<'_>) {}
    fn on_hit_exit(&mut self, _hit: &Collision, _ctx: &mut EntityContext<'_>) {}

    fn on_overlap_enter(&mut self, _hit: &Collision, _ctx: &mut EntityContext<'_>) {}
    fn on_overlap_stay(&mut self, _hit: &Collision, _ctx: &mut EntityContext<'_>) {}
    fn on_overlap_exit(&mut self, _hit: &Collision, _ctx: &mut EntityContext<'_>) {}
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// World services shared by every hook invoked during one step phase.
pub struct StepEnv<'a> {
    pub input: &'a InputState,
    pub frame: u32,
    pub dt: Fixed,
    pub rng: &'a mut SimRng,
    pub scheduler: &'a mut Scheduler,
    pub commands: &'a mut CommandQueue,
}

/// What a component hook can see and touch.
pub struct EntityContext<'a> {
    /// The entity the component is attached to.
    pub id: EntityId,
    pub core: &'a mut EntityCore,
    pub input: &'a InputState,
    pub frame: u32,
    pub dt: Fixed,
    pub rng: &'a mut SimRng,
    pub scheduler: &'a mut Scheduler,
    pub commands: &'a mut CommandQueue,
}

impl<'a> EntityContext<'a> {
    pub fn new(id: EntityId, core: &'a mut EntityCore, env: &'a mut StepEnv<'_>) -> Self {
        Self {
            id,
            core,
            input: env.input,
            frame: env.frame,
            dt: env.dt,
            rng: &mut *env.rng,
            scheduler: &mut *env.scheduler,
            commands: &mut *env.commands,
        }
    }

    /// Queue this entity's own deactivation.
    pub fn deactivate_self(&mut self) {
        self.commands.deactivate(self.id);
    }

    /// Queue a new collider for this entity. The id is reserved now; the
    /// collider is attached, and joins collision testing, at the next
    /// step's flush.
    pub fn add_collider(&mut self, mut collider: Collider) -> ColliderId {
        collider.id = self.core.reserve_collider_id();
        let id = collider.id;
        self.commands.add_collider(self.id, collider);
        id
    }

    /// Queue removal of one of this entity's colliders.
    pub fn remove_collider(&mut self, collider: ColliderId) {
        self.commands.remove_collider(self.id, collider);
    }
}
