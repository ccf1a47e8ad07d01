//! Entities: a transform, colliders, and an ordered list of components.
//!
//! The entity itself holds no behaviour. Lifecycle and collision calls are
//! fanned out to every attached component in insertion order, and that order
//! is part of the determinism contract: reordering components changes
//! simulation results.

use serde::{Deserialize, Serialize};

use rewind_math::prelude::*;

use crate::codec::{CodecError, StateReader, StateWriter};
use crate::collider::{Collider, ColliderId};
use crate::component::{Capabilities, Component, EntityContext, StepEnv};
use crate::entity::EntityId;
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// EntityCore
// ---------------------------------------------------------------------------

/// The plain-data part of an entity. Everything here is rollback state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCore {
    pub name: String,
    pub(crate) active: bool,
    pub transform: Transform,
    colliders: Vec<Collider>,
    next_collider: u16,
}

impl EntityCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: false,
            transform: Transform::default(),
            colliders: Vec::new(),
            next_collider: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set by the world when it activates or deactivates the entity.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Attach a collider and return its id. Ids are never reused within an
    /// entity.
    ///
    /// Only for entities outside the world's active lists; a live entity
    /// gains colliders through [`EntityContext::add_collider`] or
    /// `World::add_collider` so its physics registration stays in step.
    pub(crate) fn add_collider(&mut self, mut collider: Collider) -> ColliderId {
        collider.id = self.reserve_collider_id();
        let id = collider.id;
        self.colliders.push(collider);
        id
    }

    /// Hand out the next collider id without attaching anything yet.
    pub(crate) fn reserve_collider_id(&mut self) -> ColliderId {
        let id = ColliderId(self.next_collider);
        self.next_collider = self
            .next_collider
            .checked_add(1)
            .unwrap_or_else(|| panic!("entity '{}' exhausted collider ids", self.name));
        id
    }

    /// Attach a collider whose id came from
    /// [`reserve_collider_id`](Self::reserve_collider_id). Returns `false`
    /// if the id was never reserved or is already attached.
    pub(crate) fn insert_reserved_collider(&mut self, collider: Collider) -> bool {
        if collider.id.0 >= self.next_collider || self.collider(collider.id).is_some() {
            return false;
        }
        self.colliders.push(collider);
        true
    }

    /// Detach a collider. The caller is responsible for notifying partners
    /// in its overlap set.
    pub(crate) fn remove_collider(&mut self, id: ColliderId) -> Option<Collider> {
        let idx = self.colliders.iter().position(|c| c.id == id)?;
        Some(self.colliders.remove(idx))
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn colliders_mut(&mut self) -> &mut [Collider] {
        &mut self.colliders
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    pub fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.colliders.iter_mut().find(|c| c.id == id)
    }

    pub fn has_colliders(&self) -> bool {
        !self.colliders.is_empty()
    }

    pub fn position(&self) -> FVec3 {
        self.transform.local_position
    }

    pub fn set_position(&mut self, position: FVec3) {
        self.transform.local_position = position;
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An entity: [`EntityCore`] plus its components.
pub struct Entity {
    core: EntityCore,
    components: Vec<Box<dyn Component>>,
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.components.iter().map(|c| c.name()).collect();
        f.debug_struct("Entity")
            .field("core", &self.core)
            .field("components", &names)
            .finish()
    }
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: EntityCore::new(name),
            components: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.core.transform = transform;
        self
    }

    pub fn at(self, position: FVec3) -> Self {
        self.with_transform(Transform::at(position))
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.core.add_collider(collider);
        self
    }

    pub fn with_component<C: Component>(mut self, component: C) -> Self {
        self.add_component(component);
        self
    }

    /// Append a component. It runs after every component already attached.
    pub fn add_component<C: Component>(&mut self, component: C) {
        self.components.push(Box::new(component));
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn core(&self) -> &EntityCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    pub fn is_active(&self) -> bool {
        self.core.active
    }

    /// The first component of type `T`, if any.
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|c| (**c).as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|c| (**c).as_any_mut().downcast_mut::<T>())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.iter().map(|c| c.name())
    }

    /// Union of every component's capabilities.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::NONE;
        for c in &self.components {
            caps |= c.capabilities();
        }
        caps
    }

    /// Call `hook` on every component advertising `required`, in insertion
    /// order, each with a fresh [`EntityContext`].
    pub fn dispatch<F>(&mut self, id: EntityId, env: &mut StepEnv<'_>, required: Capabilities, mut hook: F)
    where
        F: FnMut(&mut dyn Component, &mut EntityContext<'_>),
    {
        let Entity { core, components } = self;
        for component in components.iter_mut() {
            if !component.capabilities().contains(required) {
                continue;
            }
            let mut ctx = EntityContext::new(id, core, env);
            hook(&mut **component, &mut ctx);
        }
    }

    // -- rollback state -----------------------------------------------------

    /// Encode the entity: core (name, active, colliders, transform), then
    /// the component count and each component as `(tag, blob)`.
    pub fn save(&self, out: &mut StateWriter) -> Result<(), CodecError> {
        out.write(&self.core.name)?;
        out.write(&self.core.active)?;
        out.write(&self.core.colliders)?;
        out.write(&self.core.next_collider)?;
        out.write(&self.core.transform)?;
        out.write(&(self.components.len() as u32))?;
        for component in &self.components {
            out.write(component.name())?;
            if component.capabilities().contains(Capabilities::STATE) {
                out.write_section(|s| component.save(s))?;
            } else {
                out.write_blob(&[])?;
            }
        }
        Ok(())
    }

    /// Restore state written by [`save`](Self::save) onto this entity's
    /// existing components. Component count and tags must match.
    pub fn load(&mut self, input: &mut StateReader<'_>) -> Result<(), CodecError> {
        self.core.name = input.read()?;
        self.core.active = input.read()?;
        self.core.colliders = input.read()?;
        self.core.next_collider = input.read()?;
        self.core.transform = input.read()?;
        let count = input.read::<u32>()? as usize;
        if count != self.components.len() {
            return Err(CodecError::ComponentCount {
                expected: self.components.len(),
                found: count,
            });
        }
        for component in self.components.iter_mut() {
            let tag: String = input.read()?;
            if tag != component.name() {
                return Err(CodecError::TagMismatch {
                    expected: component.name().to_owned(),
                    found: tag,
                });
            }
            let blob = input.read_blob()?;
            if component.capabilities().contains(Capabilities::STATE) {
                component.load(&mut StateReader::new(blob))?;
            }
        }
        Ok(())
    }
}
