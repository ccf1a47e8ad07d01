//! Generational entity arena and transform hierarchy.
//!
//! [`Entities`] owns every entity in a slot vector indexed by
//! [`EntityId::index`]. A despawn bumps the slot's generation through the
//! [`IdAllocator`], so stale ids resolve to `None` instead of aliasing a
//! later entity.
//!
//! Hierarchy links live in each entity's [`Transform`]. World-space values
//! are derived on demand by composing the parent chain from the root down:
//!
//! ```text
//! world_position(c) = world_position(p) + world_rotation(p) * (world_scale(p) ⊙ local_position(c))
//! world_rotation(c) = world_rotation(p) * local_rotation(c)
//! world_scale(c)    = world_scale(p) ⊙ local_scale(c)
//! ```

use tracing::debug;

use rewind_math::prelude::*;

use crate::collider::{Collider, ColliderId};
use crate::entity::{AllocatorState, IdAllocator, EntityId};
use crate::object::{Entity, EntityCore};
use crate::transform::Transform;
use crate::EcsError;

/// World-space pose of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pose {
    pub position: FVec3,
    pub rotation: FQuat,
    pub scale: FVec3,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: FVec3::ZERO,
        rotation: FQuat::IDENTITY,
        scale: FVec3::ONE,
    };

    /// Compose a child's local transform under this pose.
    pub fn then(&self, local: &Transform) -> Pose {
        Pose {
            position: self.transform_point(local.local_position),
            rotation: (self.rotation * local.local_rotation).normalized(),
            scale: self.scale.scale(local.local_scale),
        }
    }

    pub fn transform_point(&self, local: FVec3) -> FVec3 {
        self.position + self.rotation * local.scale(self.scale)
    }

    pub fn inverse_transform_point(&self, world: FVec3) -> FVec3 {
        (self.rotation.inverse() * (world - self.position)).inverse_scale(self.scale)
    }
}

/// The entity arena.
#[derive(Debug, Default)]
pub struct Entities {
    allocator: IdAllocator,
    slots: Vec<Option<Entity>>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `entity` into the arena.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.allocator.allocate();
        let idx = id.index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        debug!(entity = %id, name = %entity.name(), "spawned");
        self.slots[idx] = Some(entity);
        id
    }

    /// Remove an entity. Its children are orphaned in place (their local
    /// values become world values) and it is unlinked from its parent.
    pub fn despawn(&mut self, id: EntityId) -> Result<Entity, EcsError> {
        if !self.allocator.is_alive(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        self.set_parent(id, None)?;
        let children = self
            .get(id)
            .map(|e| e.core().transform.children.clone())
            .unwrap_or_default();
        for child in children {
            if let Some(c) = self.get_mut(child) {
                c.core_mut().transform.parent = None;
            }
        }
        self.allocator.deallocate(id);
        let entity = self.slots[id.index() as usize]
            .take()
            .ok_or(EcsError::StaleEntity { entity: id })?;
        debug!(entity = %id, name = %entity.name(), "despawned");
        Ok(entity)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.slots.get(id.index() as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.slots.get_mut(id.index() as usize)?.as_mut()
    }

    pub fn core(&self, id: EntityId) -> Option<&EntityCore> {
        self.get(id).map(Entity::core)
    }

    pub fn core_mut(&mut self, id: EntityId) -> Option<&mut EntityCore> {
        self.get_mut(id).map(Entity::core_mut)
    }

    /// Mutable access to two distinct entities at once.
    pub fn pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut Entity, &mut Entity)> {
        if a == b || !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (ia, ib) = (a.index() as usize, b.index() as usize);
        if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            Some((lo[ia].as_mut()?, hi[0].as_mut()?))
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            let eb = lo[ib].as_mut()?;
            Some((hi[0].as_mut()?, eb))
        }
    }

    pub fn len(&self) -> usize {
        self.allocator.alive_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live ids in slot order.
    pub fn ids(&self) -> Vec<EntityId> {
        (0..self.slots.len() as u32)
            .filter_map(|i| self.allocator.id_at(i))
            .collect()
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.slots.iter().enumerate().filter_map(move |(i, slot)| {
            let entity = slot.as_ref()?;
            Some((self.allocator.id_at(i as u32)?, entity))
        })
    }

    /// Find the first live entity with `name`.
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.iter().find(|(_, e)| e.name() == name).map(|(id, _)| id)
    }

    pub fn allocator_state(&self) -> AllocatorState {
        self.allocator.state()
    }

    /// Replace the allocator bookkeeping, e.g. when restoring a snapshot.
    /// Entities must already occupy exactly the slots the state marks alive.
    pub fn restore_allocator(&mut self, state: AllocatorState) {
        self.allocator = IdAllocator::from_state(state);
    }

    // -- colliders ----------------------------------------------------------
    //
    // Arena-level edits. They do not touch a world's physics-active list or
    // notify overlap partners, so on an active entity go through
    // `World::add_collider` / `World::remove_collider` instead.

    /// Attach `collider` to `id` under a fresh collider id.
    pub fn attach_collider(&mut self, id: EntityId, collider: Collider) -> Option<ColliderId> {
        Some(self.core_mut(id)?.add_collider(collider))
    }

    /// Attach a collider whose id was reserved through
    /// [`EntityContext::add_collider`](crate::component::EntityContext::add_collider).
    pub fn attach_reserved_collider(&mut self, id: EntityId, collider: Collider) -> bool {
        self.core_mut(id)
            .is_some_and(|core| core.insert_reserved_collider(collider))
    }

    pub fn detach_collider(&mut self, id: EntityId, collider: ColliderId) -> Option<Collider> {
        self.core_mut(id)?.remove_collider(collider)
    }

    // -- hierarchy ----------------------------------------------------------

    /// Attach `child` under `parent`, keeping its local values.
    ///
    /// Re-assigning the current parent is a no-op. The child is always
    /// detached from its previous parent first. Passing `None` detaches.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), EcsError> {
        let current = self
            .core(child)
            .ok_or(EcsError::StaleEntity { entity: child })?
            .transform
            .parent;
        if current == parent {
            return Ok(());
        }
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(EcsError::StaleEntity { entity: p });
            }
            if p == child || self.is_ancestor(child, p) {
                return Err(EcsError::HierarchyCycle { child, parent: p });
            }
        }

        if let Some(old) = current {
            if let Some(core) = self.core_mut(old) {
                core.transform.children.retain(|c| *c != child);
            }
        }
        if let Some(p) = parent {
            if let Some(core) = self.core_mut(p) {
                core.transform.children.push(child);
            }
        }
        if let Some(core) = self.core_mut(child) {
            core.transform.parent = parent;
        }
        Ok(())
    }

    /// Attach `child` under `parent`, adjusting its local values so its
    /// world pose is unchanged (up to fixed-point rounding).
    pub fn set_parent_keep_world(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), EcsError> {
        let world = self.world_pose(child).ok_or(EcsError::StaleEntity { entity: child })?;
        self.set_parent(child, parent)?;
        let parent_pose = match parent {
            Some(p) => self.world_pose(p).ok_or(EcsError::StaleEntity { entity: p })?,
            None => Pose::IDENTITY,
        };
        if let Some(core) = self.core_mut(child) {
            let t = &mut core.transform;
            t.local_position = parent_pose.inverse_transform_point(world.position);
            t.local_rotation = (parent_pose.rotation.inverse() * world.rotation).normalized();
            t.local_scale = world.scale.inverse_scale(parent_pose.scale);
        }
        Ok(())
    }

    pub fn detach(&mut self, child: EntityId) -> Result<(), EcsError> {
        self.set_parent(child, None)
    }

    /// Whether `ancestor` appears on `id`'s parent chain.
    pub fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut cursor = self.core(id).and_then(|c| c.transform.parent);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.core(p).and_then(|c| c.transform.parent);
        }
        false
    }

    /// Derive the world pose by composing the parent chain from the root.
    pub fn world_pose(&self, id: EntityId) -> Option<Pose> {
        let mut chain = vec![&self.core(id)?.transform];
        let mut cursor = chain[0].parent;
        while let Some(p) = cursor {
            let t = &self.core(p)?.transform;
            chain.push(t);
            cursor = t.parent;
        }
        Some(chain.iter().rev().fold(Pose::IDENTITY, |pose, t| pose.then(t)))
    }

    pub fn world_position(&self, id: EntityId) -> Option<FVec3> {
        self.world_pose(id).map(|p| p.position)
    }

    pub fn world_rotation(&self, id: EntityId) -> Option<FQuat> {
        self.world_pose(id).map(|p| p.rotation)
    }

    /// Lossy world scale: the component-wise product of the chain's scales.
    pub fn world_scale(&self, id: EntityId) -> Option<FVec3> {
        self.world_pose(id).map(|p| p.scale)
    }

    fn parent_pose(&self, id: EntityId) -> Option<Pose> {
        match self.core(id)?.transform.parent {
            Some(p) => self.world_pose(p),
            None => Some(Pose::IDENTITY),
        }
    }

    /// Move an entity so its world position is `position`.
    pub fn set_world_position(&mut self, id: EntityId, position: FVec3) -> Result<(), EcsError> {
        let parent = self.parent_pose(id).ok_or(EcsError::StaleEntity { entity: id })?;
        let local = parent.inverse_transform_point(position);
        if let Some(core) = self.core_mut(id) {
            core.transform.local_position = local;
        }
        Ok(())
    }

    pub fn set_world_rotation(&mut self, id: EntityId, rotation: FQuat) -> Result<(), EcsError> {
        let parent = self.parent_pose(id).ok_or(EcsError::StaleEntity { entity: id })?;
        let local = (parent.rotation.inverse() * rotation).normalized();
        if let Some(core) = self.core_mut(id) {
            core.transform.local_rotation = local;
        }
        Ok(())
    }

    /// Map a point from `id`'s local space to world space.
    pub fn transform_point(&self, id: EntityId, local: FVec3) -> Option<FVec3> {
        self.world_pose(id).map(|p| p.transform_point(local))
    }

    /// Map a world-space point into `id`'s local space.
    pub fn inverse_transform_point(&self, id: EntityId, world: FVec3) -> Option<FVec3> {
        self.world_pose(id).map(|p| p.inverse_transform_point(world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_at(entities: &mut Entities, name: &str, x: i64, y: i64) -> EntityId {
        entities.spawn(Entity::new(name).at(FVec3::from_ints(x, y, 0)))
    }

    #[test]
    fn collider_edits_on_stale_ids_are_rejected() {
        let mut entities = Entities::new();
        let a = spawn_at(&mut entities, "a", 0, 0);
        let cid = entities
            .attach_collider(a, Collider::solid_box(FVec2::ONE))
            .unwrap();
        assert!(entities.detach_collider(a, cid).is_some());
        entities.despawn(a).unwrap();
        assert!(entities.attach_collider(a, Collider::solid_box(FVec2::ONE)).is_none());
        assert!(!entities.attach_reserved_collider(a, Collider::solid_box(FVec2::ONE)));
    }

    #[test]
    fn stale_ids_resolve_to_none() {
        let mut entities = Entities::new();
        let a = spawn_at(&mut entities, "a", 0, 0);
        entities.despawn(a).unwrap();
        assert!(entities.get(a).is_none());
        let b = spawn_at(&mut entities, "b", 0, 0);
        assert_eq!(b.index(), a.index());
        assert!(entities.get(a).is_none());
        assert_eq!(entities.get(b).map(|e| e.name()), Some("b"));
        assert!(matches!(entities.despawn(a), Err(EcsError::StaleEntity { .. })));
    }

    #[test]
    fn child_world_position_follows_parent() {
        let mut entities = Entities::new();
        let p = spawn_at(&mut entities, "p", 10, 0);
        let c = spawn_at(&mut entities, "c", 1, 2);
        entities.set_parent(c, Some(p)).unwrap();
        assert_eq!(entities.world_position(c), Some(FVec3::from_ints(11, 2, 0)));
        assert_eq!(entities.core(p).unwrap().transform.children(), &[c]);
    }

    #[test]
    fn reparenting_is_idempotent() {
        let mut entities = Entities::new();
        let p = spawn_at(&mut entities, "p", 0, 0);
        let c = spawn_at(&mut entities, "c", 0, 0);
        entities.set_parent(c, Some(p)).unwrap();
        entities.set_parent(c, Some(p)).unwrap();
        assert_eq!(entities.core(p).unwrap().transform.children().len(), 1);
    }

    #[test]
    fn reparenting_detaches_from_previous_parent() {
        let mut entities = Entities::new();
        let p1 = spawn_at(&mut entities, "p1", 0, 0);
        let p2 = spawn_at(&mut entities, "p2", 0, 0);
        let c = spawn_at(&mut entities, "c", 0, 0);
        entities.set_parent(c, Some(p1)).unwrap();
        entities.set_parent(c, Some(p2)).unwrap();
        assert!(entities.core(p1).unwrap().transform.children().is_empty());
        assert_eq!(entities.core(p2).unwrap().transform.children(), &[c]);
        assert_eq!(entities.core(c).unwrap().transform.parent(), Some(p2));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut entities = Entities::new();
        let a = spawn_at(&mut entities, "a", 0, 0);
        let b = spawn_at(&mut entities, "b", 0, 0);
        entities.set_parent(b, Some(a)).unwrap();
        assert!(matches!(
            entities.set_parent(a, Some(b)),
            Err(EcsError::HierarchyCycle { .. })
        ));
        assert!(matches!(
            entities.set_parent(a, Some(a)),
            Err(EcsError::HierarchyCycle { .. })
        ));
    }

    #[test]
    fn rotated_parent_rotates_child_offset() {
        let mut entities = Entities::new();
        let p = entities.spawn(Entity::new("p").with_transform(
            Transform::at(FVec3::ZERO).with_rotation(FQuat::angle_axis(Fixed::from_int(90), FVec3::FORWARD)),
        ));
        let c = spawn_at(&mut entities, "c", 1, 0);
        entities.set_parent(c, Some(p)).unwrap();
        let w = entities.world_position(c).unwrap();
        assert!((w.x.to_f64()).abs() < 0.002, "{w:?}");
        assert!((w.y.to_f64() - 1.0).abs() < 0.002, "{w:?}");
    }

    #[test]
    fn set_world_position_under_parent() {
        let mut entities = Entities::new();
        let p = spawn_at(&mut entities, "p", 5, 5);
        let c = spawn_at(&mut entities, "c", 0, 0);
        entities.set_parent(c, Some(p)).unwrap();
        entities.set_world_position(c, FVec3::from_ints(7, 5, 0)).unwrap();
        assert_eq!(entities.core(c).unwrap().position(), FVec3::from_ints(2, 0, 0));
        assert_eq!(entities.world_position(c), Some(FVec3::from_ints(7, 5, 0)));
    }

    #[test]
    fn keep_world_reparent_preserves_position() {
        let mut entities = Entities::new();
        let p = spawn_at(&mut entities, "p", 3, 4);
        let c = spawn_at(&mut entities, "c", 10, 10);
        entities.set_parent_keep_world(c, Some(p)).unwrap();
        assert_eq!(entities.world_position(c), Some(FVec3::from_ints(10, 10, 0)));
        assert_eq!(entities.core(c).unwrap().position(), FVec3::from_ints(7, 6, 0));
    }

    #[test]
    fn despawn_orphans_children() {
        let mut entities = Entities::new();
        let p = spawn_at(&mut entities, "p", 1, 0);
        let c = spawn_at(&mut entities, "c", 1, 0);
        entities.set_parent(c, Some(p)).unwrap();
        entities.despawn(p).unwrap();
        assert_eq!(entities.core(c).unwrap().transform.parent(), None);
        assert_eq!(entities.world_position(c), Some(FVec3::from_ints(1, 0, 0)));
    }

    #[test]
    fn pair_mut_in_either_order() {
        let mut entities = Entities::new();
        let a = spawn_at(&mut entities, "a", 0, 0);
        let b = spawn_at(&mut entities, "b", 0, 0);
        let (ea, eb) = entities.pair_mut(b, a).unwrap();
        assert_eq!((ea.name(), eb.name()), ("b", "a"));
        assert!(entities.pair_mut(a, a).is_none());
    }

    #[test]
    fn transform_point_round_trips() {
        let mut entities = Entities::new();
        let p = entities.spawn(
            Entity::new("p").with_transform(Transform::at(FVec3::from_ints(2, 0, 0)).with_scale(FVec3::from_ints(2, 2, 2))),
        );
        let world = entities.transform_point(p, FVec3::from_ints(1, 1, 0)).unwrap();
        assert_eq!(world, FVec3::from_ints(4, 2, 0));
        assert_eq!(entities.inverse_transform_point(p, world), Some(FVec3::from_ints(1, 1, 0)));
    }
}
