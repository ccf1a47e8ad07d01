//! Local transform node.
//!
//! A [`Transform`] stores only *local* values plus the hierarchy links. World
//! values are never cached; [`Entities`](crate::store::Entities) derives them
//! by walking the parent chain each time they are asked for.

use serde::{Deserialize, Serialize};

use rewind_math::prelude::*;

use crate::entity::EntityId;

/// Position, rotation and scale relative to the parent (or the world when
/// there is no parent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub local_position: FVec3,
    pub local_rotation: FQuat,
    pub local_scale: FVec3,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            local_position: FVec3::ZERO,
            local_rotation: FQuat::IDENTITY,
            local_scale: FVec3::ONE,
            parent: None,
            children: Vec::new(),
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A root transform at `position`.
    pub fn at(position: FVec3) -> Self {
        Self {
            local_position: position,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: FQuat) -> Self {
        self.local_rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: FVec3) -> Self {
        self.local_scale = scale;
        self
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Children in attachment order.
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Map a point from this node's local space into its parent's space.
    pub fn local_to_parent(&self, point: FVec3) -> FVec3 {
        self.local_position + self.local_rotation * point.scale(self.local_scale)
    }

    /// Inverse of [`local_to_parent`](Self::local_to_parent). Zero scale
    /// components collapse to zero.
    pub fn parent_to_local(&self, point: FVec3) -> FVec3 {
        (self.local_rotation.inverse() * (point - self.local_position)).inverse_scale(self.local_scale)
    }

    /// Move by `delta` in parent space.
    pub fn translate(&mut self, delta: FVec3) {
        self.local_position += delta;
    }

    /// Apply `rotation` after the current local rotation.
    pub fn rotate(&mut self, rotation: FQuat) {
        self.local_rotation = (rotation * self.local_rotation).normalized();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let t = Transform::new();
        assert_eq!(t.local_position, FVec3::ZERO);
        assert_eq!(t.local_rotation, FQuat::IDENTITY);
        assert_eq!(t.local_scale, FVec3::ONE);
        assert!(t.parent().is_none());
        assert!(t.children().is_empty());
    }

    #[test]
    fn parent_to_local_inverts_local_to_parent() {
        let t = Transform::at(FVec3::from_ints(3, 0, 0)).with_scale(FVec3::from_ints(2, 2, 2));
        let p = FVec3::from_ints(1, 2, 0);
        let up = t.local_to_parent(p);
        assert_eq!(up, FVec3::from_ints(5, 4, 0));
        assert_eq!(t.parent_to_local(up), p);
    }
}
