//! Deferred structural changes.
//!
//! Hooks run while the world is iterating its entity lists, so they never
//! change those lists directly. Instead they queue a [`Command`] in the
//! [`CommandQueue`]; the world flushes the queue in FIFO order at the start
//! of the next step, before any entity ticks.
//!
//! The queue is part of rollback state: a command issued on frame `N` and
//! flushed on frame `N + 1` must still be pending if frame `N` is restored.

use serde::{Deserialize, Serialize};

use crate::collider::{Collider, ColliderId};
use crate::entity::EntityId;

/// A single deferred mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Mark the entity active; it receives `begin` on the next tick phase.
    Activate(EntityId),
    /// Run `end`, emit exits for live overlaps, and drop it from the
    /// active lists.
    Deactivate(EntityId),
    /// Attach a collider whose id the entity already reserved. An active
    /// entity joins the physics-active list if it was not on it.
    AddCollider { entity: EntityId, collider: Collider },
    /// Remove one collider, emitting exits for its live overlaps.
    RemoveCollider { entity: EntityId, collider: ColliderId },
    /// Enable or disable a collider without removing it.
    SetColliderEnabled {
        entity: EntityId,
        collider: ColliderId,
        enabled: bool,
    },
    /// Exempt a pair of entities from collision testing.
    IgnorePair(EntityId, EntityId),
    /// Lift a previous exemption.
    UnignorePair(EntityId, EntityId),
}

impl Command {
    /// The entity the command acts on, if it targets exactly one.
    pub fn target(&self) -> Option<EntityId> {
        match *self {
            Command::Activate(e) | Command::Deactivate(e) => Some(e),
            Command::AddCollider { entity, .. }
            | Command::RemoveCollider { entity, .. }
            | Command::SetColliderEnabled { entity, .. } => Some(entity),
            Command::IgnorePair(..) | Command::UnignorePair(..) => None,
        }
    }
}

/// FIFO queue of deferred commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn activate(&mut self, entity: EntityId) {
        self.push(Command::Activate(entity));
    }

    pub fn deactivate(&mut self, entity: EntityId) {
        self.push(Command::Deactivate(entity));
    }

    pub fn add_collider(&mut self, entity: EntityId, collider: Collider) {
        self.push(Command::AddCollider { entity, collider });
    }

    pub fn remove_collider(&mut self, entity: EntityId, collider: ColliderId) {
        self.push(Command::RemoveCollider { entity, collider });
    }

    pub fn set_collider_enabled(&mut self, entity: EntityId, collider: ColliderId, enabled: bool) {
        self.push(Command::SetColliderEnabled {
            entity,
            collider,
            enabled,
        });
    }

    pub fn ignore_pair(&mut self, a: EntityId, b: EntityId) {
        self.push(Command::IgnorePair(a, b));
    }

    pub fn unignore_pair(&mut self, a: EntityId, b: EntityId) {
        self.push(Command::UnignorePair(a, b));
    }

    /// Queued commands in insertion order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take every queued command, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_fifo_order() {
        let a = EntityId::new(0, 0);
        let b = EntityId::new(1, 0);
        let mut q = CommandQueue::new();
        q.deactivate(a);
        q.ignore_pair(a, b);
        q.activate(b);

        let drained = q.drain();
        assert_eq!(
            drained,
            vec![Command::Deactivate(a), Command::IgnorePair(a, b), Command::Activate(b)]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn target_of_pair_commands_is_none() {
        let a = EntityId::new(0, 0);
        assert_eq!(Command::IgnorePair(a, a).target(), None);
        assert_eq!(Command::Activate(a).target(), Some(a));
        assert_eq!(
            Command::RemoveCollider {
                entity: a,
                collider: ColliderId(2)
            }
            .target(),
            Some(a)
        );
    }
}
