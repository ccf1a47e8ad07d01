//! The collision pass and contact lifecycle.
//!
//! Once per step the world walks its physics-active entities with a
//! triangular double loop (each unordered pair once, in activation order),
//! skips ignored pairs, and tests every collider of one entity against every
//! collider of the other with [`test_pair`].
//!
//! Each collider remembers the partners it currently overlaps. Diffing that
//! record against this step's result gives the transition for the pair:
//!
//! | last step | this step | phase |
//! |-----------|-----------|-------|
//! | apart     | touching  | Enter |
//! | touching  | touching  | Stay  |
//! | touching  | apart     | Exit  |
//!
//! Contacts where either collider is a trigger go to the `on_overlap_*`
//! hooks of components advertising [`Capabilities::OVERLAP`]; the rest go to
//! the `on_hit_*` hooks of components advertising [`Capabilities::HIT`].
//! Every transition is also appended to the step's [`CollisionEvent`] log.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use rewind_ecs::collider::{test_pair, Placed};
use rewind_ecs::prelude::*;
use rewind_math::prelude::*;

use crate::world::World;

// ---------------------------------------------------------------------------
// IgnorePairs
// ---------------------------------------------------------------------------

/// Entity pairs exempt from collision testing. Order-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnorePairs {
    pairs: BTreeSet<(EntityId, EntityId)>,
}

fn ordered(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl IgnorePairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the pair was not already ignored.
    pub fn insert(&mut self, a: EntityId, b: EntityId) -> bool {
        self.pairs.insert(ordered(a, b))
    }

    pub fn remove(&mut self, a: EntityId, b: EntityId) -> bool {
        self.pairs.remove(&ordered(a, b))
    }

    pub fn contains(&self, a: EntityId, b: EntityId) -> bool {
        self.pairs.contains(&ordered(a, b))
    }

    /// Drop every pair that mentions `entity`.
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.pairs.retain(|(a, b)| *a != entity && *b != entity);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CollisionEvent
// ---------------------------------------------------------------------------

/// One contact transition, as seen from `contact.entity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub frame: u32,
    pub phase: ContactPhase,
    /// Either collider was a trigger.
    pub trigger: bool,
    pub contact: Collision,
}

impl CollisionEvent {
    /// Whether the event involves both `a` and `b`, in either role.
    pub fn between(&self, a: EntityId, b: EntityId) -> bool {
        let c = &self.contact;
        (c.entity == a && c.other == b) || (c.entity == b && c.other == a)
    }
}

/// A transition found while testing one entity pair.
struct PairContact {
    phase: ContactPhase,
    trigger: bool,
    /// From the first entity's side.
    contact: Collision,
    a_pushable: bool,
    b_pushable: bool,
}

/// The record handed to exit hooks: the pair is no longer touching, so
/// there is no geometry to report.
fn separated(entity: EntityId, collider: ColliderId, other: OverlapKey) -> Collision {
    Collision {
        entity,
        collider,
        other: other.entity,
        other_collider: other.collider,
        normal: FVec2::ZERO,
        contact: FVec2::ZERO,
        depth: Fixed::ZERO,
        separation: FVec2::ZERO,
    }
}

fn origin(entities: &Entities, id: EntityId) -> Option<FVec2> {
    entities.world_position(id).map(FVec3::xy)
}

// ---------------------------------------------------------------------------
// World collision pass
// ---------------------------------------------------------------------------

impl World {
    /// Step phase 6.
    pub(crate) fn collision_pass(&mut self) {
        let physics = self.physics.clone();
        for (row, &a) in physics.iter().enumerate() {
            for &b in &physics[row + 1..] {
                if self.ignore.contains(a, b) {
                    continue;
                }
                let contacts = self.test_entities(a, b);
                for pc in contacts {
                    self.apply_contact(pc);
                }
            }
        }
    }

    /// Every collider-vs-collider transition between `a` and `b`.
    fn test_entities(&self, a: EntityId, b: EntityId) -> Vec<PairContact> {
        let (Some(ea), Some(eb)) = (self.entities.core(a), self.entities.core(b)) else {
            return Vec::new();
        };
        if !ea.is_active() || !eb.is_active() || !ea.has_colliders() || !eb.has_colliders() {
            return Vec::new();
        }
        let (Some(oa), Some(ob)) = (origin(&self.entities, a), origin(&self.entities, b)) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for ca in ea.colliders() {
            for cb in eb.colliders() {
                let key = OverlapKey {
                    entity: b,
                    collider: cb.id(),
                };
                let was = ca.overlaps().contains(&key);
                let hit = test_pair(
                    Placed {
                        entity: a,
                        origin: oa,
                        collider: ca,
                    },
                    Placed {
                        entity: b,
                        origin: ob,
                        collider: cb,
                    },
                );
                let (phase, contact) = match (hit, was) {
                    (Some(c), false) => (ContactPhase::Enter, c),
                    (Some(c), true) => (ContactPhase::Stay, c),
                    (None, true) => (ContactPhase::Exit, separated(a, ca.id(), key)),
                    (None, false) => continue,
                };
                out.push(PairContact {
                    phase,
                    trigger: ca.is_trigger() || cb.is_trigger(),
                    contact,
                    a_pushable: ca.pushable,
                    b_pushable: cb.pushable,
                });
            }
        }
        out
    }

    fn apply_contact(&mut self, pc: PairContact) {
        let mine = pc.contact;
        let theirs = match pc.phase {
            ContactPhase::Exit => separated(
                mine.other,
                mine.other_collider,
                OverlapKey {
                    entity: mine.entity,
                    collider: mine.collider,
                },
            ),
            _ => mine.mirrored(pc.b_pushable, pc.a_pushable),
        };

        match pc.phase {
            ContactPhase::Enter => {
                self.link(&mine, true);
                self.link(&theirs, true);
            }
            ContactPhase::Exit => {
                self.link(&mine, false);
                self.link(&theirs, false);
            }
            ContactPhase::Stay => {}
        }

        self.notify(pc.phase, pc.trigger, mine);
        self.notify(pc.phase, pc.trigger, theirs);
    }

    /// Record or forget `c.other` in the overlap set of `c.collider`.
    fn link(&mut self, c: &Collision, touching: bool) {
        let key = OverlapKey {
            entity: c.other,
            collider: c.other_collider,
        };
        if let Some(collider) = self
            .entities
            .core_mut(c.entity)
            .and_then(|core| core.collider_mut(c.collider))
        {
            let set = collider.overlaps_mut();
            if touching {
                set.insert(key);
            } else {
                set.remove(&key);
            }
        }
    }

    /// Dispatch one side of a transition and log it.
    fn notify(&mut self, phase: ContactPhase, trigger: bool, contact: Collision) {
        trace!(
            frame = self.frame,
            entity = %contact.entity,
            other = %contact.other,
            ?phase,
            trigger,
            "contact"
        );
        let required = if trigger {
            Capabilities::OVERLAP
        } else {
            Capabilities::HIT
        };
        self.dispatch(contact.entity, required, |c, ctx| match (trigger, phase) {
            (false, ContactPhase::Enter) => c.on_hit_enter(&contact, ctx),
            (false, ContactPhase::Stay) => c.on_hit_stay(&contact, ctx),
            (false, ContactPhase::Exit) => c.on_hit_exit(&contact, ctx),
            (true, ContactPhase::Enter) => c.on_overlap_enter(&contact, ctx),
            (true, ContactPhase::Stay) => c.on_overlap_stay(&contact, ctx),
            (true, ContactPhase::Exit) => c.on_overlap_exit(&contact, ctx),
        });
        self.events.push(CollisionEvent {
            frame: self.frame,
            phase,
            trigger,
            contact,
        });
    }

    /// Clear every overlap record of `id` and emit Exit to each partner.
    pub(crate) fn release_overlaps(&mut self, id: EntityId) {
        let ids: Vec<ColliderId> = match self.entities.core(id) {
            Some(core) => core.colliders().iter().map(Collider::id).collect(),
            None => return,
        };
        for collider in ids {
            self.release_collider(id, collider);
        }
    }

    /// Clear the overlap record of one collider and emit Exit to each
    /// partner that still held it.
    fn release_collider(&mut self, id: EntityId, collider: ColliderId) {
        let Some(c) = self
            .entities
            .core_mut(id)
            .and_then(|core| core.collider_mut(collider))
        else {
            return;
        };
        let trigger_self = c.is_trigger();
        let partners = c.overlaps_mut().take();
        self.exit_partners(id, collider, trigger_self, partners);
    }

    fn exit_partners(
        &mut self,
        id: EntityId,
        collider: ColliderId,
        trigger_self: bool,
        partners: Vec<OverlapKey>,
    ) {
        let me = OverlapKey {
            entity: id,
            collider,
        };
        for partner in partners {
            let Some(pc) = self
                .entities
                .core_mut(partner.entity)
                .and_then(|core| core.collider_mut(partner.collider))
            else {
                continue;
            };
            pc.overlaps_mut().remove(&me);
            let trigger = trigger_self || pc.is_trigger();
            self.notify(
                ContactPhase::Exit,
                trigger,
                separated(partner.entity, partner.collider, me),
            );
        }
    }

    /// Remove a collider, emitting Exit to its partners. An entity left
    /// without colliders leaves the physics-active list.
    pub fn remove_collider(&mut self, id: EntityId, collider: ColliderId) -> Option<Collider> {
        let removed = self.entities.detach_collider(id, collider)?;
        let partners = removed.overlaps().iter().copied().collect();
        self.exit_partners(id, collider, removed.is_trigger(), partners);
        if !self.entities.core(id).is_some_and(EntityCore::has_colliders) {
            self.physics.retain(|e| *e != id);
        }
        Some(removed)
    }

    /// Silently drop overlap records between two entities.
    pub(crate) fn forget_pair(&mut self, a: EntityId, b: EntityId) {
        for (me, other) in [(a, b), (b, a)] {
            if let Some(core) = self.entities.core_mut(me) {
                for c in core.colliders_mut() {
                    c.overlaps_mut().remove_entity(other);
                }
            }
        }
    }
}
