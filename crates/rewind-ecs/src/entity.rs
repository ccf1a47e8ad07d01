//! Entity handles.
//!
//! [`EntityId`] packs a slot index (low half) and the slot's generation (high
//! half) into one `u64`. Retiring a slot bumps its generation, so a handle
//! held past despawn stops resolving rather than pointing at whatever took
//! the slot next.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Generational handle to an entity in a world's store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// Slot in the store this handle points at.
    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 & u32::MAX as u64) as u32
    }

    /// How many times the slot had been recycled when this handle was issued.
    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One slot of the id table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub generation: u32,
    pub occupied: bool,
}

/// Id table as written into a rollback snapshot. Restoring it makes later
/// spawns hand out the same ids the original timeline did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorState {
    pub slots: Vec<Slot>,
    /// Retired slot indices, oldest first.
    pub free: Vec<u32>,
}

/// Hands out [`EntityId`]s, reusing retired slots oldest-first.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    slots: Vec<Slot>,
    free: VecDeque<u32>,
    live: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityId {
        self.live += 1;
        let index = match self.free.pop_front() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.occupied = true;
        EntityId::new(index, slot.generation)
    }

    /// Retire `id`. Returns `false` for a handle that is already stale.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        match self.slot_for(id) {
            Some(slot) => {
                slot.occupied = false;
                slot.generation = slot.generation.wrapping_add(1);
            }
            None => return false,
        }
        self.free.push_back(id.index());
        self.live -= 1;
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slots
            .get(id.index() as usize)
            .is_some_and(|s| s.occupied && s.generation == id.generation())
    }

    pub fn alive_count(&self) -> usize {
        self.live
    }

    /// Current handle for an occupied slot.
    pub fn id_at(&self, index: u32) -> Option<EntityId> {
        let slot = self.slots.get(index as usize)?;
        slot.occupied.then(|| EntityId::new(index, slot.generation))
    }

    pub fn state(&self) -> AllocatorState {
        AllocatorState {
            slots: self.slots.clone(),
            free: self.free.iter().copied().collect(),
        }
    }

    pub fn from_state(state: AllocatorState) -> Self {
        let live = state.slots.iter().filter(|s| s.occupied).count();
        Self {
            slots: state.slots,
            free: state.free.into(),
            live,
        }
    }

    fn slot_for(&mut self, id: EntityId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|s| s.occupied && s.generation == id.generation())
    }
}
