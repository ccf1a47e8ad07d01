//! Byte-exact world snapshots for rollback.
//!
//! [`World::save_state`] writes everything a step can change, in a fixed
//! order, through the fixed-width [`StateWriter`]:
//!
//! ```text
//! frame u32 · elapsed Fixed · input state · rng state · allocator state
//! · active order · physics-active order · pending begins · queued commands
//! · ignore pairs · scheduler registry · entity count u32
//! · per entity: EntityId · active bool · length-prefixed entity bytes
//! ```
//!
//! Entity bytes are the entity's name, active flag, colliders (with their
//! overlap records), transform, then each component as a name tag plus a
//! length-prefixed state blob.
//!
//! [`World::load_state`] is the exact inverse, so
//! `save → load → save` yields identical bytes.
//!
//! # What Is NOT Serialized
//!
//! - **Action table and pre-step hooks** -- code, not state. Every peer must
//!   register the same names with the same functions.
//! - **Components themselves** -- a snapshot restores component *state*
//!   onto the components an entity already has. Spawning and despawning are
//!   setup-time operations outside the rollback window.
//! - **Collision event log** -- per-step output, cleared on restore.
//! - **Configuration** -- `fixed_dt` is fixed for the life of a world.

use tracing::{debug, warn};

use rewind_ecs::prelude::*;
use rewind_math::prelude::*;

use crate::collision::IgnorePairs;
use crate::world::World;
use crate::SnapshotError;

/// 64-bit desync checksum of snapshot bytes: the first eight bytes of their
/// BLAKE3 digest, little-endian.
pub fn checksum_of(bytes: &[u8]) -> u64 {
    let digest = blake3::hash(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

/// BLAKE3 hex digest (64 lowercase hex chars) of snapshot bytes.
pub fn hash_of(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Everything in a snapshot ahead of the entity records.
struct Header {
    frame: u32,
    elapsed: Fixed,
    input: InputState,
    rng: SimRng,
    allocator: AllocatorState,
    active: Vec<EntityId>,
    physics: Vec<EntityId>,
    pending_begin: Vec<EntityId>,
    commands: CommandQueue,
    ignore: IgnorePairs,
    scheduler: Scheduler,
}

struct EntityRecord<'a> {
    id: EntityId,
    active: bool,
    bytes: &'a [u8],
}

fn read_snapshot(bytes: &[u8]) -> Result<(Header, Vec<EntityRecord<'_>>), SnapshotError> {
    let mut r = StateReader::new(bytes);
    let header = Header {
        frame: r.read()?,
        elapsed: r.read()?,
        input: r.read()?,
        rng: r.read()?,
        allocator: r.read()?,
        active: r.read()?,
        physics: r.read()?,
        pending_begin: r.read()?,
        commands: r.read()?,
        ignore: r.read()?,
        scheduler: r.read()?,
    };
    let count = r.read::<u32>()? as usize;
    let mut records = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        records.push(EntityRecord {
            id: r.read()?,
            active: r.read()?,
            bytes: r.read_blob()?,
        });
    }
    if !r.is_exhausted() {
        return Err(SnapshotError::TrailingBytes {
            remaining: r.remaining(),
        });
    }
    Ok((header, records))
}

// ---------------------------------------------------------------------------
// World save/restore methods
// ---------------------------------------------------------------------------

impl World {
    /// Serialize the complete simulation state.
    pub fn save_state(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut out = StateWriter::with_capacity(512);
        out.write(&self.frame)?;
        out.write(&self.elapsed)?;
        out.write(&self.input)?;
        out.write(&self.rng)?;
        out.write(&self.entities.allocator_state())?;
        out.write(&self.active)?;
        out.write(&self.physics)?;
        out.write(&self.pending_begin)?;
        out.write(&self.commands)?;
        out.write(&self.ignore)?;
        out.write(&self.scheduler)?;
        out.write(&(self.entities.len() as u32))?;
        for (id, entity) in self.entities.iter() {
            out.write(&id)?;
            out.write(&entity.is_active())?;
            out.write_section(|s| entity.save(s))?;
        }
        Ok(out.finish())
    }

    /// Restore state written by [`save_state`](Self::save_state).
    ///
    /// Every entity the snapshot lists must still exist; entities that
    /// exist but are not listed are despawned. Restore is all-or-nothing:
    /// on error the world is left exactly as it was.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Codec`] / [`SnapshotError::TrailingBytes`] for
    /// truncated or garbled bytes (including a component layout that does
    /// not match the entity's components), [`SnapshotError::MissingEntity`]
    /// when a listed entity is gone.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let (header, records) = read_snapshot(bytes)?;
        if let Some(r) = records.iter().find(|r| !self.entities.contains(r.id)) {
            return Err(SnapshotError::MissingEntity { entity: r.id });
        }

        let backup = self.save_state()?;
        if let Err(e) = self.load_entities(&records) {
            warn!(frame = header.frame, error = %e, "entity restore failed, reverting");
            let (_, previous) = read_snapshot(&backup)?;
            self.load_entities(&previous)?;
            return Err(e);
        }

        let listed: Vec<EntityId> = records.iter().map(|r| r.id).collect();
        let mut despawned = 0;
        for id in self.entities.ids() {
            if listed.contains(&id) {
                continue;
            }
            // The arena despawn skips lifecycle hooks and events: the entity
            // never existed at the restored frame.
            if let Ok(entity) = self.entities.despawn(id) {
                debug!(entity = %id, name = %entity.name(), "despawned entity absent from snapshot");
                despawned += 1;
            }
        }
        if despawned > 0 {
            // Despawning unlinks hierarchy neighbours; put the restored
            // links back.
            self.load_entities(&records)?;
        }

        self.entities.restore_allocator(header.allocator);
        self.frame = header.frame;
        self.elapsed = header.elapsed;
        self.input = header.input;
        self.rng = header.rng;
        self.active = header.active;
        self.physics = header.physics;
        self.pending_begin = header.pending_begin;
        self.commands = header.commands;
        self.ignore = header.ignore;
        self.scheduler = header.scheduler;
        self.events.clear();

        debug!(frame = self.frame, entities = records.len(), "state restored");
        Ok(())
    }

    fn load_entities(&mut self, records: &[EntityRecord<'_>]) -> Result<(), SnapshotError> {
        for record in records {
            let entity = self
                .entities
                .get_mut(record.id)
                .ok_or(SnapshotError::MissingEntity { entity: record.id })?;
            entity.load(&mut StateReader::new(record.bytes))?;
            entity.core_mut().set_active(record.active);
        }
        Ok(())
    }

    /// 64-bit desync checksum of the current state.
    pub fn checksum(&self) -> Result<u64, SnapshotError> {
        Ok(checksum_of(&self.save_state()?))
    }

    /// BLAKE3 hex digest of the current state.
    pub fn state_hash(&self) -> Result<String, SnapshotError> {
        Ok(hash_of(&self.save_state()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldConfig;

    #[derive(Debug, Default)]
    struct Marker;

    impl Component for Marker {
        fn name(&self) -> &'static str {
            "marker"
        }
    }

    fn mover(world: &mut World, x: i64) -> EntityId {
        let id = world.spawn(
            Entity::new("mover")
                .at(FVec3::from_ints(x, 0, 0))
                .with_collider(Collider::solid_box(FVec2::ONE))
                .with_component(KinematicBody::new(FVec3::RIGHT)),
        );
        world.activate(id);
        id
    }

    #[test]
    fn save_load_save_is_byte_identical() {
        let mut world = World::new(WorldConfig::default());
        mover(&mut world, 0);
        mover(&mut world, 3);
        world.run_frames(5);
        let bytes = world.save_state().unwrap();
        world.run_frames(5);
        world.load_state(&bytes).unwrap();
        assert_eq!(world.frame(), 5);
        assert_eq!(world.save_state().unwrap(), bytes);
    }

    #[test]
    fn snapshot_starts_with_frame() {
        let mut world = World::new(WorldConfig::default());
        world.run_frames(7);
        let bytes = world.save_state().unwrap();
        assert_eq!(&bytes[..4], &7u32.to_le_bytes());
    }

    #[test]
    fn truncated_snapshot_leaves_world_untouched() {
        let mut world = World::new(WorldConfig::default());
        mover(&mut world, 0);
        world.run_frames(2);
        let bytes = world.save_state().unwrap();
        world.run_frames(2);
        let before = world.save_state().unwrap();

        let err = world.load_state(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, SnapshotError::Codec(_)), "{err}");
        assert_eq!(world.save_state().unwrap(), before);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut world = World::new(WorldConfig::default());
        let mut bytes = world.save_state().unwrap();
        bytes.push(0);
        assert!(matches!(
            world.load_state(&bytes),
            Err(SnapshotError::TrailingBytes { remaining: 1 })
        ));
    }

    #[test]
    fn missing_entity_is_reported() {
        let mut world = World::new(WorldConfig::default());
        let a = mover(&mut world, 0);
        let bytes = world.save_state().unwrap();
        world.despawn(a).unwrap();
        assert!(matches!(
            world.load_state(&bytes),
            Err(SnapshotError::MissingEntity { entity }) if entity == a
        ));
    }

    #[test]
    fn entities_absent_from_snapshot_are_despawned() {
        let mut world = World::new(WorldConfig::default());
        mover(&mut world, 0);
        let bytes = world.save_state().unwrap();
        let late = mover(&mut world, 5);
        world.load_state(&bytes).unwrap();
        assert!(world.get(late).is_none());
        assert_eq!(world.entities().len(), 1);
        assert_eq!(world.save_state().unwrap(), bytes);
    }

    #[test]
    fn component_mismatch_reverts() {
        let mut source = World::new(WorldConfig::default());
        mover(&mut source, 0);
        let bytes = source.save_state().unwrap();

        let mut target = World::new(WorldConfig::default());
        target.spawn(
            Entity::new("mover")
                .with_collider(Collider::solid_box(FVec2::ONE))
                .with_component(Marker),
        );
        target.run_frames(3);
        let before = target.save_state().unwrap();

        let err = target.load_state(&bytes).unwrap_err();
        assert!(
            matches!(err, SnapshotError::Codec(CodecError::TagMismatch { .. })),
            "{err}"
        );
        assert_eq!(target.save_state().unwrap(), before);
    }

    #[test]
    fn checksum_tracks_state() {
        let mut world = World::new(WorldConfig::default());
        mover(&mut world, 0);
        let c0 = world.checksum().unwrap();
        assert_eq!(world.checksum().unwrap(), c0);
        world.run_frames(1);
        assert_ne!(world.checksum().unwrap(), c0);
        assert_eq!(world.state_hash().unwrap().len(), 64);
    }
}
