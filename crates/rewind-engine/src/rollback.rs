//! A fixed-capacity ring of per-frame snapshots for rollback transports.
//!
//! A peer saves the world after every confirmed or predicted step. When a
//! remote input for an earlier frame arrives and differs from the
//! prediction, the transport loads that frame's snapshot and resimulates
//! forward with the corrected inputs:
//!
//! ```
//! use rewind_engine::prelude::*;
//!
//! let mut world = World::new(WorldConfig::default());
//! let mut ring = SnapshotRing::new(8);
//! ring.save(&world).unwrap();
//!
//! // Predict three frames with the remote player idle.
//! let mut inputs = vec![InputFrame::new(Buttons::RIGHT.0, 0); 3];
//! for input in &inputs {
//!     world.step(input);
//!     ring.save(&world).unwrap();
//! }
//!
//! // Frame 2's remote input turns out to be LEFT: rewind and replay.
//! inputs[1].masks[1] = Buttons::LEFT.0;
//! ring.resimulate(&mut world, 0, &inputs).unwrap();
//! assert_eq!(world.frame(), 3);
//! ```

use std::collections::VecDeque;

use tracing::debug;

use rewind_ecs::input::InputFrame;

use crate::snapshot::checksum_of;
use crate::world::World;
use crate::SnapshotError;

/// One saved frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    /// The world's frame counter when saved.
    pub frame: u32,
    pub bytes: Vec<u8>,
    /// [`checksum_of`] the bytes, for desync comparison with peers.
    pub checksum: u64,
}

/// The most recent `capacity` snapshots, oldest first.
#[derive(Debug, Clone)]
pub struct SnapshotRing {
    slots: VecDeque<FrameSnapshot>,
    capacity: usize,
}

impl SnapshotRing {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "snapshot ring capacity must be positive");
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Save the world's current frame, evicting the oldest snapshot when
    /// full. Saving a frame that is already held replaces it and drops
    /// every later frame, which belonged to a timeline that no longer
    /// exists. Returns the checksum.
    pub fn save(&mut self, world: &World) -> Result<u64, SnapshotError> {
        let bytes = world.save_state()?;
        let checksum = checksum_of(&bytes);
        let frame = world.frame();
        if let Some(pos) = self.position(frame) {
            self.slots.truncate(pos);
        }
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
        }
        self.slots.push_back(FrameSnapshot {
            frame,
            bytes,
            checksum,
        });
        Ok(checksum)
    }

    fn position(&self, frame: u32) -> Option<usize> {
        self.slots.iter().position(|s| s.frame == frame)
    }

    pub fn get(&self, frame: u32) -> Option<&FrameSnapshot> {
        self.slots.iter().find(|s| s.frame == frame)
    }

    pub fn checksum(&self, frame: u32) -> Option<u64> {
        self.get(frame).map(|s| s.checksum)
    }

    /// Restore `world` to `frame`, verifying the stored checksum first.
    pub fn load(&self, world: &mut World, frame: u32) -> Result<(), SnapshotError> {
        let snapshot = self
            .get(frame)
            .ok_or(SnapshotError::FrameNotRetained { frame })?;
        let actual = checksum_of(&snapshot.bytes);
        if actual != snapshot.checksum {
            return Err(SnapshotError::HashMismatch {
                frame,
                expected: snapshot.checksum,
                actual,
            });
        }
        world.load_state(&snapshot.bytes)?;
        debug!(frame, "rolled back");
        Ok(())
    }

    /// Load `frame`, then step once per entry of `inputs`, saving after
    /// every step so the ring holds the corrected timeline.
    pub fn resimulate(
        &mut self,
        world: &mut World,
        frame: u32,
        inputs: &[InputFrame],
    ) -> Result<(), SnapshotError> {
        self.load(world, frame)?;
        for input in inputs {
            world.step(input);
            self.save(world)?;
        }
        debug!(from = frame, to = world.frame(), "resimulated");
        Ok(())
    }

    pub fn oldest_frame(&self) -> Option<u32> {
        self.slots.front().map(|s| s.frame)
    }

    pub fn latest_frame(&self) -> Option<u32> {
        self.slots.back().map(|s| s.frame)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
