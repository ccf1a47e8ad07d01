//! Deterministic replay with input recording and checkpoint verification.
//!
//! The replay system records [`InputFrame`]s and periodic state hash
//! checkpoints during simulation, producing a [`ReplayLog`]. The log can then
//! be replayed against a [`World`] to verify determinism: [`replay`] restores
//! the initial snapshot, feeds the recorded inputs frame by frame, and
//! compares state hashes at each checkpoint.
//!
//! # Recording
//!
//! ```
//! use rewind_engine::prelude::*;
//!
//! let mut world = World::new(WorldConfig::default());
//! let mut recorder = ReplayRecorder::new(&world, 10).unwrap(); // checkpoint every 10 frames
//!
//! for i in 0..100u32 {
//!     let input = InputFrame::new(i % 3, 0);
//!     let hash = world.state_hash().unwrap();
//!     recorder.record_frame(world.frame(), &input, Some(hash));
//!     world.step(&input);
//! }
//!
//! let log = recorder.finish();
//! let json = log.to_json().unwrap();
//!
//! // Replaying on a fresh world with the same setup reproduces every hash.
//! let mut fresh = World::new(WorldConfig::default());
//! let result = replay(&mut fresh, &ReplayLog::from_json(&json).unwrap()).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! assert_eq!(fresh.frame(), 100);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rewind_ecs::input::InputFrame;

use crate::world::World;
use crate::SnapshotError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A replay log that cannot be replayed.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("replay log contains duplicate input entries at frame {frame}")]
    DuplicateInput { frame: u32 },

    #[error("replay log contains duplicate checkpoint entries at frame {frame}")]
    DuplicateCheckpoint { frame: u32 },

    #[error("frame range overflow: start {start} + {total} frames exceeds u32::MAX")]
    FrameOverflow { start: u32, total: u32 },

    #[error("failed to restore or hash replay state: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("replay log is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A complete replay log: initial snapshot plus the ordered inputs and
/// checkpoints recorded after it.
///
/// Serializable to JSON for storage, transmission, or regression fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// World snapshot bytes captured at the start of recording.
    pub initial_snapshot: Vec<u8>,
    /// Frame counter of the initial snapshot.
    pub initial_frame: u32,
    /// Number of frames recorded. Replay executes exactly this many steps.
    pub total_frames: u32,
    pub entries: Vec<ReplayEntry>,
}

impl ReplayLog {
    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One entry of a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// Input fed to the step that starts at `frame`. Neutral frames are not
    /// recorded.
    Input { frame: u32, input: InputFrame },
    /// BLAKE3 hex digest of the world state at `frame`, before that step.
    Checkpoint { frame: u32, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The outcome of replaying a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Every recorded frame was replayed without divergence.
    pub completed: bool,
    pub frames_replayed: u32,
    /// The first checkpoint whose hash did not match.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Details about a determinism failure detected during replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub frame: u32,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a simulation run into a [`ReplayLog`].
///
/// Call [`record_frame`](Self::record_frame) before each step with the
/// input about to be applied; call [`finish`](Self::finish) to produce the
/// log.
#[derive(Debug)]
pub struct ReplayRecorder {
    log: ReplayLog,
    /// Checkpoint every this many frames; 0 means whenever a hash is given.
    checkpoint_interval: u32,
    last_frame: Option<u32>,
}

impl ReplayRecorder {
    /// Start recording from the world's current state.
    pub fn new(world: &World, checkpoint_interval: u32) -> Result<Self, SnapshotError> {
        Ok(Self {
            log: ReplayLog {
                initial_snapshot: world.save_state()?,
                initial_frame: world.frame(),
                total_frames: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            last_frame: None,
        })
    }

    /// Record the step starting at `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not strictly greater than the previous call's.
    pub fn record_frame(&mut self, frame: u32, input: &InputFrame, state_hash: Option<String>) {
        if let Some(prev) = self.last_frame {
            assert!(
                frame > prev,
                "ReplayRecorder::record_frame: frame {frame} is not strictly greater than previous frame {prev}"
            );
        }
        self.last_frame = Some(frame);
        self.log.total_frames += 1;

        if *input != InputFrame::default() {
            self.log.entries.push(ReplayEntry::Input {
                frame,
                input: *input,
            });
        }

        if let Some(hash) = state_hash {
            let due = self.checkpoint_interval == 0 || frame % self.checkpoint_interval == 0;
            if due {
                self.log.entries.push(ReplayEntry::Checkpoint {
                    frame,
                    state_hash: hash,
                });
            }
        }
    }

    pub fn finish(self) -> ReplayLog {
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `world`, verifying every checkpoint.
///
/// The log is validated before the world is touched, so on a validation
/// error the world is unmodified. The world must have the same entities,
/// components and registered names as the recording world. Replay stops at
/// the first divergence.
pub fn replay(world: &mut World, log: &ReplayLog) -> Result<ReplayResult, ReplayError> {
    let mut inputs: BTreeMap<u32, InputFrame> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u32, &str> = BTreeMap::new();
    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { frame, input } => {
                if inputs.insert(*frame, *input).is_some() {
                    return Err(ReplayError::DuplicateInput { frame: *frame });
                }
            }
            ReplayEntry::Checkpoint { frame, state_hash } => {
                if checkpoints.insert(*frame, state_hash).is_some() {
                    return Err(ReplayError::DuplicateCheckpoint { frame: *frame });
                }
            }
        }
    }

    let start = log.initial_frame;
    let end = start
        .checked_add(log.total_frames)
        .ok_or(ReplayError::FrameOverflow {
            start,
            total: log.total_frames,
        })?;

    world.load_state(&log.initial_snapshot)?;

    let mut frames_replayed = 0;
    for frame in start..end {
        if let Some(expected) = checkpoints.get(&frame) {
            let actual = world.state_hash()?;
            if actual != *expected {
                warn!(frame, expected = %expected, actual = %actual, "replay diverged");
                return Ok(ReplayResult {
                    completed: false,
                    frames_replayed,
                    first_divergence: Some(ReplayDivergence {
                        frame,
                        expected_hash: (*expected).to_owned(),
                        actual_hash: actual,
                    }),
                });
            }
        }
        let input = inputs.get(&frame).copied().unwrap_or_default();
        world.step(&input);
        frames_replayed += 1;
    }

    debug!(frames = frames_replayed, "replay complete");
    Ok(ReplayResult {
        completed: true,
        frames_replayed,
        first_divergence: None,
    })
}
