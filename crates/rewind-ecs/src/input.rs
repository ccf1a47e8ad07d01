//! Per-step player input.
//!
//! Each peer contributes one raw `u32` button mask per step. The world
//! resolves both masks, plus a disconnect bitfield, into an authoritative
//! [`InputState`] before any scheduled action or collision runs.

use serde::{Deserialize, Serialize};

/// Number of peers in a match.
pub const PLAYER_COUNT: usize = 2;

/// Button bitmask for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Buttons(pub u32);

impl Buttons {
    pub const NONE: Self = Self(0);
    pub const UP: Self = Self(1 << 0);
    pub const DOWN: Self = Self(1 << 1);
    pub const LEFT: Self = Self(1 << 2);
    pub const RIGHT: Self = Self(1 << 3);
    pub const PRIMARY: Self = Self(1 << 4);
    pub const SECONDARY: Self = Self(1 << 5);
    pub const SPECIAL: Self = Self(1 << 6);
    pub const START: Self = Self(1 << 7);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for Buttons {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for Buttons {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// What the step entry point receives: both players' raw masks and a
/// disconnect bitfield (bit `n` set means player `n` is gone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputFrame {
    pub masks: [u32; PLAYER_COUNT],
    pub disconnected: u32,
}

impl InputFrame {
    pub fn new(p0: u32, p1: u32) -> Self {
        Self {
            masks: [p0, p1],
            disconnected: 0,
        }
    }

    pub fn with_disconnected(mut self, flags: u32) -> Self {
        self.disconnected = flags;
        self
    }
}

/// Resolved input for the current step plus the previous step's masks for
/// edge detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    current: [Buttons; PLAYER_COUNT],
    previous: [Buttons; PLAYER_COUNT],
    disconnected: u32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll the current masks into history and take new ones. A
    /// disconnected player resolves to a neutral mask.
    pub fn resolve(&mut self, frame: &InputFrame) {
        self.previous = self.current;
        self.disconnected = frame.disconnected;
        for (player, raw) in frame.masks.iter().enumerate() {
            self.current[player] = if self.is_connected(player) {
                Buttons(*raw)
            } else {
                Buttons::NONE
            };
        }
    }

    pub fn is_connected(&self, player: usize) -> bool {
        self.disconnected & (1 << player) == 0
    }

    /// Resolved mask for `player`. Out-of-range players read as neutral.
    pub fn buttons(&self, player: usize) -> Buttons {
        self.current.get(player).copied().unwrap_or_default()
    }

    pub fn held(&self, player: usize, buttons: Buttons) -> bool {
        self.buttons(player).contains(buttons)
    }

    pub fn just_pressed(&self, player: usize, buttons: Buttons) -> bool {
        let prev = self.previous.get(player).copied().unwrap_or_default();
        self.buttons(player).contains(buttons) && !prev.contains(buttons)
    }

    pub fn just_released(&self, player: usize, buttons: Buttons) -> bool {
        let prev = self.previous.get(player).copied().unwrap_or_default();
        !self.buttons(player).contains(buttons) && prev.contains(buttons)
    }
}

/// Supplies per-player input once per step.
///
/// `poll` is asked for the masks of `frame`; `apply` is told what the world
/// actually resolved, so a rollback transport can compare predictions.
pub trait InputSource {
    fn poll(&mut self, frame: u32) -> InputFrame;

    fn apply(&mut self, _frame: u32, _resolved: &InputState) {}
}

/// Replays a prerecorded list of frames, then neutral input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    frames: Vec<InputFrame>,
}

impl ScriptedInput {
    pub fn new(frames: Vec<InputFrame>) -> Self {
        Self { frames }
    }
}

impl InputSource for ScriptedInput {
    /// Frames are 1-based: the first step polls frame 1.
    fn poll(&mut self, frame: u32) -> InputFrame {
        frame
            .checked_sub(1)
            .and_then(|i| self.frames.get(i as usize))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_detected_across_steps() {
        let mut input = InputState::new();
        input.resolve(&InputFrame::new(Buttons::PRIMARY.0, 0));
        assert!(input.held(0, Buttons::PRIMARY));
        assert!(input.just_pressed(0, Buttons::PRIMARY));

        input.resolve(&InputFrame::new(Buttons::PRIMARY.0, 0));
        assert!(input.held(0, Buttons::PRIMARY));
        assert!(!input.just_pressed(0, Buttons::PRIMARY));

        input.resolve(&InputFrame::new(0, 0));
        assert!(input.just_released(0, Buttons::PRIMARY));
    }

    #[test]
    fn disconnected_player_is_neutral() {
        let mut input = InputState::new();
        let frame = InputFrame::new(0xFF, 0xFF).with_disconnected(0b10);
        input.resolve(&frame);
        assert_eq!(input.buttons(0), Buttons(0xFF));
        assert_eq!(input.buttons(1), Buttons::NONE);
        assert!(!input.is_connected(1));
    }

    #[test]
    fn out_of_range_player_reads_neutral() {
        let input = InputState::new();
        assert_eq!(input.buttons(5), Buttons::NONE);
    }

    #[test]
    fn scripted_input_is_one_based() {
        let mut src = ScriptedInput::new(vec![InputFrame::new(1, 2)]);
        assert_eq!(src.poll(0), InputFrame::default());
        assert_eq!(src.poll(1), InputFrame::new(1, 2));
        assert_eq!(src.poll(2), InputFrame::default());
    }
}
