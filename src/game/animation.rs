//! Animation Selection
//!
//! Maps motion state and facing to an animation cell name through lookup
//! tables. The renderer owns the actual images.

use serde::{Serialize, Deserialize};

use crate::game::character::MotionState;
use crate::game::events::Facing;

/// Frames in the walk cycle.
pub const WALK_FRAMES: u8 = 5;

/// Ticks per walk frame.
pub const WALK_FRAME_TICKS: u32 = 5;

/// Animation strips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnimationKind {
    /// Standing
    Idle = 0,
    /// Walk cycle
    Walk = 1,
    /// Airborne jump pose
    Jump = 2,
    /// Clinging to a wall
    OnWall = 3,
    /// Punch
    Punch = 4,
    /// Dash and pounce
    Dash = 5,
}

/// Animation for each motion state, indexed by [`MotionState`] discriminant.
const STATE_ANIMATIONS: [AnimationKind; 7] = [
    AnimationKind::Idle,   // Idle
    AnimationKind::Walk,   // Walking
    AnimationKind::Jump,   // Jumping
    AnimationKind::OnWall, // OnWall
    AnimationKind::Punch,  // Punching
    AnimationKind::Dash,   // Dashing
    AnimationKind::Dash,   // Pouncing
];

/// Cell names, indexed by `[AnimationKind][Facing]` (left, right).
const CELL_NAMES: [[&str; 2]; 6] = [
    ["idleLeft", "idleRight"],
    ["walkLeft", "walkRight"],
    ["jumpLeft", "jumpRight"],
    ["onwallLeft", "onwallRight"],
    ["punchLeft", "punchRight"],
    ["dashLeft", "dashRight"],
];

impl AnimationKind {
    /// Animation for a state. Walking in the air shows the idle pose.
    pub fn for_state(state: MotionState, in_air: bool) -> Self {
        if state == MotionState::Walking && in_air {
            return AnimationKind::Idle;
        }
        STATE_ANIMATIONS[state as usize]
    }

    /// Renderer cell name for this strip and facing.
    pub fn cell_name(self, facing: Facing) -> &'static str {
        let column = match facing {
            Facing::Left => 0,
            Facing::Right => 1,
        };
        CELL_NAMES[self as usize][column]
    }
}

/// Walk cycle counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkCycle {
    /// Ticks spent walking
    pub ticks: u32,
    /// Frame shown this tick
    pub frame: u8,
}

impl Default for WalkCycle {
    fn default() -> Self {
        Self { ticks: 0, frame: WALK_FRAMES - 1 }
    }
}

impl WalkCycle {
    /// Frame to show now, then advance.
    ///
    /// The first tick of a walk shows the last frame, then the cycle wraps
    /// to 0; after that it advances every [`WALK_FRAME_TICKS`] ticks.
    pub fn step(&mut self) -> u8 {
        let shown = self.frame;
        if self.ticks % WALK_FRAME_TICKS == 0 {
            self.frame = (self.frame + 1) % WALK_FRAMES;
        }
        self.ticks += 1;
        shown
    }

    /// Back to the start of the cycle.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
