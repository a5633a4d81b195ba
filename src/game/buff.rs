//! Buffs
//!
//! Time-boxed motion overrides. While a buff is active it dictates the
//! character's horizontal velocity and cancels gravity for that tick.
//! The buff's direction is captured at creation and never follows later
//! turns.

use serde::{Serialize, Deserialize};

use crate::game::bus::CharacterId;
use crate::game::events::Facing;

/// Dash buff starting speed
pub const DASH_BUFF_SPEED: f32 = 30.0;

/// Dash buff per-tick speed decay
pub const DASH_BUFF_DECAY: f32 = 0.9;

/// Dash buff lifetime in ticks
pub const DASH_BUFF_TICKS: u32 = 9;

/// Buff variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffKind {
    /// Forced horizontal burst after a dash
    Dashing,
}

/// An active buff bound to one character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    /// Variant
    pub kind: BuffKind,
    /// Owner
    pub character: CharacterId,
    /// Facing captured at creation
    pub direction: Facing,
    /// Current forced speed
    pub speed: f32,
    /// Ticks of force left
    pub duration: u32,
}

impl Buff {
    /// Dash burst toward `direction`.
    pub fn dashing(character: CharacterId, direction: Facing) -> Self {
        Self {
            kind: BuffKind::Dashing,
            character,
            direction,
            speed: DASH_BUFF_SPEED,
            duration: DASH_BUFF_TICKS,
        }
    }

    /// Apply one tick of force. Returns false once expired.
    pub fn apply(&mut self, dx: &mut f32, gravity: &mut f32) -> bool {
        if self.duration == 0 {
            return false;
        }
        self.duration -= 1;
        match self.kind {
            BuffKind::Dashing => {
                *dx = self.speed * self.direction.sign();
                *gravity = 0.0;
                self.speed *= DASH_BUFF_DECAY;
            }
        }
        true
    }

    /// No force left.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.duration == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bus::ListenerId;

    #[test]
    fn test_dash_buff_decays() {
        let mut buff = Buff::dashing(ListenerId(1), Facing::Left);
        let (mut dx, mut gravity) = (0.0, 3.0);

        assert!(buff.apply(&mut dx, &mut gravity));
        assert_eq!(dx, -30.0);
        assert_eq!(gravity, 0.0);

        assert!(buff.apply(&mut dx, &mut gravity));
        assert!((dx - (-27.0)).abs() < 1e-4);
        assert_eq!(buff.duration, 7);
    }

    #[test]
    fn test_dash_buff_expires_after_nine_ticks() {
        let mut buff = Buff::dashing(ListenerId(1), Facing::Right);
        let (mut dx, mut gravity) = (0.0, 0.0);
        for _ in 0..9 {
            assert!(buff.apply(&mut dx, &mut gravity));
            assert!(dx > 0.0);
        }
        assert!(buff.is_expired());

        dx = 1.5;
        assert!(!buff.apply(&mut dx, &mut gravity));
        assert_eq!(dx, 1.5);
    }
}
