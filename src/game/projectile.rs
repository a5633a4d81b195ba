//! Projectiles
//!
//! A thrown knife flies on a shallow gravity arc and lives for a fixed number
//! of ticks. Death is terminal: once `ttl` reaches 0 it never comes back.

use serde::{Serialize, Deserialize};

use crate::core::{Rect, Vec2};
use crate::game::events::Facing;

/// Knife size
pub const KNIFE_SIZE: Vec2 = Vec2::new(16.0, 6.0);

/// Knife horizontal speed
pub const KNIFE_SPEED: f32 = 16.0;

/// Knife initial vertical speed (slightly upward)
pub const KNIFE_LIFT: f32 = -0.6;

/// Knife gravity per tick
pub const KNIFE_GRAVITY: f32 = 0.08;

/// Knife lifetime in ticks
pub const KNIFE_TTL: i32 = 30;

/// Knife damage
pub const KNIFE_DAMAGE: u32 = 10;

/// Level-assigned projectile handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// A live projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Assigned when the level accepts it
    pub id: ProjectileId,
    /// Top-left position
    pub pos: Vec2,
    /// Size
    pub size: Vec2,
    /// Horizontal velocity
    pub dx: f32,
    /// Vertical velocity
    pub dy: f32,
    /// Added to `dy` every tick
    pub gravity: f32,
    /// Damage on hit
    pub damage: u32,
    /// Ticks left to live
    pub ttl: i32,
}

impl Projectile {
    /// A thrown knife at `pos` flying toward `facing`.
    pub fn knife(pos: Vec2, facing: Facing) -> Self {
        Self {
            id: ProjectileId::default(),
            pos,
            size: KNIFE_SIZE,
            dx: KNIFE_SPEED * facing.sign(),
            dy: KNIFE_LIFT,
            gravity: KNIFE_GRAVITY,
            damage: KNIFE_DAMAGE,
            ttl: KNIFE_TTL,
        }
    }

    /// Current bounds.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::at(self.pos, self.size)
    }

    /// Still flying.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.ttl > 0
    }

    /// Integrate one tick and count down.
    pub fn update(&mut self) {
        self.pos += Vec2::new(self.dx, self.dy);
        self.dy += self.gravity;
        self.ttl -= 1;
    }

    /// Solid hit: die immediately.
    pub fn response(&mut self) {
        self.ttl = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knife_direction() {
        let right = Projectile::knife(Vec2::ZERO, Facing::Right);
        let left = Projectile::knife(Vec2::ZERO, Facing::Left);
        assert_eq!(right.dx, 16.0);
        assert_eq!(left.dx, -16.0);
        assert_eq!(right.ttl, 30);
        assert_eq!(right.damage, 10);
    }

    #[test]
    fn test_knife_arc() {
        let mut knife = Projectile::knife(Vec2::new(100.0, 50.0), Facing::Right);
        knife.update();
        assert_eq!(knife.pos.x, 116.0);
        assert!((knife.pos.y - 49.4).abs() < 1e-4);
        assert!((knife.dy - (-0.52)).abs() < 1e-6);
        assert_eq!(knife.ttl, 29);
    }

    #[test]
    fn test_response_is_terminal() {
        let mut knife = Projectile::knife(Vec2::ZERO, Facing::Left);
        knife.update();
        knife.response();
        assert_eq!(knife.ttl, 0);
        assert!(!knife.is_alive());
    }
}
