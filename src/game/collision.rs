//! Collision Detection
//!
//! Axis-separated sweeps against the entity snapshot. Each sweep moves a box
//! along one axis, finds what it overlaps and snaps it back out.
//! State transitions are left to the caller; these functions only report
//! where the box ends up and what it touched.
//!
//! Solidity rules:
//! - Blocks stop movement on both axes.
//! - Platforms stop downward movement only, and only when the foot band
//!   overlaps them.
//! - Steps stop downward movement only and are ignored on X.
//!
//! When several kinds overlap on the Y pass the precedence is
//! Block > Platform > Step.

use crate::core::{Rect, Vec2};
use crate::game::events::Direction;
use crate::game::level::{Entity, EntityKind};

/// Foot band height once falling at or above this speed.
pub const FOOT_BAND_CAP_SPEED: f32 = 8.0;

/// Foot band height used at or above [`FOOT_BAND_CAP_SPEED`].
pub const FOOT_BAND_MAX: f32 = 9.0;

/// What a sweep ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    /// Blocked on X
    Wall,
    /// Blocked moving up
    Ceiling,
    /// Landed on a tile of this kind
    Floor(EntityKind),
}

/// Outcome of one axis pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisSweep {
    /// Resolved top-left position
    pub position: Vec2,
    /// Contact, if any
    pub contact: Option<Contact>,
}

/// Thin band at the bottom edge of `rect` used for one-way platforms.
///
/// Height is `dy` below [`FOOT_BAND_CAP_SPEED`], else [`FOOT_BAND_MAX`].
/// Zero or upward speed gives an empty band.
pub fn foot_band(rect: &Rect, dy: f32) -> Rect {
    let height = if dy < FOOT_BAND_CAP_SPEED { dy } else { FOOT_BAND_MAX };
    Rect::new(rect.left(), rect.bottom() - height - 1.0, rect.w, height)
}

/// Move along X by `dx` and push out of any Blocks.
///
/// Overlapping Blocks are unioned; moving left snaps to the union's right
/// edge, moving right snaps so the box's right edge meets the union's left.
pub fn sweep_x(pos: Vec2, size: Vec2, dx: f32, direction: Direction, entities: &[Entity]) -> AxisSweep {
    let moved = pos.with_x(pos.x + dx);
    let rect = Rect::at(moved, size);

    let blocks = entities
        .iter()
        .filter(|e| e.kind.solid_on_x() && rect.intersects(&e.rect))
        .map(|e| &e.rect);

    match Rect::union_all(blocks) {
        Some(union) => {
            let x = match direction {
                Direction::Left => union.right(),
                _ => union.left() - size.x,
            };
            AxisSweep { position: moved.with_x(x), contact: Some(Contact::Wall) }
        }
        None => AxisSweep { position: moved, contact: None },
    }
}

/// Move along Y by `dy` and resolve against Blocks, Platforms and Steps.
pub fn sweep_y(pos: Vec2, size: Vec2, dy: f32, direction: Direction, entities: &[Entity]) -> AxisSweep {
    let moved = pos.with_y(pos.y + dy);
    let rect = Rect::at(moved, size);
    let band = foot_band(&rect, dy);

    let blocks = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Block && rect.intersects(&e.rect))
        .map(|e| &e.rect);

    if let Some(union) = Rect::union_all(blocks) {
        return match direction {
            Direction::Up => AxisSweep {
                position: moved.with_y(union.bottom()),
                contact: Some(Contact::Ceiling),
            },
            _ => AxisSweep {
                position: moved.with_y(union.top() - size.y),
                contact: Some(Contact::Floor(EntityKind::Block)),
            },
        };
    }

    if direction == Direction::Down {
        let platform = highest(entities, EntityKind::Platform, |r| rect.intersects(r) && band.intersects(r));
        let landing = platform
            .map(|r| (r, EntityKind::Platform))
            .or_else(|| highest(entities, EntityKind::Step, |r| rect.intersects(r)).map(|r| (r, EntityKind::Step)));

        if let Some((tile, kind)) = landing {
            return AxisSweep {
                position: moved.with_y(tile.bottom() - size.y),
                contact: Some(Contact::Floor(kind)),
            };
        }
    }

    AxisSweep { position: moved, contact: None }
}

/// Topmost tile of `kind` accepted by `accept`.
fn highest<F>(entities: &[Entity], kind: EntityKind, accept: F) -> Option<Rect>
where
    F: Fn(&Rect) -> bool,
{
    entities
        .iter()
        .filter(|e| e.kind == kind && accept(&e.rect))
        .map(|e| e.rect)
        .fold(None, |best: Option<Rect>, r| match best {
            Some(b) if b.top() <= r.top() => Some(b),
            _ => Some(r),
        })
}

/// First entity that stops projectiles and overlaps `rect`.
pub fn first_projectile_hit<'a>(rect: &Rect, entities: &'a [Entity]) -> Option<&'a Entity> {
    entities
        .iter()
        .find(|e| e.kind.stops_projectiles() && rect.intersects(&e.rect))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Vec2 = Vec2::new(32.0, 60.0);

    fn tile(kind: EntityKind, x: f32, y: f32) -> Entity {
        Entity::new(kind, Rect::new(x, y, 8.0, 8.0))
    }

    /// A horizontal run of tiles.
    fn row(kind: EntityKind, x0: f32, x1: f32, y: f32) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut x = x0;
        while x < x1 {
            out.push(tile(kind, x, y));
            x += 8.0;
        }
        out
    }

    #[test]
    fn test_foot_band_height() {
        let rect = Rect::new(0.0, 0.0, 32.0, 60.0);
        assert_eq!(foot_band(&rect, 3.0), Rect::new(0.0, 56.0, 32.0, 3.0));
        assert_eq!(foot_band(&rect, 12.0), Rect::new(0.0, 50.0, 32.0, 9.0));
        assert!(foot_band(&rect, 0.0).is_empty());
        assert!(foot_band(&rect, -4.0).is_empty());
    }

    #[test]
    fn test_sweep_x_free() {
        let s = sweep_x(Vec2::new(100.0, 0.0), SIZE, 6.0, Direction::Right, &[]);
        assert_eq!(s.position, Vec2::new(106.0, 0.0));
        assert_eq!(s.contact, None);
    }

    #[test]
    fn test_sweep_x_snaps_to_union() {
        // Wall at x = 140..148, two tiles tall inside the body
        let wall = vec![tile(EntityKind::Block, 140.0, 10.0), tile(EntityKind::Block, 140.0, 18.0)];
        let s = sweep_x(Vec2::new(104.0, 0.0), SIZE, 6.0, Direction::Right, &wall);
        assert_eq!(s.position.x, 108.0);
        assert_eq!(s.contact, Some(Contact::Wall));

        let s = sweep_x(Vec2::new(150.0, 0.0), SIZE, -6.0, Direction::Left, &wall);
        assert_eq!(s.position.x, 148.0);
        assert_eq!(s.contact, Some(Contact::Wall));
    }

    #[test]
    fn test_sweep_x_ignores_steps_and_platforms() {
        let ents = vec![tile(EntityKind::Step, 140.0, 10.0), tile(EntityKind::Platform, 140.0, 20.0)];
        let s = sweep_x(Vec2::new(104.0, 0.0), SIZE, 6.0, Direction::Right, &ents);
        assert_eq!(s.position.x, 110.0);
        assert_eq!(s.contact, None);
    }

    #[test]
    fn test_sweep_x_idempotent() {
        let wall = vec![tile(EntityKind::Block, 140.0, 10.0)];
        let once = sweep_x(Vec2::new(104.0, 0.0), SIZE, 6.0, Direction::Right, &wall);
        let twice = sweep_x(once.position, SIZE, 0.0, Direction::Right, &wall);
        assert_eq!(once.position, twice.position);
    }

    #[test]
    fn test_sweep_y_lands_on_block() {
        let floor = row(EntityKind::Block, 0.0, 64.0, 100.0);
        let s = sweep_y(Vec2::new(0.0, 38.0), SIZE, 4.0, Direction::Down, &floor);
        assert_eq!(s.position.y, 40.0);
        assert_eq!(s.contact, Some(Contact::Floor(EntityKind::Block)));
    }

    #[test]
    fn test_sweep_y_ceiling() {
        let ceiling = row(EntityKind::Block, 0.0, 64.0, 0.0);
        let s = sweep_y(Vec2::new(0.0, 12.0), SIZE, -15.0, Direction::Up, &ceiling);
        assert_eq!(s.position.y, 8.0);
        assert_eq!(s.contact, Some(Contact::Ceiling));
    }

    #[test]
    fn test_platform_needs_foot_band() {
        // Platform row at y = 100..108
        let platform = row(EntityKind::Platform, 0.0, 64.0, 100.0);

        // Feet arrive in the platform: band (bottom-4..bottom-1) overlaps it
        let s = sweep_y(Vec2::new(0.0, 40.0), SIZE, 3.0, Direction::Down, &platform);
        assert_eq!(s.contact, Some(Contact::Floor(EntityKind::Platform)));
        assert_eq!(s.position.y, 108.0 - 60.0);

        // Body overlaps the platform higher up, feet are below it: no landing
        let s = sweep_y(Vec2::new(0.0, 80.0), SIZE, 3.0, Direction::Down, &platform);
        assert_eq!(s.contact, None);
        assert_eq!(s.position.y, 83.0);
    }

    #[test]
    fn test_platform_passable_going_up() {
        let platform = row(EntityKind::Platform, 0.0, 64.0, 100.0);
        let s = sweep_y(Vec2::new(0.0, 60.0), SIZE, -15.0, Direction::Up, &platform);
        assert_eq!(s.contact, None);
        assert_eq!(s.position.y, 45.0);
    }

    #[test]
    fn test_step_lands_on_topmost() {
        let steps = vec![tile(EntityKind::Step, 0.0, 96.0), tile(EntityKind::Step, 8.0, 92.0)];
        let s = sweep_y(Vec2::new(0.0, 38.0), SIZE, 4.0, Direction::Down, &steps);
        assert_eq!(s.contact, Some(Contact::Floor(EntityKind::Step)));
        assert_eq!(s.position.y, 100.0 - 60.0);
    }

    #[test]
    fn test_block_wins_over_platform_and_step() {
        let mut ents = row(EntityKind::Step, 0.0, 32.0, 95.0);
        ents.push(tile(EntityKind::Platform, 0.0, 96.0));
        ents.push(tile(EntityKind::Block, 8.0, 98.0));
        let s = sweep_y(Vec2::new(0.0, 37.0), SIZE, 4.0, Direction::Down, &ents);
        assert_eq!(s.contact, Some(Contact::Floor(EntityKind::Block)));
        assert_eq!(s.position.y, 38.0);

        // Without the block, the platform beats the higher step
        ents.pop();
        let s = sweep_y(Vec2::new(0.0, 37.0), SIZE, 4.0, Direction::Down, &ents);
        assert_eq!(s.contact, Some(Contact::Floor(EntityKind::Platform)));
    }

    #[test]
    fn test_projectile_hit_kinds() {
        let knife = Rect::new(0.0, 0.0, 16.0, 6.0);
        assert!(first_projectile_hit(&knife, &[tile(EntityKind::Platform, 4.0, 0.0)]).is_none());
        assert!(first_projectile_hit(&knife, &[tile(EntityKind::Step, 4.0, 0.0)]).is_some());
        assert!(first_projectile_hit(&knife, &[tile(EntityKind::Block, 4.0, 0.0)]).is_some());
    }
}
