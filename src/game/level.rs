//! Level Geometry and Projectiles
//!
//! A level is built from a decoded color layout: each pixel is one tile.
//! The palette maps exact RGBA colors to tile kinds; every other color is
//! empty space. The level also owns the live projectile list and advances it
//! once per running tick.

use serde::{Serialize, Deserialize};
use tracing::{debug, trace};

use crate::core::{Rect, StateHasher, Vec2};
use crate::game::bus::EventQueue;
use crate::game::collision::first_projectile_hit;
use crate::game::events::Event;
use crate::game::projectile::{Projectile, ProjectileId};
use crate::TILE_SIZE;

// =============================================================================
// COLORS
// =============================================================================

/// RGBA color of one layout pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

/// Opaque black: solid block.
pub const BLOCK_COLOR: Rgba = Rgba(0, 0, 0, 255);

/// Opaque blue: one-way platform.
pub const PLATFORM_COLOR: Rgba = Rgba(0, 0, 255, 255);

/// Opaque red: step.
pub const STEP_COLOR: Rgba = Rgba(255, 0, 0, 255);

/// Transparent: empty space.
pub const EMPTY_COLOR: Rgba = Rgba(0, 0, 0, 0);

/// Color to tile kind mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilePalette {
    /// Block color
    pub block: Rgba,
    /// Platform color
    pub platform: Rgba,
    /// Step color
    pub step: Rgba,
}

impl Default for TilePalette {
    fn default() -> Self {
        Self {
            block: BLOCK_COLOR,
            platform: PLATFORM_COLOR,
            step: STEP_COLOR,
        }
    }
}

impl TilePalette {
    /// Tile kind for a color, `None` for empty space.
    ///
    /// Checked in Block, Platform, Step order.
    pub fn kind_of(&self, color: Rgba) -> Option<EntityKind> {
        if color == self.block {
            Some(EntityKind::Block)
        } else if color == self.platform {
            Some(EntityKind::Platform)
        } else if color == self.step {
            Some(EntityKind::Step)
        } else {
            None
        }
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Errors building a layout.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LevelError {
    /// Pixel count does not match the dimensions.
    #[error("layout is {width}x{height} but has {pixels} pixels")]
    SizeMismatch {
        /// Declared width
        width: usize,
        /// Declared height
        height: usize,
        /// Pixels supplied
        pixels: usize,
    },

    /// ASCII rows have different lengths.
    #[error("row {row} has length {len}, expected {expected}")]
    RaggedRow {
        /// Row index
        row: usize,
        /// Row length
        len: usize,
        /// First row's length
        expected: usize,
    },

    /// Unknown character in an ASCII layout.
    #[error("unknown tile character {0:?}")]
    UnknownTile(char),
}

/// Decoded color layout, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Layout {
    /// Create a layout from row-major pixels.
    pub fn new(width: usize, height: usize, pixels: Vec<Rgba>) -> Result<Self, LevelError> {
        if width * height != pixels.len() {
            return Err(LevelError::SizeMismatch { width, height, pixels: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    /// Build a layout from text: `#` block, `=` platform, `^` step,
    /// `.` or space empty.
    pub fn from_ascii(text: &str) -> Result<Self, LevelError> {
        let rows: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);

        let mut pixels = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let len = line.chars().count();
            if len != width {
                return Err(LevelError::RaggedRow { row, len, expected: width });
            }
            for c in line.chars() {
                pixels.push(match c {
                    '#' => BLOCK_COLOR,
                    '=' => PLATFORM_COLOR,
                    '^' => STEP_COLOR,
                    '.' | ' ' => EMPTY_COLOR,
                    other => return Err(LevelError::UnknownTile(other)),
                });
            }
        }

        Self::new(width, rows.len(), pixels)
    }

    /// Width in tiles.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in tiles.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Color at tile `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

/// Background layer descriptor, passed through to the renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Background {
    /// Top-left position
    pub pos: Vec2,
    /// Image name
    pub image: String,
    /// Horizontal parallax divisor
    pub xparallax: f32,
    /// Vertical parallax divisor
    pub yparallax: f32,
}

// =============================================================================
// ENTITIES
// =============================================================================

/// Kind tag of a collidable entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Solid on both axes
    Block,
    /// One-way, solid downward through the foot band
    Platform,
    /// Solid downward only
    Step,
    /// A character body
    Character,
    /// A live projectile
    Projectile,
}

impl EntityKind {
    /// Stops horizontal movement.
    #[inline]
    pub fn solid_on_x(self) -> bool {
        self == EntityKind::Block
    }

    /// Kills projectiles on contact.
    #[inline]
    pub fn stops_projectiles(self) -> bool {
        matches!(self, EntityKind::Block | EntityKind::Step)
    }
}

/// A collidable box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entity {
    /// Kind tag
    pub kind: EntityKind,
    /// Bounds
    pub rect: Rect,
}

impl Entity {
    /// Create an entity.
    pub const fn new(kind: EntityKind, rect: Rect) -> Self {
        Self { kind, rect }
    }
}

// =============================================================================
// LEVEL
// =============================================================================

/// Static tiles plus live projectiles.
#[derive(Clone, Debug, Default)]
pub struct Level {
    tiles: Vec<Entity>,
    projectiles: Vec<Projectile>,
    width: f32,
    height: f32,
    next_projectile_id: u32,
}

impl Level {
    /// Build tiles from a layout. Projectiles from a previous level are dropped.
    pub fn build(layout: &Layout, palette: &TilePalette, tile_size: f32) -> Self {
        let mut tiles = Vec::new();
        for y in 0..layout.height() {
            for x in 0..layout.width() {
                let kind = layout.get(x, y).and_then(|c| palette.kind_of(c));
                if let Some(kind) = kind {
                    let rect = Rect::new(x as f32 * tile_size, y as f32 * tile_size, tile_size, tile_size);
                    tiles.push(Entity::new(kind, rect));
                }
            }
        }

        let level = Self {
            tiles,
            projectiles: Vec::new(),
            width: layout.width() as f32 * tile_size,
            height: layout.height() as f32 * tile_size,
            next_projectile_id: 0,
        };
        debug!(
            tiles = level.tiles.len(),
            width = level.width,
            height = level.height,
            "level built"
        );
        level
    }

    /// Build with the default palette and tile size.
    pub fn build_default(layout: &Layout) -> Self {
        Self::build(layout, &TilePalette::default(), TILE_SIZE)
    }

    /// Static tiles.
    pub fn tiles(&self) -> &[Entity] {
        &self.tiles
    }

    /// Live projectiles.
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Pixel width.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Take ownership of a projectile and announce it.
    pub fn add_projectile(&mut self, mut projectile: Projectile, queue: &mut EventQueue) -> ProjectileId {
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id += 1;
        projectile.id = id;

        trace!(projectile = id.0, pos = %projectile.pos, "projectile added");
        queue.post(Event::ProjectileSpawned { id, rect: projectile.rect() });
        self.projectiles.push(projectile);
        id
    }

    /// Advance every projectile one tick.
    ///
    /// Live projectiles integrate and die on their first Block or Step hit.
    /// Every projectile is reported once; dead ones are removed in the same
    /// pass and never updated again.
    pub fn update(&mut self, queue: &mut EventQueue) {
        let tiles = &self.tiles;
        self.projectiles.retain_mut(|p| {
            if p.is_alive() {
                p.update();
                if first_projectile_hit(&p.rect(), tiles).is_some() {
                    p.response();
                }
            }
            queue.post(Event::ProjectileUpdate { id: p.id, rect: p.rect(), alive: p.is_alive() });
            p.is_alive()
        });
    }

    /// All entities: tiles followed by projectiles.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.tiles
            .iter()
            .copied()
            .chain(self.projectiles.iter().map(|p| Entity::new(EntityKind::Projectile, p.rect())))
    }

    /// Add bounds and live projectiles to a hash. Tiles are fixed per build.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_f32(self.width);
        hasher.update_f32(self.height);
        hasher.update_u32(self.tiles.len() as u32);
        hasher.update_u32(self.projectiles.len() as u32);
        for p in &self.projectiles {
            hasher.update_u32(p.id.0);
            hasher.update_vec2(p.pos);
            hasher.update_f32(p.dx);
            hasher.update_f32(p.dy);
            hasher.update_i32(p.ttl);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::Facing;

    fn updates(queue: &mut EventQueue) -> Vec<(ProjectileId, Rect, bool)> {
        queue
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                Event::ProjectileUpdate { id, rect, alive } => Some((id, rect, alive)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_palette_mapping() {
        let palette = TilePalette::default();
        assert_eq!(palette.kind_of(Rgba(0, 0, 0, 255)), Some(EntityKind::Block));
        assert_eq!(palette.kind_of(Rgba(0, 0, 255, 255)), Some(EntityKind::Platform));
        assert_eq!(palette.kind_of(Rgba(255, 0, 0, 255)), Some(EntityKind::Step));
        assert_eq!(palette.kind_of(Rgba(0, 0, 0, 254)), None);
        assert_eq!(palette.kind_of(Rgba(255, 255, 255, 255)), None);
    }

    #[test]
    fn test_layout_size_mismatch() {
        let err = Layout::new(2, 2, vec![BLOCK_COLOR; 3]).unwrap_err();
        assert_eq!(err, LevelError::SizeMismatch { width: 2, height: 2, pixels: 3 });
    }

    #[test]
    fn test_layout_from_ascii() {
        let layout = Layout::from_ascii("..=\n#.^\n").unwrap();
        assert_eq!(layout.width(), 3);
        assert_eq!(layout.height(), 2);
        assert_eq!(layout.get(2, 0), Some(PLATFORM_COLOR));
        assert_eq!(layout.get(0, 1), Some(BLOCK_COLOR));
        assert_eq!(layout.get(3, 0), None);

        assert!(matches!(Layout::from_ascii("..\n...\n"), Err(LevelError::RaggedRow { row: 1, .. })));
        assert_eq!(Layout::from_ascii("x"), Err(LevelError::UnknownTile('x')));
    }

    #[test]
    fn test_build_tiles_and_bounds() {
        let layout = Layout::from_ascii("..=\n#.^\n").unwrap();
        let level = Level::build_default(&layout);
        assert_eq!(level.width(), 24.0);
        assert_eq!(level.height(), 16.0);

        let tiles = level.tiles();
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0], Entity::new(EntityKind::Platform, Rect::new(16.0, 0.0, 8.0, 8.0)));
        assert_eq!(tiles[1], Entity::new(EntityKind::Block, Rect::new(0.0, 8.0, 8.0, 8.0)));
        assert_eq!(tiles[2], Entity::new(EntityKind::Step, Rect::new(16.0, 8.0, 8.0, 8.0)));
    }

    #[test]
    fn test_projectile_dies_on_block_and_is_removed() {
        // Wall two tiles to the right of the throw point
        let layout = Layout::from_ascii("....#\n....#\n").unwrap();
        let mut level = Level::build_default(&layout);
        let mut queue = EventQueue::default();

        let id = level.add_projectile(Projectile::knife(Vec2::new(4.0, 4.0), Facing::Right), &mut queue);
        assert_eq!(level.projectiles()[0].ttl, 30);
        queue.take_events();

        // 4 + 16 = 20, knife spans 20..36 and overlaps the wall at 32
        level.update(&mut queue);
        assert!(level.projectiles().is_empty());
        let reported = updates(&mut queue);
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].0, id);
        assert!(!reported[0].2);
    }

    #[test]
    fn test_dead_projectile_removed_without_update() {
        let layout = Layout::from_ascii(".....\n").unwrap();
        let mut level = Level::build_default(&layout);
        let mut queue = EventQueue::default();
        level.add_projectile(Projectile::knife(Vec2::new(0.0, 0.0), Facing::Right), &mut queue);
        queue.take_events();

        level.projectiles[0].response();
        level.update(&mut queue);
        assert!(level.projectiles().is_empty());

        // Reported once, at the spawn pose: it was not integrated again
        let reported = updates(&mut queue);
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].1.topleft(), Vec2::new(0.0, 0.0));
        assert!(!reported[0].2);
    }

    #[test]
    fn test_projectile_expires_after_ttl() {
        let layout = Layout::from_ascii(".\n").unwrap();
        let mut level = Level::build_default(&layout);
        let mut queue = EventQueue::default();
        level.add_projectile(Projectile::knife(Vec2::new(0.0, 0.0), Facing::Left), &mut queue);

        for _ in 0..29 {
            level.update(&mut queue);
            assert_eq!(level.projectiles().len(), 1);
        }
        level.update(&mut queue);
        assert!(level.projectiles().is_empty());
    }

    #[test]
    fn test_platforms_do_not_stop_projectiles() {
        let layout = Layout::from_ascii("..=.\n").unwrap();
        let mut level = Level::build_default(&layout);
        let mut queue = EventQueue::default();
        level.add_projectile(Projectile::knife(Vec2::new(0.0, 0.0), Facing::Right), &mut queue);
        level.update(&mut queue);
        assert_eq!(level.projectiles().len(), 1);
        assert_eq!(level.entities().count(), 2);
    }
}
