//! Game Orchestration
//!
//! The game listener owns the level and the run/pause phase. On every
//! running tick it advances projectiles and asks players to update their
//! characters. It answers collision requests with a shared snapshot of the
//! entity list, rebuilt only when something in it moved.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::config::LevelConfig;
use crate::core::{Rect, StateHasher};
use crate::game::bus::{CharacterId, Component, EventQueue, Listener, PlayerId};
use crate::game::events::Event;
use crate::game::level::{Entity, EntityKind, Level};
use crate::game::player::Player;

/// Run phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum GamePhase {
    /// Ticks only report the pause
    #[default]
    Paused = 0,
    /// Ticks advance the world
    Running = 1,
}

/// Game state listener.
#[derive(Debug)]
pub struct GameState {
    phase: GamePhase,
    level: Level,
    level_config: LevelConfig,
    players: BTreeMap<PlayerId, String>,
    character_rects: BTreeMap<CharacterId, Rect>,
    snapshot: Rc<[Entity]>,
    dirty: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(LevelConfig::default())
    }
}

impl GameState {
    /// Paused game with an empty level.
    pub fn new(level_config: LevelConfig) -> Self {
        Self {
            phase: GamePhase::Paused,
            level: Level::default(),
            level_config,
            players: BTreeMap::new(),
            character_rects: BTreeMap::new(),
            snapshot: Rc::from(Vec::new()),
            dirty: false,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// True while running.
    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    /// Current level.
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Joined players by id.
    pub fn players(&self) -> &BTreeMap<PlayerId, String> {
        &self.players
    }

    /// Last published bounds of every live character.
    pub fn character_rects(&self) -> &BTreeMap<CharacterId, Rect> {
        &self.character_rects
    }

    /// Entity snapshot handed to collision, rebuilt if stale.
    pub fn entities(&mut self) -> Rc<[Entity]> {
        if self.dirty {
            let characters = self
                .character_rects
                .values()
                .map(|r| Entity::new(EntityKind::Character, *r));
            self.snapshot = self.level.entities().chain(characters).collect();
            self.dirty = false;
        }
        Rc::clone(&self.snapshot)
    }

    fn on_tick(&mut self, queue: &mut EventQueue) {
        match self.phase {
            GamePhase::Paused => queue.post(Event::GamePaused),
            GamePhase::Running => {
                let had_projectiles = !self.level.projectiles().is_empty();
                self.level.update(queue);
                if had_projectiles || !self.level.projectiles().is_empty() {
                    self.dirty = true;
                }
                queue.post(Event::GameRunning);
                queue.post(Event::PlayerUpdate);
            }
        }
    }

    fn join(&mut self, name: &str, queue: &mut EventQueue) {
        let player = queue.register_with(|id| Component::Player(Player::new(id, name)));
        self.players.insert(player, name.to_string());
        info!(player = %player, name, "player joined");
        queue.post(Event::PlayerJoin { player, name: name.to_string() });
    }

    /// Add game state to a hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u8(self.phase as u8);
        self.level.hash_into(hasher);
        for (id, rect) in &self.character_rects {
            hasher.update_u32(id.0);
            hasher.update_rect(rect);
        }
    }
}

impl Listener for GameState {
    fn notify(&mut self, event: &Event, queue: &mut EventQueue) {
        match event {
            Event::Tick { .. } => self.on_tick(queue),
            Event::GameStart => {
                if self.phase != GamePhase::Running {
                    info!("game running");
                }
                self.phase = GamePhase::Running;
            }
            Event::GamePause => {
                self.phase = match self.phase {
                    GamePhase::Running => GamePhase::Paused,
                    GamePhase::Paused => GamePhase::Running,
                };
                info!(phase = ?self.phase, "pause toggled");
            }
            Event::PlayerJoinRequest { name } => self.join(name, queue),
            Event::LevelBuildRequest { layout, backgrounds } => {
                self.level = Level::build(layout, &self.level_config.palette, self.level_config.tile_size);
                self.dirty = true;
                queue.post(Event::LevelBuild {
                    width: self.level.width(),
                    height: self.level.height(),
                    backgrounds: backgrounds.clone(),
                });
            }
            Event::ProjectileAdd { projectile } => {
                self.level.add_projectile(projectile.clone(), queue);
                self.dirty = true;
            }
            Event::CharacterCollideRequest { character, direction } => {
                queue.post(Event::CharacterCollide {
                    character: *character,
                    direction: *direction,
                    entities: self.entities(),
                });
            }
            Event::CharacterAdd { character, rect, .. } | Event::CharacterUpdate { character, rect } => {
                self.character_rects.insert(*character, *rect);
                self.dirty = true;
            }
            Event::CharacterKill { character } => {
                if self.character_rects.remove(character).is_some() {
                    debug!(character = %character, "character removed");
                    self.dirty = true;
                }
            }
            _ => {}
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
