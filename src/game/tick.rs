//! Simulation Tick
//!
//! Drives the bus one frame at a time: posts the frame's input requests,
//! then the `Tick` that flushes and drains everything. The same inputs on
//! the same setup always produce the same state hash.

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::core::{compute_state_hash, StateHash};
use crate::game::bus::{CharacterId, Component, EventBus, Listener, ListenerId, PlayerId};
use crate::game::camera::Camera;
use crate::game::character::Character;
use crate::game::events::Event;
use crate::game::input::{InputFrame, InputRecording};
use crate::game::level::{Background, Layout};
use crate::game::state::GameState;

/// Replay and recording errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Recording could not be encoded.
    #[error("cannot encode recording: {0}")]
    Encode(bincode::Error),

    /// Recording could not be decoded.
    #[error("cannot decode recording: {0}")]
    Decode(bincode::Error),

    /// Replay diverged from the recorded run.
    #[error("replay diverged: expected {expected}, got {actual}")]
    HashMismatch {
        /// Hex hash of the recorded run
        expected: String,
        /// Hex hash of the replay
        actual: String,
    },
}

/// Result of a tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickResult {
    /// Tick number just run
    pub tick: u32,
    /// Events dispatched by the drain
    pub dispatched: usize,
}

/// Bus plus the long-lived listeners.
pub struct Simulation {
    bus: EventBus,
    config: SimConfig,
    game: ListenerId,
    camera: ListenerId,
    tick: u32,
    joined: u32,
}

impl Simulation {
    /// New paused simulation with a game and a camera registered.
    pub fn new(config: SimConfig) -> Self {
        let mut bus = EventBus::new();
        let game = bus.register(Component::Game(GameState::new(config.level.clone())));
        let camera = bus.register(Component::Camera(Camera::new(
            config.camera.width,
            config.camera.height,
            config.camera.max_offset,
        )));
        debug!(game = %game, camera = %camera, "simulation created");

        Self { bus, config, game, camera, tick: 0, joined: 0 }
    }

    /// Active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    /// Underlying bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Post an event. Non-tick events wait for the next tick.
    pub fn post(&mut self, event: Event) {
        self.bus.post(event);
    }

    /// Register an outside listener (renderer, logger).
    pub fn register_listener(&mut self, listener: Box<dyn Listener>) -> ListenerId {
        self.bus.register(Component::External(listener))
    }

    /// Request a level build on the next tick.
    pub fn load_level(&mut self, layout: Layout, backgrounds: Vec<Background>) {
        self.post(Event::LevelBuildRequest { layout: Rc::new(layout), backgrounds });
    }

    /// Request a join using the configured name pattern.
    pub fn join(&mut self) {
        self.joined += 1;
        let name = self.config.player_name_for(self.joined);
        self.post(Event::PlayerJoinRequest { name });
    }

    /// Request a character for every player at the configured spawn.
    pub fn spawn_character(&mut self) {
        self.post(Event::CharacterAddRequest { pos: self.config.spawn });
    }

    /// Request the game to start running.
    pub fn start(&mut self) {
        self.post(Event::GameStart);
    }

    /// Run one tick with this frame's input.
    pub fn step(&mut self, frame: &InputFrame) -> TickResult {
        // A start in this frame runs before the rest of its input
        let running = self.game().is_some_and(GameState::is_running) || frame.has(InputFrame::FLAG_START);
        for event in frame.events(running) {
            self.bus.post(event);
        }
        let dispatched = self.bus.post(Event::Tick { fps: self.config.tick_rate });
        self.tick += 1;
        TickResult { tick: self.tick, dispatched }
    }

    /// Game listener, once applied.
    pub fn game(&self) -> Option<&GameState> {
        match self.bus.get(self.game) {
            Some(Component::Game(game)) => Some(game),
            _ => None,
        }
    }

    /// Camera listener, once applied.
    pub fn camera(&self) -> Option<&Camera> {
        match self.bus.get(self.camera) {
            Some(Component::Camera(camera)) => Some(camera),
            _ => None,
        }
    }

    /// Live characters in id order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.bus.components().filter_map(|(_, c)| match c {
            Component::Character(character) if character.alive => Some(character.as_ref()),
            _ => None,
        })
    }

    /// Look up a character.
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        match self.bus.get(id) {
            Some(Component::Character(character)) => Some(character.as_ref()),
            _ => None,
        }
    }

    /// Current character of a player.
    pub fn player_character(&self, player: PlayerId) -> Option<&Character> {
        match self.bus.get(player) {
            Some(Component::Player(p)) => p.character.and_then(|id| self.character(id)),
            _ => None,
        }
    }

    /// Hash of the game, camera and every character.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            for (id, component) in self.bus.components() {
                hasher.update_u32(id.0);
                match component {
                    Component::Game(game) => game.hash_into(hasher),
                    Component::Camera(camera) => camera.hash_into(hasher),
                    Component::Character(character) => character.hash_into(hasher),
                    Component::Player(player) => player.hash_into(hasher),
                    Component::External(_) => {}
                }
            }
        })
    }
}

/// Run a recording against a prepared simulation.
///
/// Each tick posts that tick's commands, then steps with the recorded frame.
/// Returns the final state hash.
pub fn replay(sim: &mut Simulation, recording: &InputRecording) -> StateHash {
    let ticks = recording.tick_count();
    for t in 0..ticks {
        for command in recording.commands_at(t) {
            sim.post(command.to_event());
        }
        sim.step(&recording.frame_at(t));
    }

    let hash = sim.compute_hash();
    info!(ticks, hash = %hex::encode(hash), "replay finished");
    hash
}

/// Replay and compare against an expected hash.
pub fn verify_replay(sim: &mut Simulation, recording: &InputRecording, expected: &StateHash) -> Result<(), ReplayError> {
    let actual = replay(sim, recording);
    if &actual != expected {
        return Err(ReplayError::HashMismatch {
            expected: hex::encode(expected),
            actual: hex::encode(actual),
        });
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
