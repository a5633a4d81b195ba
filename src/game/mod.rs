//! Game Logic Module
//!
//! Everything that runs inside the event bus.
//!
//! ## Module Structure
//!
//! - `events`: Event variants, tags and schema-checked construction
//! - `bus`: Deferred-registration event bus
//! - `collision`: Axis-separated sweeps against the entity snapshot
//! - `level`: Tile layouts, entities and projectile ownership
//! - `projectile`: Thrown knives
//! - `character`: Character state machine
//! - `ability`: Cooldown-gated abilities
//! - `buff`: Time-boxed motion overrides
//! - `animation`: State to animation cell tables
//! - `player`: Player to character forwarding
//! - `camera`: View follower
//! - `state`: Game orchestration and run phase
//! - `input`: Input frames, recordings and scripts
//! - `tick`: Simulation driver and replay

pub mod events;
pub mod bus;
pub mod collision;
pub mod level;
pub mod projectile;
pub mod character;
pub mod ability;
pub mod buff;
pub mod animation;
pub mod player;
pub mod camera;
pub mod state;
pub mod input;
pub mod tick;

// Re-export key types
pub use bus::{CharacterId, Component, EventBus, EventQueue, Listener, ListenerId, PlayerId};
pub use character::{Character, MotionState, Species};
pub use events::{Direction, Event, EventError, EventKind, Facing};
pub use input::{InputFrame, InputRecording, InputScript};
pub use level::{Entity, EntityKind, Layout, Level};
pub use state::{GamePhase, GameState};
pub use tick::{replay, Simulation, TickResult};
