//! # Kunai
//!
//! Simulation core for a 2D ninja side-scroller.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         KUNAI                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - 2D vector                                 │
//! │  ├── rect.rs     - Axis-aligned rectangle                    │
//! │  └── hash.rs     - State hashing for replay checks           │
//! │                                                              │
//! │  game/           - Everything behind the event bus           │
//! │  ├── events.rs   - Event variants and construction           │
//! │  ├── bus.rs      - Deferred-registration dispatcher          │
//! │  ├── collision.rs- X-then-Y sweeps                           │
//! │  ├── level.rs    - Tiles and projectiles                     │
//! │  ├── character.rs- Character state machine                   │
//! │  ├── ability.rs  - Cooldown-gated abilities                  │
//! │  ├── buff.rs     - Forced motion overrides                   │
//! │  ├── player.rs   - Player to character forwarding            │
//! │  ├── camera.rs   - View follower                             │
//! │  ├── state.rs    - Game phase and collision snapshots        │
//! │  ├── input.rs    - Input frames, recordings, scripts         │
//! │  └── tick.rs     - Simulation driver and replay              │
//! │                                                              │
//! │  config.rs       - JSON configuration                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frame Model
//!
//! Components never call each other. They react to events and post new
//! ones; posting a `Tick` flushes membership changes and drains the queue,
//! including everything posted during the drain.
//!
//! Given identical setup and inputs, the simulation produces
//! **identical state hashes**.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod config;

// Re-export commonly used types
pub use crate::core::{Rect, Vec2};
pub use config::SimConfig;
pub use game::bus::{EventBus, Listener, ListenerId};
pub use game::events::Event;
pub use game::input::{InputFrame, InputRecording, InputScript};
pub use game::tick::{Simulation, TickResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Tile edge in pixels
pub const TILE_SIZE: f32 = 8.0;
