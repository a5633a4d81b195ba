//! Simulation Events
//!
//! Every message that crosses the event bus is one variant of [`Event`].
//! Each variant has a fixed attribute schema ([`EventKind::attributes`]);
//! events built from untyped data (input scripts) are checked against it.

use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::core::{Rect, Vec2};
use crate::game::ability::AbilityKind;
use crate::game::animation::AnimationKind;
use crate::game::buff::Buff;
use crate::game::bus::{CharacterId, PlayerId};
use crate::game::level::{Background, Entity, Layout};
use crate::game::projectile::{Projectile, ProjectileId};

// =============================================================================
// DIRECTIONS
// =============================================================================

/// Horizontal facing of a character or projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing -X
    Left,
    /// Facing +X
    #[default]
    Right,
}

impl Facing {
    /// The opposite facing.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// -1.0 for left, 1.0 for right.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Facing::Left => "left",
            Facing::Right => "right",
        }
    }

    /// Parse a lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Facing::Left),
            "right" => Some(Facing::Right),
            _ => None,
        }
    }
}

/// Direction of a single-axis collision pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Moving -X
    Left,
    /// Moving +X
    Right,
    /// Moving -Y
    Up,
    /// Moving +Y
    Down,
}

impl Direction {
    /// X-pass direction from a horizontal velocity. Zero counts as right.
    #[inline]
    pub fn from_dx(dx: f32) -> Self {
        if dx < 0.0 { Direction::Left } else { Direction::Right }
    }

    /// Y-pass direction from a vertical velocity. Zero counts as down.
    #[inline]
    pub fn from_dy(dy: f32) -> Self {
        if dy < 0.0 { Direction::Up } else { Direction::Down }
    }

    /// True for the X-axis directions.
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

// =============================================================================
// EVENT
// =============================================================================

/// A message on the event bus.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Event {
    /// Frame boundary. Posting it flushes the bus.
    Tick { fps: u32 },
    /// Switch the game to running
    GameStart,
    /// Toggle pause
    GamePause,
    /// Tick observed while paused
    GamePaused,
    /// Tick observed while running
    GameRunning,
    /// Ask every player to advance its character
    PlayerUpdate,

    /// Create a player
    PlayerJoinRequest { name: String },
    /// A player was created
    PlayerJoin { player: PlayerId, name: String },

    /// Give every player a fresh character at `pos`
    CharacterAddRequest { pos: Vec2 },
    /// A character was created
    CharacterAdd { character: CharacterId, player: PlayerId, rect: Rect },
    /// Run one update of a character
    CharacterUpdateRequest { character: CharacterId },
    /// Pose after a full update
    CharacterUpdate { character: CharacterId, rect: Rect },
    /// Animation cell selected for this tick
    CharacterSetImage {
        character: CharacterId,
        animation: AnimationKind,
        facing: Facing,
        frame: u8,
    },
    /// Walk one step
    CharacterWalkRequest { direction: Facing },
    /// Jump
    CharacterJumpRequest,
    /// Fast-fall / drop through platforms
    CharacterDropRequest,
    /// Punch
    CharacterPunchRequest,
    /// Ask for the entity snapshot for one axis pass
    CharacterCollideRequest { character: CharacterId, direction: Direction },
    /// Entity snapshot answering a collide request
    CharacterCollide {
        character: CharacterId,
        direction: Direction,
        entities: Rc<[Entity]>,
    },
    /// Kill a character
    CharacterKillRequest { character: CharacterId },
    /// A character died
    CharacterKill { character: CharacterId },

    /// Player asked for an ability
    AbilityUse { ability: AbilityKind },
    /// Ability request routed to a character
    AbilityActivate { character: CharacterId, ability: AbilityKind },
    /// Remaining cooldown after this tick
    AbilityCooldown {
        character: CharacterId,
        ability: AbilityKind,
        remaining: u32,
        max: u32,
    },
    /// Attach a buff to a character
    BuffAdd { character: CharacterId, buff: Buff },

    /// Hand a new projectile to the level
    ProjectileAdd { projectile: Projectile },
    /// The level accepted a projectile
    ProjectileSpawned { id: ProjectileId, rect: Rect },
    /// Projectile pose after a level update
    ProjectileUpdate { id: ProjectileId, rect: Rect, alive: bool },

    /// Build the level from a decoded layout
    LevelBuildRequest { layout: Rc<Layout>, backgrounds: Vec<Background> },
    /// Level built; pixel bounds for clamping
    LevelBuild { width: f32, height: f32, backgrounds: Vec<Background> },

    /// Center the camera on a point
    CameraCenterRequest { pos: Vec2, xscroll: bool, yscroll: bool },
    /// Camera view moved
    CameraMove { topleft: Vec2 },
}

/// Tag of an [`Event`], independent of payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum EventKind {
    Tick,
    GameStart,
    GamePause,
    GamePaused,
    GameRunning,
    PlayerUpdate,
    PlayerJoinRequest,
    PlayerJoin,
    CharacterAddRequest,
    CharacterAdd,
    CharacterUpdateRequest,
    CharacterUpdate,
    CharacterSetImage,
    CharacterWalkRequest,
    CharacterJumpRequest,
    CharacterDropRequest,
    CharacterPunchRequest,
    CharacterCollideRequest,
    CharacterCollide,
    CharacterKillRequest,
    CharacterKill,
    AbilityUse,
    AbilityActivate,
    AbilityCooldown,
    BuffAdd,
    ProjectileAdd,
    ProjectileSpawned,
    ProjectileUpdate,
    LevelBuildRequest,
    LevelBuild,
    CameraCenterRequest,
    CameraMove,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 32] = [
        EventKind::Tick,
        EventKind::GameStart,
        EventKind::GamePause,
        EventKind::GamePaused,
        EventKind::GameRunning,
        EventKind::PlayerUpdate,
        EventKind::PlayerJoinRequest,
        EventKind::PlayerJoin,
        EventKind::CharacterAddRequest,
        EventKind::CharacterAdd,
        EventKind::CharacterUpdateRequest,
        EventKind::CharacterUpdate,
        EventKind::CharacterSetImage,
        EventKind::CharacterWalkRequest,
        EventKind::CharacterJumpRequest,
        EventKind::CharacterDropRequest,
        EventKind::CharacterPunchRequest,
        EventKind::CharacterCollideRequest,
        EventKind::CharacterCollide,
        EventKind::CharacterKillRequest,
        EventKind::CharacterKill,
        EventKind::AbilityUse,
        EventKind::AbilityActivate,
        EventKind::AbilityCooldown,
        EventKind::BuffAdd,
        EventKind::ProjectileAdd,
        EventKind::ProjectileSpawned,
        EventKind::ProjectileUpdate,
        EventKind::LevelBuildRequest,
        EventKind::LevelBuild,
        EventKind::CameraCenterRequest,
        EventKind::CameraMove,
    ];

    /// Tag name as used in input scripts and logs.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Tick => "Tick",
            EventKind::GameStart => "GameStart",
            EventKind::GamePause => "GamePause",
            EventKind::GamePaused => "GamePaused",
            EventKind::GameRunning => "GameRunning",
            EventKind::PlayerUpdate => "PlayerUpdate",
            EventKind::PlayerJoinRequest => "PlayerJoinRequest",
            EventKind::PlayerJoin => "PlayerJoin",
            EventKind::CharacterAddRequest => "CharacterAddRequest",
            EventKind::CharacterAdd => "CharacterAdd",
            EventKind::CharacterUpdateRequest => "CharacterUpdateRequest",
            EventKind::CharacterUpdate => "CharacterUpdate",
            EventKind::CharacterSetImage => "CharacterSetImage",
            EventKind::CharacterWalkRequest => "CharacterWalkRequest",
            EventKind::CharacterJumpRequest => "CharacterJumpRequest",
            EventKind::CharacterDropRequest => "CharacterDropRequest",
            EventKind::CharacterPunchRequest => "CharacterPunchRequest",
            EventKind::CharacterCollideRequest => "CharacterCollideRequest",
            EventKind::CharacterCollide => "CharacterCollide",
            EventKind::CharacterKillRequest => "CharacterKillRequest",
            EventKind::CharacterKill => "CharacterKill",
            EventKind::AbilityUse => "AbilityUse",
            EventKind::AbilityActivate => "AbilityActivate",
            EventKind::AbilityCooldown => "AbilityCooldown",
            EventKind::BuffAdd => "BuffAdd",
            EventKind::ProjectileAdd => "ProjectileAdd",
            EventKind::ProjectileSpawned => "ProjectileSpawned",
            EventKind::ProjectileUpdate => "ProjectileUpdate",
            EventKind::LevelBuildRequest => "LevelBuildRequest",
            EventKind::LevelBuild => "LevelBuild",
            EventKind::CameraCenterRequest => "CameraCenterRequest",
            EventKind::CameraMove => "CameraMove",
        }
    }

    /// Look a kind up by tag name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Fixed attribute schema of this kind.
    pub fn attributes(self) -> &'static [&'static str] {
        match self {
            EventKind::Tick => &["fps"],
            EventKind::GameStart
            | EventKind::GamePause
            | EventKind::GamePaused
            | EventKind::GameRunning
            | EventKind::PlayerUpdate
            | EventKind::CharacterJumpRequest
            | EventKind::CharacterDropRequest
            | EventKind::CharacterPunchRequest => &[],
            EventKind::PlayerJoinRequest => &["name"],
            EventKind::PlayerJoin => &["player", "name"],
            EventKind::CharacterAddRequest => &["pos"],
            EventKind::CharacterAdd => &["character", "player", "rect"],
            EventKind::CharacterUpdateRequest => &["character"],
            EventKind::CharacterUpdate => &["character", "rect"],
            EventKind::CharacterSetImage => &["character", "animation", "facing", "frame"],
            EventKind::CharacterWalkRequest => &["direction"],
            EventKind::CharacterCollideRequest => &["character", "direction"],
            EventKind::CharacterCollide => &["character", "direction", "entities"],
            EventKind::CharacterKillRequest => &["character"],
            EventKind::CharacterKill => &["character"],
            EventKind::AbilityUse => &["ability"],
            EventKind::AbilityActivate => &["character", "ability"],
            EventKind::AbilityCooldown => &["character", "ability", "remaining", "max"],
            EventKind::BuffAdd => &["character", "buff"],
            EventKind::ProjectileAdd => &["projectile"],
            EventKind::ProjectileSpawned => &["id", "rect"],
            EventKind::ProjectileUpdate => &["id", "rect", "alive"],
            EventKind::LevelBuildRequest => &["layout", "backgrounds"],
            EventKind::LevelBuild => &["width", "height", "backgrounds"],
            EventKind::CameraCenterRequest => &["pos", "xscroll", "yscroll"],
            EventKind::CameraMove => &["topleft"],
        }
    }

    /// False for the per-tick chatter that would flood the log.
    pub fn should_log(self) -> bool {
        !matches!(
            self,
            EventKind::Tick
                | EventKind::GamePaused
                | EventKind::GameRunning
                | EventKind::PlayerUpdate
                | EventKind::CharacterUpdateRequest
                | EventKind::CharacterUpdate
                | EventKind::CharacterSetImage
                | EventKind::CharacterWalkRequest
                | EventKind::CharacterCollideRequest
                | EventKind::CharacterCollide
                | EventKind::AbilityCooldown
                | EventKind::ProjectileUpdate
                | EventKind::CameraCenterRequest
                | EventKind::CameraMove
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CONSTRUCTION ERRORS
// =============================================================================

/// Errors raised while building an event from untyped data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    /// Argument count does not match the kind's schema.
    #[error("incorrect number of arguments for {kind}: {expected} needed, {got} provided (attributes: {attributes:?})")]
    Arity {
        /// Event tag
        kind: &'static str,
        /// Schema length
        expected: usize,
        /// Arguments supplied
        got: usize,
        /// Schema
        attributes: &'static [&'static str],
    },

    /// No event kind has this name.
    #[error("unknown event tag: {0}")]
    UnknownTag(String),

    /// The kind is produced only by the simulation itself.
    #[error("event {0} cannot be constructed from script data")]
    NotScriptable(&'static str),

    /// An argument had the wrong shape.
    #[error("invalid {attribute} for {kind}: {reason}")]
    InvalidArgument {
        /// Event tag
        kind: &'static str,
        /// Attribute name
        attribute: &'static str,
        /// What was wrong
        reason: String,
    },
}

impl Event {
    /// Tag of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Tick { .. } => EventKind::Tick,
            Event::GameStart => EventKind::GameStart,
            Event::GamePause => EventKind::GamePause,
            Event::GamePaused => EventKind::GamePaused,
            Event::GameRunning => EventKind::GameRunning,
            Event::PlayerUpdate => EventKind::PlayerUpdate,
            Event::PlayerJoinRequest { .. } => EventKind::PlayerJoinRequest,
            Event::PlayerJoin { .. } => EventKind::PlayerJoin,
            Event::CharacterAddRequest { .. } => EventKind::CharacterAddRequest,
            Event::CharacterAdd { .. } => EventKind::CharacterAdd,
            Event::CharacterUpdateRequest { .. } => EventKind::CharacterUpdateRequest,
            Event::CharacterUpdate { .. } => EventKind::CharacterUpdate,
            Event::CharacterSetImage { .. } => EventKind::CharacterSetImage,
            Event::CharacterWalkRequest { .. } => EventKind::CharacterWalkRequest,
            Event::CharacterJumpRequest => EventKind::CharacterJumpRequest,
            Event::CharacterDropRequest => EventKind::CharacterDropRequest,
            Event::CharacterPunchRequest => EventKind::CharacterPunchRequest,
            Event::CharacterCollideRequest { .. } => EventKind::CharacterCollideRequest,
            Event::CharacterCollide { .. } => EventKind::CharacterCollide,
            Event::CharacterKillRequest { .. } => EventKind::CharacterKillRequest,
            Event::CharacterKill { .. } => EventKind::CharacterKill,
            Event::AbilityUse { .. } => EventKind::AbilityUse,
            Event::AbilityActivate { .. } => EventKind::AbilityActivate,
            Event::AbilityCooldown { .. } => EventKind::AbilityCooldown,
            Event::BuffAdd { .. } => EventKind::BuffAdd,
            Event::ProjectileAdd { .. } => EventKind::ProjectileAdd,
            Event::ProjectileSpawned { .. } => EventKind::ProjectileSpawned,
            Event::ProjectileUpdate { .. } => EventKind::ProjectileUpdate,
            Event::LevelBuildRequest { .. } => EventKind::LevelBuildRequest,
            Event::LevelBuild { .. } => EventKind::LevelBuild,
            Event::CameraCenterRequest { .. } => EventKind::CameraCenterRequest,
            Event::CameraMove { .. } => EventKind::CameraMove,
        }
    }

    /// True for the frame-boundary event.
    #[inline]
    pub fn is_tick(&self) -> bool {
        matches!(self, Event::Tick { .. })
    }

    /// Build an event from a tag and positional arguments.
    ///
    /// The argument count is checked against the schema before anything
    /// else. Only input and lifecycle requests can be built this way;
    /// everything else is produced by the simulation.
    pub fn from_args(kind: EventKind, args: &[Value]) -> Result<Event, EventError> {
        let attributes = kind.attributes();
        if attributes.len() != args.len() {
            return Err(EventError::Arity {
                kind: kind.name(),
                expected: attributes.len(),
                got: args.len(),
                attributes,
            });
        }

        let event = match kind {
            EventKind::GameStart => Event::GameStart,
            EventKind::GamePause => Event::GamePause,
            EventKind::CharacterJumpRequest => Event::CharacterJumpRequest,
            EventKind::CharacterDropRequest => Event::CharacterDropRequest,
            EventKind::CharacterPunchRequest => Event::CharacterPunchRequest,
            EventKind::PlayerJoinRequest => Event::PlayerJoinRequest {
                name: arg_str(kind, "name", &args[0])?.to_string(),
            },
            EventKind::CharacterAddRequest => Event::CharacterAddRequest {
                pos: arg_vec2(kind, "pos", &args[0])?,
            },
            EventKind::CharacterWalkRequest => {
                let name = arg_str(kind, "direction", &args[0])?;
                let direction = Facing::from_name(name).ok_or_else(|| invalid(
                    kind,
                    "direction",
                    format!("expected \"left\" or \"right\", got {name:?}"),
                ))?;
                Event::CharacterWalkRequest { direction }
            }
            EventKind::AbilityUse => {
                let name = arg_str(kind, "ability", &args[0])?;
                let ability = AbilityKind::from_name(name).ok_or_else(|| invalid(
                    kind,
                    "ability",
                    format!("unknown ability {name:?}"),
                ))?;
                Event::AbilityUse { ability }
            }
            other => return Err(EventError::NotScriptable(other.name())),
        };

        Ok(event)
    }

    /// Build an event from a tag name and positional arguments.
    pub fn from_name_and_args(name: &str, args: &[Value]) -> Result<Event, EventError> {
        let kind = EventKind::from_name(name)
            .ok_or_else(|| EventError::UnknownTag(name.to_string()))?;
        Self::from_args(kind, args)
    }
}

fn invalid(kind: EventKind, attribute: &'static str, reason: String) -> EventError {
    EventError::InvalidArgument { kind: kind.name(), attribute, reason }
}

fn arg_str<'a>(kind: EventKind, attribute: &'static str, value: &'a Value) -> Result<&'a str, EventError> {
    value
        .as_str()
        .ok_or_else(|| invalid(kind, attribute, format!("expected a string, got {value}")))
}

fn arg_vec2(kind: EventKind, attribute: &'static str, value: &Value) -> Result<Vec2, EventError> {
    let pair = value
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| invalid(kind, attribute, format!("expected [x, y], got {value}")))?;
    let x = pair[0].as_f64();
    let y = pair[1].as_f64();
    match (x, y) {
        (Some(x), Some(y)) => Ok(Vec2::new(x as f32, y as f32)),
        _ => Err(invalid(kind, attribute, format!("expected numbers, got {value}"))),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direction_defaults() {
        assert_eq!(Direction::from_dx(0.0), Direction::Right);
        assert_eq!(Direction::from_dx(-0.5), Direction::Left);
        assert_eq!(Direction::from_dy(0.0), Direction::Down);
        assert_eq!(Direction::from_dy(-15.0), Direction::Up);
        assert!(Direction::Left.is_horizontal());
        assert!(!Direction::Down.is_horizontal());
    }

    #[test]
    fn test_facing_reverse() {
        assert_eq!(Facing::Left.reversed(), Facing::Right);
        assert_eq!(Facing::Right.reversed(), Facing::Left);
        assert_eq!(Facing::Left.sign(), -1.0);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("DrawEvent"), None);
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Event::Tick { fps: 60 }.kind(), EventKind::Tick);
        assert!(Event::Tick { fps: 0 }.is_tick());
        assert!(!Event::GameStart.is_tick());
        let walk = Event::CharacterWalkRequest { direction: Facing::Left };
        assert_eq!(walk.kind(), EventKind::CharacterWalkRequest);
    }

    #[test]
    fn test_from_args_arity_error() {
        let err = Event::from_args(EventKind::CharacterWalkRequest, &[]).unwrap_err();
        assert!(matches!(err, EventError::Arity { expected: 1, got: 0, .. }));

        let err = Event::from_args(EventKind::GameStart, &[json!(1)]).unwrap_err();
        assert!(matches!(err, EventError::Arity { expected: 0, got: 1, .. }));
    }

    #[test]
    fn test_arity_checked_before_scriptability() {
        let err = Event::from_args(EventKind::CharacterCollide, &[json!(1)]).unwrap_err();
        assert!(matches!(err, EventError::Arity { expected: 3, got: 1, .. }));
    }

    #[test]
    fn test_from_args_builds_requests() {
        let ev = Event::from_args(EventKind::CharacterWalkRequest, &[json!("left")]).unwrap();
        assert!(matches!(ev, Event::CharacterWalkRequest { direction: Facing::Left }));

        let ev = Event::from_args(EventKind::CharacterAddRequest, &[json!([600, 32])]).unwrap();
        match ev {
            Event::CharacterAddRequest { pos } => assert_eq!(pos, Vec2::new(600.0, 32.0)),
            other => panic!("unexpected {other:?}"),
        }

        let ev = Event::from_name_and_args("AbilityUse", &[json!("Dash")]).unwrap();
        assert!(matches!(ev, Event::AbilityUse { ability: AbilityKind::Dash }));
    }

    #[test]
    fn test_from_args_rejects_bad_data() {
        let err = Event::from_args(EventKind::CharacterWalkRequest, &[json!("up")]).unwrap_err();
        assert!(matches!(err, EventError::InvalidArgument { attribute: "direction", .. }));

        let err = Event::from_name_and_args("Teleport", &[]).unwrap_err();
        assert_eq!(err, EventError::UnknownTag("Teleport".to_string()));

        let err = Event::from_args(EventKind::Tick, &[json!(60)]).unwrap_err();
        assert_eq!(err, EventError::NotScriptable("Tick"));
    }

    #[test]
    fn test_chatter_not_logged() {
        assert!(!EventKind::Tick.should_log());
        assert!(!EventKind::CharacterCollide.should_log());
        assert!(EventKind::CharacterAdd.should_log());
        assert!(EventKind::BuffAdd.should_log());
    }
}
