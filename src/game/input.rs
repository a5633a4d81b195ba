//! Input Capture and Recording
//!
//! Controller input is packed into one [`InputFrame`] per tick. A frame
//! expands into request events in a fixed order, so recording frames is
//! enough to reproduce a run. Lifecycle requests that are not controller
//! input (joining, spawning) travel beside the frames as timed commands.
//!
//! Input scripts are JSON lists of `{tick, event, args}` entries. Every
//! entry is built through the schema-checked event constructor and then
//! folded into a recording.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Serialize, Deserialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::{StateHash, StateHasher, Vec2};
use crate::game::ability::AbilityKind;
use crate::game::events::{Event, EventError, Facing};
use crate::game::tick::ReplayError;

// =============================================================================
// INPUT FRAME
// =============================================================================

/// Controller state for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFrame {
    /// Walk direction: -1 left, 0 none, 1 right
    pub walk: i8,

    /// Pressed buttons (see the `FLAG_*` constants)
    pub flags: u8,
}

impl InputFrame {
    /// Jump button
    pub const FLAG_JUMP: u8 = 0x01;
    /// Drop button
    pub const FLAG_DROP: u8 = 0x02;
    /// Punch button
    pub const FLAG_PUNCH: u8 = 0x04;
    /// Dash ability
    pub const FLAG_DASH: u8 = 0x08;
    /// Throw knife ability
    pub const FLAG_THROW_KNIFE: u8 = 0x10;
    /// Pounce ability
    pub const FLAG_POUNCE: u8 = 0x20;
    /// Pause toggle
    pub const FLAG_PAUSE: u8 = 0x40;
    /// Start
    pub const FLAG_START: u8 = 0x80;

    /// Ability buttons in expansion order.
    const ABILITY_FLAGS: [(u8, AbilityKind); 3] = [
        (Self::FLAG_THROW_KNIFE, AbilityKind::ThrowKnife),
        (Self::FLAG_DASH, AbilityKind::Dash),
        (Self::FLAG_POUNCE, AbilityKind::Pounce),
    ];

    /// No input.
    pub const fn new() -> Self {
        Self { walk: 0, flags: 0 }
    }

    /// Walking toward `facing`.
    pub fn walking(facing: Facing) -> Self {
        Self { walk: facing.sign() as i8, flags: 0 }
    }

    /// This frame with `flag` pressed.
    pub const fn with(mut self, flag: u8) -> Self {
        self.flags |= flag;
        self
    }

    /// Press or release `flag`.
    #[inline]
    pub fn set(&mut self, flag: u8, pressed: bool) {
        if pressed {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Check a flag.
    #[inline]
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Check if this is an idle frame.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.walk == 0 && self.flags == 0
    }

    /// Walk direction, if any.
    pub fn walk_direction(&self) -> Option<Facing> {
        match self.walk.signum() {
            -1 => Some(Facing::Left),
            1 => Some(Facing::Right),
            _ => None,
        }
    }

    /// Fold a scripted request into the frame. Returns false if the event
    /// is not controller input.
    pub fn absorb(&mut self, event: &Event) -> bool {
        match event {
            Event::GameStart => self.set(Self::FLAG_START, true),
            Event::GamePause => self.set(Self::FLAG_PAUSE, true),
            Event::CharacterJumpRequest => self.set(Self::FLAG_JUMP, true),
            Event::CharacterDropRequest => self.set(Self::FLAG_DROP, true),
            Event::CharacterPunchRequest => self.set(Self::FLAG_PUNCH, true),
            Event::CharacterWalkRequest { direction } => self.walk = direction.sign() as i8,
            Event::AbilityUse { ability } => {
                let flag = Self::ABILITY_FLAGS
                    .iter()
                    .find(|(_, kind)| kind == ability)
                    .map(|(flag, _)| *flag);
                match flag {
                    Some(flag) => self.set(flag, true),
                    None => return false,
                }
            }
            _ => return false,
        }
        true
    }

    /// Expand into request events.
    ///
    /// Start and pause always come first. While the game is not running
    /// they are the only events produced.
    pub fn events(&self, running: bool) -> Vec<Event> {
        let mut events = Vec::new();
        if self.has(Self::FLAG_START) {
            events.push(Event::GameStart);
        }
        if self.has(Self::FLAG_PAUSE) {
            events.push(Event::GamePause);
        }
        if !running {
            return events;
        }

        if let Some(direction) = self.walk_direction() {
            events.push(Event::CharacterWalkRequest { direction });
        }
        if self.has(Self::FLAG_JUMP) {
            events.push(Event::CharacterJumpRequest);
        }
        if self.has(Self::FLAG_DROP) {
            events.push(Event::CharacterDropRequest);
        }
        if self.has(Self::FLAG_PUNCH) {
            events.push(Event::CharacterPunchRequest);
        }
        for (flag, ability) in Self::ABILITY_FLAGS {
            if self.has(flag) {
                events.push(Event::AbilityUse { ability });
            }
        }
        events
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Lifecycle request recorded beside the frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Join a player
    Join {
        /// Player name
        name: String,
    },
    /// Spawn characters for every player
    Spawn {
        /// Top-left position
        pos: Vec2,
    },
}

impl Command {
    /// Lift a request event into a command.
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::PlayerJoinRequest { name } => Some(Command::Join { name: name.clone() }),
            Event::CharacterAddRequest { pos } => Some(Command::Spawn { pos: *pos }),
            _ => None,
        }
    }

    /// The request event to post.
    pub fn to_event(&self) -> Event {
        match self {
            Command::Join { name } => Event::PlayerJoinRequest { name: name.clone() },
            Command::Spawn { pos } => Event::CharacterAddRequest { pos: *pos },
        }
    }
}

/// A command and the tick it is posted on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedCommand {
    /// Tick
    pub tick: u32,
    /// Command
    pub command: Command,
}

// =============================================================================
// INPUT RECORDING
// =============================================================================

/// Input state change.
///
/// Only stored when input CHANGES (not every tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this input state began
    pub tick: u32,
    /// The new input state
    pub frame: InputFrame,
}

/// Complete input for one run: delta-compressed frames plus commands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecording {
    /// Last recorded tick
    pub end_tick: u32,

    /// Frame changes in tick order
    deltas: Vec<InputDelta>,

    /// Commands in tick order
    commands: Vec<TimedCommand>,

    /// Last recorded frame (for delta comparison)
    #[serde(skip)]
    last_frame: InputFrame,
}

impl InputRecording {
    /// Empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the frame for `tick`. Only stored if it changed.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.end_tick = self.end_tick.max(tick);
        if frame != self.last_frame {
            self.deltas.push(InputDelta { tick, frame });
            self.last_frame = frame;
        }
    }

    /// Record a command for `tick`.
    pub fn record_command(&mut self, tick: u32, command: Command) {
        self.end_tick = self.end_tick.max(tick);
        self.commands.push(TimedCommand { tick, command });
    }

    /// Frame in effect at `tick`.
    pub fn frame_at(&self, tick: u32) -> InputFrame {
        let idx = self.deltas.partition_point(|d| d.tick <= tick);
        if idx == 0 {
            InputFrame::new()
        } else {
            self.deltas[idx - 1].frame
        }
    }

    /// Commands posted on `tick`, in recording order.
    pub fn commands_at(&self, tick: u32) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(move |c| c.tick == tick)
            .map(|c| &c.command)
    }

    /// Frame changes.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of ticks covered (`end_tick + 1`, or 0 when empty).
    pub fn tick_count(&self) -> u32 {
        if self.deltas.is_empty() && self.commands.is_empty() {
            0
        } else {
            self.end_tick + 1
        }
    }

    /// Content hash of the frames and commands.
    pub fn digest(&self) -> StateHash {
        let mut hasher = StateHasher::for_inputs();
        hasher.update_u32(self.end_tick);
        hasher.update_u32(self.deltas.len() as u32);
        for delta in &self.deltas {
            hasher.update_u32(delta.tick);
            hasher.update_u8(delta.frame.walk as u8);
            hasher.update_u8(delta.frame.flags);
        }
        hasher.update_u32(self.commands.len() as u32);
        for timed in &self.commands {
            hasher.update_u32(timed.tick);
            match &timed.command {
                Command::Join { name } => {
                    hasher.update_u8(0);
                    hasher.update_bytes(name.as_bytes());
                }
                Command::Spawn { pos } => {
                    hasher.update_u8(1);
                    hasher.update_vec2(*pos);
                }
            }
        }
        hasher.finalize()
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplayError> {
        bincode::serialize(self).map_err(ReplayError::Encode)
    }

    /// Decode from bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReplayError> {
        let mut recording: InputRecording = bincode::deserialize(bytes).map_err(ReplayError::Decode)?;
        recording.last_frame = recording.deltas.last().map(|d| d.frame).unwrap_or_default();
        Ok(recording)
    }
}

// =============================================================================
// INPUT SCRIPTS
// =============================================================================

/// Input script errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Script file could not be read.
    #[error("cannot read script: {0}")]
    Io(#[from] std::io::Error),

    /// Script is not a JSON list of entries.
    #[error("cannot parse script: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry does not build a valid event.
    #[error("script entry {index} (tick {tick}): {source}")]
    Event {
        /// Entry index
        index: usize,
        /// Entry tick
        tick: u32,
        /// Construction error
        source: EventError,
    },

    /// An entry builds an event that cannot be scripted as input.
    #[error("script entry {index}: {kind} is not an input request")]
    NotInput {
        /// Entry index
        index: usize,
        /// Event tag
        kind: &'static str,
    },
}

/// One scripted request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Tick to post on
    pub tick: u32,
    /// Event tag
    pub event: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A JSON input script.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputScript {
    /// Entries in file order
    pub entries: Vec<ScriptEntry>,
}

impl InputScript {
    /// Parse a script.
    pub fn from_json_str(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a script file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Build and fold every entry into a recording.
    ///
    /// Controller requests set bits in that tick's frame; a frame lasts one
    /// tick, so held input must be scripted on every tick it is held.
    pub fn to_recording(&self) -> Result<InputRecording, ScriptError> {
        let mut frames: BTreeMap<u32, InputFrame> = BTreeMap::new();
        let mut recording = InputRecording::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let event = Event::from_name_and_args(&entry.event, &entry.args)
                .map_err(|source| ScriptError::Event { index, tick: entry.tick, source })?;

            if let Some(command) = Command::from_event(&event) {
                recording.record_command(entry.tick, command);
                continue;
            }

            let frame = frames.entry(entry.tick).or_default();
            if !frame.absorb(&event) {
                return Err(ScriptError::NotInput { index, kind: event.kind().name() });
            }
        }

        // Release everything on the tick after each scripted frame
        let mut last = None;
        for (&tick, &frame) in &frames {
            if let Some(prev) = last {
                if tick > prev + 1 {
                    recording.record(prev + 1, InputFrame::new());
                }
            }
            recording.record(tick, frame);
            last = Some(tick);
        }
        if let Some(prev) = last {
            recording.record(prev + 1, InputFrame::new());
        }

        Ok(recording)
    }
}

// =============================================================================
// TESTS
// =============================================================================
