//! Character Abilities
//!
//! Cooldown-gated special actions. Abilities are passive data: the owning
//! character ticks their cooldowns once per update, and activation is
//! routed through [`activate_ability`], which checks readiness and the
//! per-ability state gate before applying the effect.
//!
//! Refused activations (cooling down, or an incompatible state) are silent
//! no-ops.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::core::Vec2;
use crate::game::buff::Buff;
use crate::game::bus::{CharacterId, EventQueue};
use crate::game::character::{Character, MotionState};
use crate::game::events::{Event, Facing};
use crate::game::projectile::Projectile;

/// Ability cooldowns in ticks at 60Hz, indexed by [`AbilityKind::index`].
pub const ABILITY_COOLDOWNS: [u32; 3] = [
    180, // ThrowKnife: 3 seconds
    120, // Dash: 2 seconds
    300, // Pounce: 5 seconds
];

/// Pounce horizontal launch speed.
pub const POUNCE_SPEED_X: f32 = 12.0;

/// Pounce vertical launch speed (upward).
pub const POUNCE_SPEED_Y: f32 = -18.0;

/// Knife spawn offset below the character's top edge.
const KNIFE_DROP: f32 = 12.0;

/// Knife spawn offset to the left of center when facing left.
const KNIFE_LEFT_SHIFT: f32 = 12.0;

/// Named special actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AbilityKind {
    /// Throw a knife projectile
    ThrowKnife = 0,
    /// Horizontal burst via a buff
    Dash = 1,
    /// Leaping arc
    Pounce = 2,
}

impl AbilityKind {
    /// Every ability, in index order.
    pub const ALL: [AbilityKind; 3] = [AbilityKind::ThrowKnife, AbilityKind::Dash, AbilityKind::Pounce];

    /// Table index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Cooldown after use, in ticks.
    #[inline]
    pub fn max_cooldown(self) -> u32 {
        ABILITY_COOLDOWNS[self.index()]
    }

    /// Name used in scripts and logs.
    pub fn name(self) -> &'static str {
        match self {
            AbilityKind::ThrowKnife => "ThrowKnife",
            AbilityKind::Dash => "Dash",
            AbilityKind::Pounce => "Pounce",
        }
    }

    /// Parse a name. The `...Ability` suffix is accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let base = name.strip_suffix("Ability").unwrap_or(name);
        Self::ALL.iter().copied().find(|k| k.name() == base)
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ABILITY
// =============================================================================

/// Cooldown state of one ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    /// Which ability
    pub kind: AbilityKind,
    /// Ticks until usable
    pub cooldown: u32,
    /// Cooldown after use
    pub max_cooldown: u32,
}

impl Ability {
    /// A ready ability.
    pub fn new(kind: AbilityKind) -> Self {
        Self {
            kind,
            cooldown: 0,
            max_cooldown: kind.max_cooldown(),
        }
    }

    /// Usable now.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.cooldown == 0
    }

    /// Start the cooldown. No-op (returns false) while cooling down.
    pub fn activate(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.cooldown = self.max_cooldown;
        true
    }

    /// Count down one tick, floor 0.
    #[inline]
    pub fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}

/// A character's abilities, keyed by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbilitySet {
    abilities: BTreeMap<AbilityKind, Ability>,
}

impl AbilitySet {
    /// No abilities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// ThrowKnife, Dash and Pounce.
    pub fn ninja() -> Self {
        let abilities = AbilityKind::ALL
            .iter()
            .map(|k| (*k, Ability::new(*k)))
            .collect();
        Self { abilities }
    }

    /// Look up one ability.
    pub fn get(&self, kind: AbilityKind) -> Option<&Ability> {
        self.abilities.get(&kind)
    }

    /// Look up one ability mutably.
    pub fn get_mut(&mut self, kind: AbilityKind) -> Option<&mut Ability> {
        self.abilities.get_mut(&kind)
    }

    /// All abilities in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &Ability> {
        self.abilities.values()
    }

    /// Count every cooling ability down and report what is left.
    pub fn tick_all(&mut self, character: CharacterId, queue: &mut EventQueue) {
        for ability in self.abilities.values_mut() {
            if ability.cooldown > 0 {
                ability.tick();
                queue.post(Event::AbilityCooldown {
                    character,
                    ability: ability.kind,
                    remaining: ability.cooldown,
                    max: ability.max_cooldown,
                });
            }
        }
    }
}

// =============================================================================
// ACTIVATION
// =============================================================================

/// Whether `kind` may fire in the character's current state.
pub fn state_allows(character: &Character, kind: AbilityKind) -> bool {
    let state = character.state;
    match kind {
        AbilityKind::ThrowKnife => true,
        AbilityKind::Dash => state != MotionState::Pouncing,
        AbilityKind::Pounce => {
            if character.in_air && state != MotionState::OnWall {
                return false;
            }
            !matches!(state, MotionState::Jumping | MotionState::Dashing)
        }
    }
}

/// Try to fire an ability for a character.
/// Returns true if it fired.
pub fn activate_ability(character: &mut Character, kind: AbilityKind, queue: &mut EventQueue) -> bool {
    let ready = character.abilities.get(kind).map(Ability::is_ready);
    match ready {
        None => {
            trace!(character = %character.id, ability = %kind, "ability not owned");
            return false;
        }
        Some(false) => {
            trace!(character = %character.id, ability = %kind, "ability cooling down");
            return false;
        }
        Some(true) => {}
    }

    if !state_allows(character, kind) {
        trace!(character = %character.id, ability = %kind, state = ?character.state, "ability refused");
        return false;
    }

    match kind {
        AbilityKind::ThrowKnife => activate_throw_knife(character, queue),
        AbilityKind::Dash => activate_dash(character, queue),
        AbilityKind::Pounce => activate_pounce(character),
    }

    if let Some(ability) = character.abilities.get_mut(kind) {
        ability.activate();
    }
    true
}

/// Dash: leave the wall if on it, enter dashing, attach a dash buff.
fn activate_dash(character: &mut Character, queue: &mut EventQueue) {
    if character.state == MotionState::OnWall {
        character.facing = character.facing.reversed();
    }
    character.set_state(MotionState::Dashing);
    queue.post(Event::BuffAdd {
        character: character.id,
        buff: Buff::dashing(character.id, character.facing),
    });
}

/// ThrowKnife: turn away from the wall if on it and spawn a knife.
fn activate_throw_knife(character: &mut Character, queue: &mut EventQueue) {
    if character.state == MotionState::OnWall {
        character.facing = character.facing.reversed();
    }
    let spawn = knife_spawn(character);
    queue.post(Event::ProjectileAdd {
        projectile: Projectile::knife(spawn, character.facing),
    });
}

/// Pounce: cancel gravity, leave the wall if on it, enter pouncing.
/// The launch vector is applied by the character on every pouncing frame.
fn activate_pounce(character: &mut Character) {
    character.gravity = 0.0;
    if character.state == MotionState::OnWall {
        character.facing = character.facing.reversed();
    }
    character.set_state(MotionState::Pouncing);
}

/// Where a knife appears for the character's current pose and facing.
pub fn knife_spawn(character: &Character) -> Vec2 {
    let rect = character.rect_at_pos();
    let top = rect.top() + KNIFE_DROP;
    match character.facing {
        Facing::Right => Vec2::new(rect.centerx(), top),
        Facing::Left => Vec2::new(rect.centerx() - KNIFE_LEFT_SHIFT, top),
    }
}

/// Pounce velocity for a facing.
#[inline]
pub fn pounce_launch(facing: Facing) -> (f32, f32) {
    (POUNCE_SPEED_X * facing.sign(), POUNCE_SPEED_Y)
}

// =============================================================================
// TESTS
// =============================================================================
