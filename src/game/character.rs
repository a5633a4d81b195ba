//! Character State Machine
//!
//! One controller per character. Every update runs, in order:
//!
//! 1. ability cooldowns tick
//! 2. buffs apply their forced velocity
//! 3. the animation cell is selected and sub-state counters advance
//! 4. gravity or the jump curve integrates, `dy` is clamped
//! 5. an X collision request then a Y collision request are posted
//!
//! The game answers each request with the entity snapshot. The X answer is
//! resolved first, then the Y answer, which also finishes the update:
//! the left edge is clamped and the pose is published.
//!
//! `pos` is the source of truth; `rect` is refreshed from it when the pose is
//! published and whenever a sweep needs it.

use serde::{Serialize, Deserialize};
use tracing::{debug, trace};

use crate::core::{Rect, StateHasher, Vec2};
use crate::game::ability::{activate_ability, pounce_launch, AbilitySet};
use crate::game::animation::{AnimationKind, WalkCycle};
use crate::game::buff::Buff;
use crate::game::bus::{CharacterId, EventQueue, Listener};
use crate::game::collision::{sweep_x, sweep_y, Contact};
use crate::game::events::{Direction, Event, Facing};
use crate::game::level::Entity;

// =============================================================================
// TUNING
// =============================================================================

/// Body size
pub const CHARACTER_SIZE: Vec2 = Vec2::new(32.0, 60.0);

/// Maximum walk speed
pub const MAX_SPEED: f32 = 6.0;

/// Walk acceleration per request
pub const WALK_ACCEL: f32 = 1.0;

/// Initial upward jump speed
pub const JUMP_FORCE: f32 = 15.0;

/// Jump fall velocity gain per tick while rising
pub const JUMP_FALL_ACCEL: f32 = 1.0;

/// Subtracted from [`JUMP_FALL_ACCEL`] once past the apex
pub const APEX_FALL_DAMPING: f32 = 0.3;

/// Horizontal momentum lost per airborne tick
pub const AIR_DRAG: f32 = 0.1;

/// Fast-fall speed set by a drop request
pub const DROP_SPEED: f32 = 9.0;

/// Terminal fall speed
pub const MAX_FALL_SPEED: f32 = 15.0;

/// Punch length in frames
pub const PUNCH_FRAMES: u32 = 6;

/// Dash pose length in frames
pub const DASH_FRAMES: u32 = 10;

/// Pounce length in frames
pub const POUNCE_FRAMES: u32 = 100;

/// Ninja jump charges (double jump)
pub const NINJA_JUMP_CHARGES: u8 = 2;

/// Gravity cap while sliding down a wall
pub const WALL_SLIDE_GRAVITY: f32 = 4.0;

/// Extra gravity when a pounce hits a ceiling
pub const CEILING_POUNCE_GRAVITY: f32 = 1.5;

// =============================================================================
// STATES
// =============================================================================

/// Motion state. Exactly one is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionState {
    /// Standing or falling without input
    #[default]
    Idle = 0,
    /// Walking
    Walking = 1,
    /// Following the jump curve
    Jumping = 2,
    /// Airborne against a wall
    OnWall = 3,
    /// Punching
    Punching = 4,
    /// Dash pose
    Dashing = 5,
    /// Pounce arc
    Pouncing = 6,
}

/// Character species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Species {
    /// Single jump, plain gravity, no abilities
    Basic = 0,
    /// Double jump, wall slide, punch, abilities
    #[default]
    Ninja = 1,
}

// =============================================================================
// CHARACTER
// =============================================================================

/// A character controller.
#[derive(Clone, Debug)]
pub struct Character {
    /// Bus handle
    pub id: CharacterId,
    /// Species
    pub species: Species,
    /// False after `kill()`
    pub alive: bool,

    /// Top-left position (source of truth)
    pub pos: Vec2,
    /// Cached bounds, refreshed from `pos`
    pub rect: Rect,

    /// Horizontal velocity for the next X pass
    pub dx: f32,
    /// Vertical velocity for the next Y pass
    pub dy: f32,
    /// Walk momentum
    pub speed: f32,
    /// Gravity accumulator
    pub gravity: f32,
    /// Jump curve progress
    pub jump_fall_vel: f32,

    /// Facing
    pub facing: Facing,
    /// Motion state
    pub state: MotionState,
    /// Not supported by ground
    pub in_air: bool,

    /// Punch progress
    pub punch_frame: u32,
    /// Dash pose progress
    pub dash_frame: u32,
    /// Pounce progress
    pub pounce_frame: u32,
    /// Walk animation counters
    pub walk: WalkCycle,
    /// Jump charges left (ninja)
    pub jumps: u8,

    /// Active buffs
    pub buffs: Vec<Buff>,
    /// Abilities (empty for basic characters)
    pub abilities: AbilitySet,
}

impl Character {
    /// Create a character standing at `pos`.
    pub fn new(id: CharacterId, species: Species, pos: Vec2) -> Self {
        let abilities = match species {
            Species::Ninja => AbilitySet::ninja(),
            Species::Basic => AbilitySet::empty(),
        };

        Self {
            id,
            species,
            alive: true,
            pos,
            rect: Rect::at(pos, CHARACTER_SIZE),
            dx: 0.0,
            dy: 0.0,
            speed: 0.0,
            gravity: 0.0,
            jump_fall_vel: 0.0,
            facing: Facing::Right,
            state: MotionState::Idle,
            in_air: false,
            punch_frame: 0,
            dash_frame: 0,
            pounce_frame: 0,
            walk: WalkCycle::default(),
            jumps: 0,
            buffs: Vec::new(),
            abilities,
        }
    }

    /// Create a ninja at `pos`.
    pub fn ninja(id: CharacterId, pos: Vec2) -> Self {
        Self::new(id, Species::Ninja, pos)
    }

    /// Bounds at the current `pos`.
    #[inline]
    pub fn rect_at_pos(&self) -> Rect {
        Rect::at(self.pos, CHARACTER_SIZE)
    }

    /// Switch state. Leaving a timed sub-state resets its counter.
    pub fn set_state(&mut self, next: MotionState) {
        if next == self.state {
            return;
        }
        match self.state {
            MotionState::Punching => self.punch_frame = 0,
            MotionState::Dashing => self.dash_frame = 0,
            MotionState::Pouncing => self.pounce_frame = 0,
            _ => {}
        }
        trace!(character = %self.id, from = ?self.state, to = ?next, "state");
        self.state = next;
    }

    /// Stop the character and leave the bus at the next tick.
    pub fn kill(&mut self, queue: &mut EventQueue) {
        if !self.alive {
            return;
        }
        debug!(character = %self.id, "killed");
        self.alive = false;
        queue.unregister(self.id);
        queue.post(Event::CharacterKill { character: self.id });
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Accelerate toward `direction`.
    pub fn walk(&mut self, direction: Facing) {
        if matches!(self.state, MotionState::Dashing | MotionState::Pouncing) {
            return;
        }

        self.speed = (self.speed + WALK_ACCEL * direction.sign()).clamp(-MAX_SPEED, MAX_SPEED);
        self.facing = direction;

        if self.state == MotionState::Punching {
            return;
        }

        self.dx = self.speed;

        if matches!(self.state, MotionState::Jumping | MotionState::OnWall) {
            return;
        }
        self.set_state(MotionState::Walking);
    }

    /// Start a jump if the species allows it.
    pub fn jump(&mut self) {
        match self.species {
            Species::Basic => {
                if self.in_air || self.state == MotionState::Jumping {
                    return;
                }
            }
            Species::Ninja => {
                if self.state == MotionState::Pouncing || self.jumps == 0 {
                    return;
                }
                // An airborne jump spends both charges
                if self.in_air {
                    self.jumps = self.jumps.saturating_sub(1);
                }
                self.jumps = self.jumps.saturating_sub(1);
            }
        }

        self.set_state(MotionState::Jumping);
        self.gravity = 0.0;
        self.jump_fall_vel = 0.0;
    }

    /// Fast-fall from idle or walking.
    pub fn drop_down(&mut self) {
        if matches!(self.state, MotionState::Idle | MotionState::Walking) {
            self.dy = DROP_SPEED;
        }
    }

    /// Punch from idle or walking (ninja only).
    pub fn punch(&mut self) {
        if self.species != Species::Ninja {
            return;
        }
        if matches!(self.state, MotionState::Idle | MotionState::Walking) {
            self.set_state(MotionState::Punching);
        }
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Run one update and post both collision requests.
    pub fn update(&mut self, queue: &mut EventQueue) {
        self.abilities.tick_all(self.id, queue);
        self.apply_buffs();
        self.select_animation(queue);
        self.advance_substate();
        self.update_movement(queue);
    }

    fn apply_buffs(&mut self) {
        for buff in self.buffs.iter_mut() {
            buff.apply(&mut self.dx, &mut self.gravity);
        }
        self.buffs.retain(|b| !b.is_expired());
    }

    fn select_animation(&mut self, queue: &mut EventQueue) {
        let animation = AnimationKind::for_state(self.state, self.in_air);

        let frame = if self.state == MotionState::Walking {
            if self.in_air { 0 } else { self.walk.step() }
        } else {
            self.walk.reset();
            0
        };

        queue.post(Event::CharacterSetImage {
            character: self.id,
            animation,
            facing: self.facing,
            frame,
        });
    }

    fn advance_substate(&mut self) {
        match self.state {
            MotionState::Punching => {
                self.punch_frame += 1;
                if self.punch_frame > PUNCH_FRAMES {
                    self.set_state(MotionState::Idle);
                }
            }
            MotionState::Dashing => {
                self.dash_frame += 1;
                if self.dash_frame > DASH_FRAMES {
                    self.set_state(MotionState::Idle);
                }
            }
            MotionState::Pouncing => {
                self.pounce_frame += 1;
                let (dx, dy) = pounce_launch(self.facing);
                self.dx = dx;
                self.dy = dy;
                if self.pounce_frame > POUNCE_FRAMES {
                    self.set_state(MotionState::Idle);
                }
            }
            _ => {}
        }
    }

    fn update_movement(&mut self, queue: &mut EventQueue) {
        if self.state == MotionState::Idle {
            self.speed = 0.0;
        }

        if self.state == MotionState::Jumping {
            self.integrate_jump();
        } else {
            self.apply_gravity();
        }

        self.dy = self.dy.min(MAX_FALL_SPEED);

        queue.post(Event::CharacterCollideRequest {
            character: self.id,
            direction: Direction::from_dx(self.dx),
        });
        queue.post(Event::CharacterCollideRequest {
            character: self.id,
            direction: Direction::from_dy(self.dy),
        });
    }

    fn integrate_jump(&mut self) {
        self.dy = self.jump_fall_vel - JUMP_FORCE;
        if self.jump_fall_vel < JUMP_FORCE {
            self.jump_fall_vel += JUMP_FALL_ACCEL;
        } else {
            self.jump_fall_vel += JUMP_FALL_ACCEL - APEX_FALL_DAMPING;
        }

        self.dx = self.speed;
        if self.speed.abs() == MAX_SPEED {
            self.speed *= 0.5;
        }
        if self.speed > 0.0 {
            self.speed -= AIR_DRAG;
        } else if self.speed < 0.0 {
            self.speed += AIR_DRAG;
        }
        if self.speed.abs() < AIR_DRAG {
            self.speed = 0.0;
        }
    }

    fn apply_gravity(&mut self) {
        match self.species {
            Species::Basic => {
                // At least one pixel on the first frame so the floor is found
                self.gravity += if self.gravity < 4.0 {
                    1.0
                } else if self.gravity < 10.0 {
                    0.4
                } else {
                    0.2
                };
            }
            Species::Ninja => {
                self.jumps = NINJA_JUMP_CHARGES;
                if self.dy < 0.0 {
                    self.gravity += 0.7;
                } else {
                    self.gravity += if self.gravity < 2.0 {
                        1.0
                    } else if self.gravity < 4.0 {
                        0.8
                    } else if self.gravity < 8.0 {
                        0.5
                    } else {
                        0.2
                    };
                    if self.state == MotionState::OnWall && self.gravity > WALL_SLIDE_GRAVITY {
                        self.gravity = WALL_SLIDE_GRAVITY;
                    }
                }
            }
        }
        self.dy += self.gravity;
    }

    // =========================================================================
    // COLLISION RESOLUTION
    // =========================================================================

    /// Resolve one collision answer.
    pub fn resolve(&mut self, direction: Direction, entities: &[Entity], queue: &mut EventQueue) {
        if direction.is_horizontal() {
            self.resolve_x(direction, entities);
        } else {
            self.resolve_y(direction, entities);
            self.finish_update(queue);
        }
    }

    /// X pass: move by `dx`, push out of blocks, apply wall transitions.
    pub fn resolve_x(&mut self, direction: Direction, entities: &[Entity]) {
        let sweep = sweep_x(self.pos, CHARACTER_SIZE, self.dx, direction, entities);
        self.pos = sweep.position;

        if sweep.contact.is_some() {
            trace!(character = %self.id, x = self.pos.x, "wall contact");
            self.speed = 0.0;
            match self.state {
                MotionState::Dashing | MotionState::Walking => self.set_state(MotionState::Idle),
                MotionState::Pouncing => {
                    self.set_state(MotionState::Idle);
                    self.gravity = 0.0;
                }
                _ => {}
            }
            if (self.in_air || self.state == MotionState::Jumping) && self.dy > 0.0 {
                self.set_state(MotionState::OnWall);
            }
        } else if self.state == MotionState::OnWall {
            self.set_state(MotionState::Idle);
        }

        self.dx = 0.0;
    }

    /// Y pass: move by `dy`, land or bump the ceiling.
    pub fn resolve_y(&mut self, direction: Direction, entities: &[Entity]) {
        let sweep = sweep_y(self.pos, CHARACTER_SIZE, self.dy, direction, entities);
        self.pos = sweep.position;

        let landed = matches!(sweep.contact, Some(Contact::Floor(_)));
        match sweep.contact {
            Some(Contact::Floor(kind)) => {
                trace!(character = %self.id, ?kind, y = self.pos.y, "floor contact");
                self.land();
            }
            Some(Contact::Ceiling) => {
                trace!(character = %self.id, y = self.pos.y, "ceiling contact");
                if self.state == MotionState::Jumping {
                    self.jump_fall_vel = JUMP_FORCE;
                }
                if self.state == MotionState::Pouncing {
                    self.gravity += CEILING_POUNCE_GRAVITY;
                    self.set_state(MotionState::Idle);
                }
            }
            Some(Contact::Wall) | None => {}
        }

        // Anything but floor support leaves the character airborne
        if !landed && self.state != MotionState::Jumping {
            self.in_air = true;
        }
        self.dy = 0.0;
    }

    /// Floor contact. Arriving from the air ends any state; a grounded
    /// punch or dash keeps running on continued support.
    fn land(&mut self) {
        let arriving = self.in_air || self.state == MotionState::Jumping;
        self.in_air = false;
        self.gravity = 0.0;

        let grounded_action = matches!(self.state, MotionState::Punching | MotionState::Dashing);
        if arriving || !grounded_action {
            self.set_state(MotionState::Idle);
        }
    }

    /// Clamp to the left edge and publish the pose.
    fn finish_update(&mut self, queue: &mut EventQueue) {
        if self.pos.x < 0.0 {
            self.pos.x = 0.0;
        }
        self.rect = self.rect_at_pos();

        queue.post(Event::CameraCenterRequest {
            pos: self.rect.center(),
            xscroll: true,
            yscroll: true,
        });
        queue.post(Event::CharacterUpdate { character: self.id, rect: self.rect });
    }

    /// Add this character's state to a hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_u8(self.species as u8);
        hasher.update_bool(self.alive);
        hasher.update_vec2(self.pos);
        hasher.update_f32(self.dx);
        hasher.update_f32(self.dy);
        hasher.update_f32(self.speed);
        hasher.update_f32(self.gravity);
        hasher.update_f32(self.jump_fall_vel);
        hasher.update_u8(self.facing as u8);
        hasher.update_u8(self.state as u8);
        hasher.update_bool(self.in_air);
        hasher.update_u32(self.punch_frame);
        hasher.update_u32(self.dash_frame);
        hasher.update_u32(self.pounce_frame);
        hasher.update_u32(self.walk.ticks);
        hasher.update_u8(self.walk.frame);
        hasher.update_u8(self.jumps);
        hasher.update_u32(self.buffs.len() as u32);
        for buff in &self.buffs {
            hasher.update_f32(buff.speed);
            hasher.update_u32(buff.duration);
        }
        for ability in self.abilities.iter() {
            hasher.update_u32(ability.cooldown);
        }
    }
}

impl Listener for Character {
    fn notify(&mut self, event: &Event, queue: &mut EventQueue) {
        if !self.alive {
            return;
        }

        match event {
            Event::CharacterUpdateRequest { character } if *character == self.id => {
                self.update(queue);
            }
            Event::CharacterCollide { character, direction, entities } if *character == self.id => {
                self.resolve(*direction, entities, queue);
            }
            Event::BuffAdd { character, buff } if *character == self.id => {
                self.buffs.push(buff.clone());
            }
            Event::AbilityActivate { character, ability } if *character == self.id => {
                activate_ability(self, *ability, queue);
            }
            Event::CharacterKillRequest { character } if *character == self.id => {
                self.kill(queue);
            }
            Event::CharacterWalkRequest { direction } => self.walk(*direction),
            Event::CharacterJumpRequest => self.jump(),
            Event::CharacterDropRequest => self.drop_down(),
            Event::CharacterPunchRequest => self.punch(),
            _ => {}
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
