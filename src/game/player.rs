//! Players
//!
//! A player owns at most one character at a time and forwards the game's
//! per-tick update and ability requests to it. Spawning a new character
//! kills the previous one.

use tracing::info;

use crate::core::{Rect, StateHasher, Vec2};
use crate::game::bus::{CharacterId, Component, EventQueue, Listener, PlayerId};
use crate::game::character::{Character, Species, CHARACTER_SIZE};
use crate::game::events::Event;

/// A joined player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Bus handle
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Current character
    pub character: Option<CharacterId>,
}

impl Player {
    /// Create a player with no character.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), character: None }
    }

    /// Replace the current character with a new ninja at `pos`.
    pub fn spawn_character(&mut self, pos: Vec2, queue: &mut EventQueue) -> CharacterId {
        if let Some(old) = self.character.take() {
            queue.post(Event::CharacterKillRequest { character: old });
        }

        let id = queue.register_with(|id| Component::Character(Box::new(Character::new(id, Species::Ninja, pos))));
        self.character = Some(id);

        info!(player = %self.id, character = %id, x = pos.x, y = pos.y, "character spawned");
        queue.post(Event::CharacterAdd {
            character: id,
            player: self.id,
            rect: Rect::at(pos, CHARACTER_SIZE),
        });
        id
    }

    /// Add player state to a hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_bytes(self.name.as_bytes());
        hasher.update_u32(self.character.map_or(0, |c| c.0));
    }
}

impl Listener for Player {
    fn notify(&mut self, event: &Event, queue: &mut EventQueue) {
        match event {
            Event::CharacterAddRequest { pos } => {
                self.spawn_character(*pos, queue);
            }
            Event::PlayerUpdate => {
                if let Some(character) = self.character {
                    queue.post(Event::CharacterUpdateRequest { character });
                }
            }
            Event::AbilityUse { ability } => {
                if let Some(character) = self.character {
                    queue.post(Event::AbilityActivate { character, ability: *ability });
                }
            }
            Event::CharacterKill { character } if self.character == Some(*character) => {
                self.character = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ability::AbilityKind;
    use crate::game::bus::ListenerId;
    use crate::game::events::EventKind;

    fn kinds(queue: &mut EventQueue) -> Vec<EventKind> {
        queue.take_events().iter().map(Event::kind).collect()
    }

    #[test]
    fn test_spawn_registers_character() {
        let mut player = Player::new(ListenerId(1), "player1");
        let mut queue = EventQueue::default();
        player.notify(&Event::CharacterAddRequest { pos: Vec2::new(600.0, 32.0) }, &mut queue);

        assert!(player.character.is_some());
        assert_eq!(queue.pending_registrations(), 1);
        assert_eq!(kinds(&mut queue), vec![EventKind::CharacterAdd]);
    }

    #[test]
    fn test_respawn_kills_previous() {
        let mut player = Player::new(ListenerId(1), "player1");
        let mut queue = EventQueue::default();
        let first = player.spawn_character(Vec2::ZERO, &mut queue);
        queue.take_events();

        let second = player.spawn_character(Vec2::ZERO, &mut queue);
        assert_ne!(first, second);
        assert_eq!(player.character, Some(second));

        let events = queue.take_events();
        assert!(matches!(events[0], Event::CharacterKillRequest { character } if character == first));
        assert!(matches!(events[1], Event::CharacterAdd { character, .. } if character == second));
    }

    #[test]
    fn test_forwards_update_and_abilities() {
        let mut player = Player::new(ListenerId(1), "player1");
        let mut queue = EventQueue::default();

        // Nothing to forward without a character
        player.notify(&Event::PlayerUpdate, &mut queue);
        assert_eq!(queue.pending(), 0);

        let character = player.spawn_character(Vec2::ZERO, &mut queue);
        queue.take_events();

        player.notify(&Event::PlayerUpdate, &mut queue);
        player.notify(&Event::AbilityUse { ability: AbilityKind::Dash }, &mut queue);
        let events = queue.take_events();
        assert!(matches!(events[0], Event::CharacterUpdateRequest { character: c } if c == character));
        assert!(matches!(
            events[1],
            Event::AbilityActivate { character: c, ability: AbilityKind::Dash } if c == character
        ));
    }

    #[test]
    fn test_forgets_killed_character() {
        let mut player = Player::new(ListenerId(1), "player1");
        let mut queue = EventQueue::default();
        let character = player.spawn_character(Vec2::ZERO, &mut queue);
        player.notify(&Event::CharacterKill { character }, &mut queue);
        assert_eq!(player.character, None);
    }
}
