//! Event Bus
//!
//! Single-threaded publish/subscribe dispatcher. Components never hold
//! references to each other; they react to events and post new ones.
//!
//! ## Timing
//!
//! - `register` / `unregister` are queued, never applied mid-notification.
//! - `post` appends to a FIFO queue. Posting a [`Event::Tick`] applies all
//!   queued membership changes and then drains the queue.
//! - The drain walks the queue by index, so events posted during dispatch
//!   are delivered in the same drain. Queued registrations are applied
//!   between events; queued removals wait for the next tick.
//!
//! The bus owns every registered component. Membership ends only through an
//! explicit `unregister`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};
use tracing::{debug, trace, warn};

use crate::game::camera::Camera;
use crate::game::character::Character;
use crate::game::events::Event;
use crate::game::player::Player;
use crate::game::state::GameState;

/// Handle of a registered listener.
///
/// Allocated in increasing order; the registry iterates by id, but callers
/// must not rely on delivery order within one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Characters are addressed by their listener handle.
pub type CharacterId = ListenerId;

/// Players are addressed by their listener handle.
pub type PlayerId = ListenerId;

/// Anything that reacts to events.
pub trait Listener {
    /// Handle one event. New events go through `queue`.
    fn notify(&mut self, event: &Event, queue: &mut EventQueue);
}

/// A component owned by the bus registry.
pub enum Component {
    /// Game orchestration and level
    Game(GameState),
    /// A joined player
    Player(Player),
    /// A character controller
    Character(Box<Character>),
    /// View follower
    Camera(Camera),
    /// Listener defined outside the simulation (renderer, logger, tests)
    External(Box<dyn Listener>),
}

impl Listener for Component {
    fn notify(&mut self, event: &Event, queue: &mut EventQueue) {
        match self {
            Component::Game(game) => game.notify(event, queue),
            Component::Player(player) => player.notify(event, queue),
            Component::Character(character) => character.notify(event, queue),
            Component::Camera(camera) => camera.notify(event, queue),
            Component::External(listener) => listener.notify(event, queue),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Game(_) => "Game",
            Component::Player(_) => "Player",
            Component::Character(_) => "Character",
            Component::Camera(_) => "Camera",
            Component::External(_) => "External",
        };
        f.write_str(name)
    }
}

// =============================================================================
// EVENT QUEUE
// =============================================================================

/// Pending events and pending membership changes.
///
/// This is the only bus surface a listener sees while it is being notified.
#[derive(Default)]
pub struct EventQueue {
    events: Vec<Event>,
    to_add: Vec<(ListenerId, Component)>,
    to_remove: Vec<ListenerId>,
    next_id: u32,
    draining: bool,
}

impl EventQueue {
    /// Append an event.
    ///
    /// A tick posted while a drain is in progress is dropped: the frame
    /// boundary belongs to the driver, not to listeners.
    pub fn post(&mut self, event: Event) {
        if self.draining && event.is_tick() {
            warn!("tick posted during a drain, dropping it");
            return;
        }
        self.events.push(event);
    }

    /// Queue a component for registration.
    pub fn register(&mut self, component: Component) -> ListenerId {
        self.register_with(|_| component)
    }

    /// Queue a component that needs to know its own id.
    pub fn register_with<F>(&mut self, build: F) -> ListenerId
    where
        F: FnOnce(ListenerId) -> Component,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let component = build(id);
        debug!(listener = %id, kind = ?component, "register queued");
        self.to_add.push((id, component));
        id
    }

    /// Queue a listener for removal at the next tick.
    pub fn unregister(&mut self, id: ListenerId) {
        debug!(listener = %id, "unregister queued");
        self.to_remove.push(id);
    }

    /// Number of events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Number of queued registrations.
    pub fn pending_registrations(&self) -> usize {
        self.to_add.len()
    }

    /// Number of queued removals.
    pub fn pending_removals(&self) -> usize {
        self.to_remove.len()
    }

    /// True while a drain is dispatching.
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Remove and return queued events without dispatching them.
    #[cfg(test)]
    pub(crate) fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

// =============================================================================
// EVENT BUS
// =============================================================================

/// Registry plus queue.
#[derive(Default)]
pub struct EventBus {
    queue: EventQueue,
    listeners: BTreeMap<ListenerId, Component>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a component for registration.
    pub fn register(&mut self, component: Component) -> ListenerId {
        self.queue.register(component)
    }

    /// Queue a component that needs to know its own id.
    pub fn register_with<F>(&mut self, build: F) -> ListenerId
    where
        F: FnOnce(ListenerId) -> Component,
    {
        self.queue.register_with(build)
    }

    /// Queue a listener for removal.
    pub fn unregister(&mut self, id: ListenerId) {
        self.queue.unregister(id);
    }

    /// Post an event. A tick flushes the bus and returns the number of
    /// events dispatched; anything else returns 0.
    pub fn post(&mut self, event: Event) -> usize {
        let is_tick = event.is_tick();
        self.queue.post(event);
        if is_tick {
            self.flush()
        } else {
            0
        }
    }

    /// Apply membership changes, then drain.
    fn flush(&mut self) -> usize {
        self.apply_additions();
        self.apply_removals();
        self.drain()
    }

    fn drain(&mut self) -> usize {
        self.queue.draining = true;

        let mut index = 0;
        while index < self.queue.events.len() {
            let event = self.queue.events[index].clone();
            if event.kind().should_log() {
                trace!(event = %event.kind(), index, "dispatch");
            }

            for component in self.listeners.values_mut() {
                component.notify(&event, &mut self.queue);
            }

            index += 1;
            if !self.queue.to_add.is_empty() {
                self.apply_additions();
            }
        }

        self.queue.events.clear();
        self.queue.draining = false;
        index
    }

    fn apply_additions(&mut self) {
        for (id, component) in self.queue.to_add.drain(..) {
            self.listeners.insert(id, component);
        }
    }

    fn apply_removals(&mut self) {
        for id in self.queue.to_remove.drain(..) {
            if self.listeners.remove(&id).is_some() {
                debug!(listener = %id, "unregistered");
            }
        }
    }

    /// Pending queue view.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Number of applied listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// True if `id` is applied (not merely queued).
    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    /// Look up an applied component.
    pub fn get(&self, id: ListenerId) -> Option<&Component> {
        self.listeners.get(&id)
    }

    /// Look up an applied component mutably.
    pub fn get_mut(&mut self, id: ListenerId) -> Option<&mut Component> {
        self.listeners.get_mut(&id)
    }

    /// Applied components in id order.
    pub fn components(&self) -> impl Iterator<Item = (ListenerId, &Component)> {
        self.listeners.iter().map(|(id, c)| (*id, c))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use crate::game::events::{EventKind, Facing};

    type Log = Rc<RefCell<Vec<(u32, EventKind)>>>;

    /// Records every event it sees.
    struct Recorder {
        tag: u32,
        log: Log,
    }

    impl Listener for Recorder {
        fn notify(&mut self, event: &Event, _queue: &mut EventQueue) {
            self.log.borrow_mut().push((self.tag, event.kind()));
        }
    }

    /// Registers a recorder when it sees a jump request, and posts a follow-up.
    struct Spawner {
        log: Log,
        spawned: bool,
    }

    impl Listener for Spawner {
        fn notify(&mut self, event: &Event, queue: &mut EventQueue) {
            if matches!(event, Event::CharacterJumpRequest) && !self.spawned {
                self.spawned = true;
                let log = self.log.clone();
                queue.register(Component::External(Box::new(Recorder { tag: 2, log })));
                queue.post(Event::CharacterDropRequest);
            }
        }
    }

    /// Tries to re-enter the frame boundary.
    struct TickPoster;

    impl Listener for TickPoster {
        fn notify(&mut self, event: &Event, queue: &mut EventQueue) {
            if matches!(event, Event::GameStart) {
                queue.post(Event::Tick { fps: 0 });
                queue.post(Event::GamePaused);
            }
        }
    }

    fn recorder(tag: u32, log: &Log) -> Component {
        Component::External(Box::new(Recorder { tag, log: log.clone() }))
    }

    #[test]
    fn test_post_without_tick_only_queues() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.register(recorder(1, &log));

        for expected in 1..=3 {
            assert_eq!(bus.post(Event::GameStart), 0);
            assert_eq!(bus.queue().pending(), expected);
        }
        assert!(log.borrow().is_empty());
        assert_eq!(bus.listener_count(), 0);

        let dispatched = bus.post(Event::Tick { fps: 60 });
        assert_eq!(dispatched, 4);
        assert_eq!(bus.queue().pending(), 0);
        assert_eq!(log.borrow().len(), 4);
        assert_eq!(log.borrow()[3], (1, EventKind::Tick));
    }

    #[test]
    fn test_fifo_order() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.register(recorder(1, &log));
        bus.post(Event::GameStart);
        bus.post(Event::CharacterWalkRequest { direction: Facing::Left });
        bus.post(Event::GamePause);
        bus.post(Event::Tick { fps: 60 });

        let kinds: Vec<EventKind> = log.borrow().iter().map(|(_, k)| *k).collect();
        assert_eq!(
            kinds,
            vec![EventKind::GameStart, EventKind::CharacterWalkRequest, EventKind::GamePause, EventKind::Tick]
        );
    }

    #[test]
    fn test_late_joiner_sees_later_events_only() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        bus.register(Component::External(Box::new(Spawner { log: log.clone(), spawned: false })));

        bus.post(Event::CharacterJumpRequest);
        bus.post(Event::GameStart);
        bus.post(Event::Tick { fps: 60 });

        let seen: Vec<EventKind> = log
            .borrow()
            .iter()
            .filter(|(tag, _)| *tag == 2)
            .map(|(_, k)| *k)
            .collect();
        // Not the jump that caused the registration; everything after it,
        // including the follow-up posted during the same drain.
        assert_eq!(seen, vec![EventKind::GameStart, EventKind::Tick, EventKind::CharacterDropRequest]);
    }

    #[test]
    fn test_unregister_waits_for_next_tick() {
        let log: Log = Rc::default();
        let mut bus = EventBus::new();
        let id = bus.register(recorder(1, &log));
        bus.post(Event::Tick { fps: 60 });
        assert!(bus.contains(id));

        bus.unregister(id);
        assert!(bus.contains(id));
        assert_eq!(bus.queue().pending_removals(), 1);

        bus.post(Event::Tick { fps: 60 });
        assert!(!bus.contains(id));
        // Only the first tick was delivered
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_tick_posted_inside_drain_is_dropped() {
        let mut bus = EventBus::new();
        bus.register(Component::External(Box::new(TickPoster)));
        bus.post(Event::GameStart);
        let dispatched = bus.post(Event::Tick { fps: 60 });
        // GameStart, Tick, GamePaused; the nested tick never enters the queue
        assert_eq!(dispatched, 3);
        assert!(!bus.queue().is_draining());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut bus = EventBus::new();
        let a = bus.register_with(|_| Component::External(Box::new(TickPoster)));
        let b = bus.register_with(|_| Component::External(Box::new(TickPoster)));
        assert!(a < b);
        assert_eq!(bus.queue().pending_registrations(), 2);
    }

    proptest! {
        #[test]
        fn prop_queue_grows_by_one_per_post(count in 0usize..64) {
            let log: Log = Rc::default();
            let mut bus = EventBus::new();
            bus.register(recorder(1, &log));
            bus.post(Event::Tick { fps: 60 });
            log.borrow_mut().clear();

            for n in 0..count {
                prop_assert_eq!(bus.queue().pending(), n);
                bus.post(Event::CharacterPunchRequest);
                prop_assert_eq!(bus.queue().pending(), n + 1);
            }
            prop_assert!(log.borrow().is_empty());

            prop_assert_eq!(bus.post(Event::Tick { fps: 60 }), count + 1);
            prop_assert_eq!(log.borrow().len(), count + 1);
        }
    }
}
