//! Key bindings and the layered input router.
//!
//! Handlers sit on a stack split into three layers. An event goes to the
//! top-most entry that accepts its key; lower entries never see it. The room
//! layer holds at most one entry, so a room must be deregistered before the
//! next one registers.

use std::collections::HashMap;

use macroquad::prelude::KeyCode;
use strum_macros::Display;
use tracing::debug;

use crate::direction::Direction;

/// Game-level keys, independent of the physical binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Key {
    Move(Direction),
    Run,
    Interact,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(Key),
    Released(Key),
}

impl InputEvent {
    pub fn key(&self) -> Key {
        match self {
            InputEvent::Pressed(k) | InputEvent::Released(k) => *k,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bindings {
    key_bindings: HashMap<KeyCode, Key>,
}

impl Default for Bindings {
    fn default() -> Self {
        let mut key_bindings = HashMap::new();

        key_bindings.insert(KeyCode::Up, Key::Move(Direction::Up));
        key_bindings.insert(KeyCode::Down, Key::Move(Direction::Down));
        key_bindings.insert(KeyCode::Left, Key::Move(Direction::Left));
        key_bindings.insert(KeyCode::Right, Key::Move(Direction::Right));

        key_bindings.insert(KeyCode::LeftShift, Key::Run);
        key_bindings.insert(KeyCode::Space, Key::Interact);
        key_bindings.insert(KeyCode::Escape, Key::Escape);

        Self { key_bindings }
    }
}

impl Bindings {
    pub fn get(&self, code: KeyCode) -> Option<Key> {
        self.key_bindings.get(&code).copied()
    }

    pub fn codes(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.key_bindings.keys().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Layer {
    Scene,
    Room,
    Overlay,
}

/// Who receives a routed event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Handler {
    Character,
    Room(String),
    Dialogue,
}

/// Which keys an entry claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFilter {
    All,
    Movement,
    Only(Key),
}

impl KeyFilter {
    pub fn accepts(&self, key: Key) -> bool {
        match self {
            KeyFilter::All => true,
            KeyFilter::Movement => matches!(key, Key::Move(_) | Key::Run),
            KeyFilter::Only(k) => *k == key,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    layer: Layer,
    handler: Handler,
    filter: KeyFilter,
}

#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    entries: Vec<Entry>, // bottom first, grouped by layer
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a handler on top of its layer.
    ///
    /// # Panics
    /// When a second room handler is registered.
    pub fn push(&mut self, layer: Layer, handler: Handler, filter: KeyFilter) {
        if layer == Layer::Room {
            assert!(
                self.room_handler().is_none(),
                "room handler {:?} registered while {:?} is still active",
                handler,
                self.room_handler()
            );
        }
        let at = self.entries.partition_point(|e| e.layer <= layer);
        debug!(%layer, ?handler, "Input handler pushed");
        self.entries.insert(at, Entry { layer, handler, filter });
    }

    /// Removes the top-most entry for `handler`. Returns whether one existed.
    pub fn remove(&mut self, handler: &Handler) -> bool {
        match self.entries.iter().rposition(|e| &e.handler == handler) {
            Some(idx) => {
                self.entries.remove(idx);
                debug!(?handler, "Input handler removed");
                true
            }
            None => false,
        }
    }

    pub fn route(&self, event: &InputEvent) -> Option<&Handler> {
        let key = event.key();
        self.entries
            .iter()
            .rev()
            .find(|e| e.filter.accepts(key))
            .map(|e| &e.handler)
    }

    pub fn room_handler(&self) -> Option<&str> {
        self.entries.iter().find_map(|e| match &e.handler {
            Handler::Room(key) if e.layer == Layer::Room => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn contains(&self, handler: &Handler) -> bool {
        self.entries.iter().any(|e| &e.handler == handler)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
