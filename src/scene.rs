//! The game scene: room registry, room switching and input dispatch.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::asset::AssetSource;
use crate::cache::ResourceCache;
use crate::character::{Character, CharacterState};
use crate::error::{GameResult, RoomError};
use crate::input::{Handler, InputEvent, InputRouter, Key, KeyFilter, Layer};
use crate::locale::{load_lines, Translate};
use crate::room::{EnterContext, Interaction, Room, RoomSpec};

/// What the caller should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneAction {
    None,
    Quit,
}

/// Room specs by key, and the rooms built from them so far.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    specs: HashMap<String, RoomSpec>,
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `rooms.json` table: an object of room key → spec.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let specs: HashMap<String, RoomSpec> = serde_json::from_str(text)?;
        Ok(Self {
            specs,
            rooms: HashMap::new(),
        })
    }

    pub fn from_assets(assets: &dyn AssetSource, path: &str) -> GameResult<Self> {
        let text = assets.read_to_string(path)?;
        let registry = Self::from_json(&text)?;
        debug!(path, rooms = registry.specs.len(), "Loaded room table");
        Ok(registry)
    }

    pub fn insert(&mut self, key: impl Into<String>, spec: RoomSpec) {
        self.specs.insert(key.into(), spec);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.specs.contains_key(key)
    }

    pub fn room(&self, key: &str) -> Option<&Room> {
        self.rooms.get(key)
    }

    pub fn room_mut(&mut self, key: &str) -> Option<&mut Room> {
        self.rooms.get_mut(key)
    }

    /// The room under `key`, constructing it on first use.
    pub fn get_or_create(&mut self, key: &str) -> Result<&mut Room, RoomError> {
        if !self.rooms.contains_key(key) {
            let spec = self
                .specs
                .get(key)
                .ok_or_else(|| RoomError::UnknownRoom(key.to_owned()))?;
            debug!(room = key, map = %spec.map, "Constructing room");
            self.rooms.insert(key.to_owned(), Room::new(key, spec.clone()));
        }
        self.rooms
            .get_mut(key)
            .ok_or_else(|| RoomError::UnknownRoom(key.to_owned()))
    }

    /// Number of rooms constructed so far.
    pub fn constructed(&self) -> usize {
        self.rooms.len()
    }
}

/// Lines being shown in the message overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialogue {
    region: String,
    lines: Vec<String>,
    cursor: usize,
}

impl Dialogue {
    pub fn new(region: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            region: region.into(),
            lines,
            cursor: 0,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn current(&self) -> Option<&str> {
        self.lines.get(self.cursor).map(String::as_str)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves to the next line. Returns `false` once past the last one.
    pub fn advance(&mut self) -> bool {
        self.cursor += 1;
        self.cursor < self.lines.len()
    }
}

pub struct GameScene {
    character: Character,
    registry: RoomRegistry,
    router: InputRouter,
    cache: ResourceCache,
    current: Option<String>,
    dialogue: Option<Dialogue>,
}

impl GameScene {
    pub fn new(cache: ResourceCache, registry: RoomRegistry) -> Self {
        Self {
            character: Character::new(),
            registry,
            router: InputRouter::new(),
            cache,
            current: None,
            dialogue: None,
        }
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn character_mut(&mut self) -> &mut Character {
        &mut self.character
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn dialogue(&self) -> Option<&Dialogue> {
        self.dialogue.as_ref()
    }

    pub fn current_key(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.current.as_deref().and_then(|k| self.registry.room(k))
    }

    pub fn enter_scene(&mut self, start: &str) -> Result<(), RoomError> {
        self.router
            .push(Layer::Scene, Handler::Character, KeyFilter::Movement);
        self.switch_room(start, None)
    }

    pub fn leave_scene(&mut self) {
        self.close_dialogue(false);
        if let Some(room) = self.current.take().and_then(|k| self.registry.room_mut(&k)) {
            room.leave(&mut self.router);
        }
        self.router.remove(&Handler::Character);
    }

    /// Leaves the current room, then enters `key`. An unknown key fails
    /// before anything is left.
    pub fn switch_room(&mut self, key: &str, spawn: Option<&str>) -> Result<(), RoomError> {
        if !self.registry.contains(key) {
            return Err(RoomError::UnknownRoom(key.to_owned()));
        }
        self.close_dialogue(false);

        if let Some(prev) = self.current.take() {
            if let Some(room) = self.registry.room_mut(&prev) {
                room.leave(&mut self.router);
            }
        }

        let room = self.registry.get_or_create(key)?;
        room.enter(EnterContext {
            cache: &mut self.cache,
            character: &mut self.character,
            router: &mut self.router,
            spawn,
        })?;
        self.current = Some(key.to_owned());
        info!(room = key, "Switched room");
        Ok(())
    }

    /// Routes one input event to the handler on top of the router.
    pub fn handle_input(&mut self, event: &InputEvent) -> Result<SceneAction, RoomError> {
        match self.router.route(event).cloned() {
            Some(Handler::Character) => {
                self.character.handle_input(event);
            }
            Some(Handler::Room(_)) => {
                if *event == InputEvent::Released(Key::Interact) {
                    self.interact()?;
                }
            }
            Some(Handler::Dialogue) => {
                if *event == InputEvent::Released(Key::Interact) {
                    let more = self.dialogue.as_mut().is_some_and(|d| d.advance());
                    if !more {
                        self.close_dialogue(true);
                    }
                }
            }
            None => {
                if *event == InputEvent::Pressed(Key::Escape) {
                    return Ok(SceneAction::Quit);
                }
            }
        }
        Ok(SceneAction::None)
    }

    /// Advances the character by one tick inside the current room.
    pub fn tick(&mut self, dt: f32) {
        let Some(key) = self.current.as_deref() else {
            return;
        };
        if let Some(room) = self.registry.room_mut(key) {
            self.character.tick(dt, room);
        }
    }

    /// All of a frame's input first, then the movement tick.
    pub fn frame(&mut self, events: &[InputEvent], dt: f32) -> Result<SceneAction, RoomError> {
        let mut action = SceneAction::None;
        for event in events {
            if self.handle_input(event)? == SceneAction::Quit {
                action = SceneAction::Quit;
            }
        }
        self.tick(dt);
        Ok(action)
    }

    fn interact(&mut self) -> Result<(), RoomError> {
        let Some(key) = self.current.clone() else {
            return Ok(());
        };
        let Some(room) = self.registry.room_mut(&key) else {
            return Ok(());
        };
        let Some(trigger) = room.interact(&self.character).cloned() else {
            return Ok(());
        };
        room.dismiss_hint();
        debug!(room = %key, region = %trigger.region, "Trigger fired");
        if let Some(bubble) = trigger.bubble {
            self.character.set_bubble(Some(bubble));
        }

        match trigger.interaction {
            Interaction::Message { text } => {
                let line = self.cache.translate(&text);
                self.open_dialogue(&trigger.region, vec![line]);
            }
            Interaction::Dialogue { prefix } => {
                let lines = load_lines(&self.cache, &prefix);
                if lines.is_empty() {
                    warn!(%prefix, "Dialogue has no translated lines");
                } else {
                    self.open_dialogue(&trigger.region, lines);
                }
            }
            Interaction::Door { room, spawn } => {
                self.switch_room(&room, spawn.as_deref())?;
            }
        }
        Ok(())
    }

    fn open_dialogue(&mut self, region: &str, lines: Vec<String>) {
        self.character.set_state(CharacterState::Controlled);
        self.router
            .push(Layer::Overlay, Handler::Dialogue, KeyFilter::All);
        self.dialogue = Some(Dialogue::new(region, lines));
    }

    /// Drops the overlay. `completed` marks the region as seen in room data.
    fn close_dialogue(&mut self, completed: bool) {
        let Some(dialogue) = self.dialogue.take() else {
            return;
        };
        self.router.remove(&Handler::Dialogue);
        self.character.set_state(CharacterState::Idle);
        if completed {
            if let Some(room) = self.current.as_deref().and_then(|k| self.registry.room_mut(k)) {
                room.set_data(format!("{}.seen", dialogue.region), true);
            }
        }
    }
}
