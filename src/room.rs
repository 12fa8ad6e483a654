//! A room: one map's tiles, collision geometry, spawn points and triggers,
//! plus the lifecycle that loads it once and enters/leaves it many times.

use std::collections::{BTreeMap, HashMap};

use macroquad::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::cache::ResourceCache;
use crate::character::{Bubble, Character, MovementGate};
use crate::direction::Direction;
use crate::error::RoomError;
use crate::geometry::{self, CollisionRegion};
use crate::input::{Handler, InputRouter, Key, KeyFilter, Layer};
use crate::map::{DrawPass, LayerName, MapObject, ObjectKind, Tile, TiledMap};
use crate::render::cull::visible_tiles;
use crate::spatial::index::{ChunkIndex, TileRef};

/// Offset added to the character's y when depth-sorting special tiles.
pub const DEPTH_OFFSET: f32 = 4.0;

fn default_objects_layer() -> String {
    "objects".to_owned()
}

fn default_entry_spawn() -> String {
    "start".to_owned()
}

/// Static description of a room, as listed in `rooms.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomSpec {
    pub map: String,
    #[serde(default = "default_objects_layer")]
    pub objects_layer: String,
    #[serde(default = "default_entry_spawn")]
    pub entry_spawn: String,
    #[serde(default)]
    pub entry_facing: Direction,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl RoomSpec {
    pub fn new(map: impl Into<String>) -> Self {
        Self {
            map: map.into(),
            objects_layer: default_objects_layer(),
            entry_spawn: default_entry_spawn(),
            entry_facing: Direction::default(),
            triggers: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }
}

/// Something that happens when the character interacts with a region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trigger {
    pub region: String,
    pub interaction: Interaction,
    #[serde(default)]
    pub bubble: Option<Bubble>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    /// One translated line.
    Message { text: String },
    /// Lines `prefix.0`, `prefix.1`, ... for as long as they translate.
    Dialogue { prefix: String },
    /// Switch to another room, optionally at a named spawn point.
    Door {
        room: String,
        #[serde(default)]
        spawn: Option<String>,
    },
}

/// A room-data value. Primitives only, so room data always serialises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for RoomValue {
    fn from(v: bool) -> Self {
        RoomValue::Bool(v)
    }
}

impl From<i64> for RoomValue {
    fn from(v: i64) -> Self {
        RoomValue::Int(v)
    }
}

impl From<f64> for RoomValue {
    fn from(v: f64) -> Self {
        RoomValue::Float(v)
    }
}

impl From<&str> for RoomValue {
    fn from(v: &str) -> Self {
        RoomValue::Text(v.to_owned())
    }
}

impl From<String> for RoomValue {
    fn from(v: String) -> Self {
        RoomValue::Text(v)
    }
}

pub type RoomData = BTreeMap<String, RoomValue>;

/// Tiles of one map layer, drawn in one pass.
#[derive(Debug, Clone)]
pub struct Batch {
    pub pass: DrawPass,
    pub order: i32,
    pub name: String,
    pub tiles: Vec<Tile>,
}

/// A sprite drawn either behind or in front of the character.
#[derive(Debug, Clone)]
pub struct SpecialTile {
    pub name: String,
    pub tile: Tile,
    pub behind: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawItem<'a> {
    Tile(&'a Tile),
    Character,
}

/// What a room needs while being entered.
pub struct EnterContext<'a> {
    pub cache: &'a mut ResourceCache,
    pub character: &'a mut Character,
    pub router: &'a mut InputRouter,
    /// Spawn point name; the room's entry spawn when `None`.
    pub spawn: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Room {
    key: String,
    spec: RoomSpec,
    loaded: bool,
    active: bool,
    pixel_size: Vec2,
    background: [u8; 4],
    batches: Vec<Batch>,
    index: ChunkIndex,
    regions: Vec<CollisionRegion>,
    spawn_points: HashMap<String, Vec2>,
    special_tiles: Vec<SpecialTile>,
    hint_visible: bool,
    data: RoomData,
}

impl Room {
    /// Cheap: nothing is decoded until the room is first entered.
    pub fn new(key: impl Into<String>, spec: RoomSpec) -> Self {
        Self {
            key: key.into(),
            spec,
            loaded: false,
            active: false,
            pixel_size: Vec2::ZERO,
            background: [0, 0, 0, 255],
            batches: Vec::new(),
            index: ChunkIndex::new(),
            regions: Vec::new(),
            spawn_points: HashMap::new(),
            special_tiles: Vec::new(),
            hint_visible: true,
            data: RoomData::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn spec(&self) -> &RoomSpec {
        &self.spec
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pixel_size(&self) -> Vec2 {
        self.pixel_size
    }

    pub fn background(&self) -> [u8; 4] {
        self.background
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn regions(&self) -> &[CollisionRegion] {
        &self.regions
    }

    pub fn spawn_point(&self, name: &str) -> Option<Vec2> {
        self.spawn_points.get(name).copied()
    }

    pub fn special_tiles(&self) -> &[SpecialTile] {
        &self.special_tiles
    }

    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn dismiss_hint(&mut self) {
        self.hint_visible = false;
    }

    /// Decodes the room's map. Runs once; later calls return immediately.
    pub fn load(&mut self, cache: &mut ResourceCache) -> Result<(), RoomError> {
        if self.loaded {
            return Ok(());
        }
        let map = cache.map(&self.spec.map)?;
        self.load_from(&map)?;
        self.loaded = true;
        info!(
            room = %self.key,
            map = %self.spec.map,
            batches = self.batches.len(),
            regions = self.regions.len(),
            spawns = self.spawn_points.len(),
            special = self.special_tiles.len(),
            "Room loaded"
        );
        Ok(())
    }

    fn load_from(&mut self, map: &TiledMap) -> Result<(), RoomError> {
        let (w, h) = map.pixel_size();
        self.pixel_size = vec2(w as f32, h as f32);
        self.background = map.ir.background_rgba();

        let mut batches = Vec::new();
        for layer in map.layers()? {
            let LayerName { pass, order } = layer.name.parse::<LayerName>()?;
            batches.push(Batch {
                pass,
                order,
                name: layer.name,
                tiles: layer.tiles,
            });
        }
        batches.sort_by_key(|b| (b.pass, b.order));

        let mut index = ChunkIndex::new();
        for (bi, batch) in batches.iter().enumerate() {
            for (ti, tile) in batch.tiles.iter().enumerate() {
                let tile_ref = TileRef {
                    batch: bi as u16,
                    tile: ti as u32,
                };
                index.add_tile(tile_ref, Rect::new(tile.dest.x, tile.dest.y, tile.size.x, tile.size.y));
            }
        }

        let mut regions = Vec::new();
        let mut spawn_points = HashMap::new();
        let mut special_tiles = Vec::new();
        for obj in map.objects(&self.spec.objects_layer) {
            match obj.kind {
                ObjectKind::CollisionRect => regions.push(region_from_object(&obj)),
                ObjectKind::SpawnPoint => {
                    let name = named_by(&obj, "sp_name");
                    spawn_points.insert(name, obj.position);
                }
                ObjectKind::SpecialTile => match map.tile_for_object(&obj)? {
                    Some(tile) => special_tiles.push(SpecialTile {
                        name: obj.name.clone(),
                        tile,
                        behind: false,
                    }),
                    None => warn!(room = %self.key, object = obj.id, "Special tile object has no gid"),
                },
                ObjectKind::Unknown => {
                    trace!(room = %self.key, object = obj.id, class = %obj.class_name, "Ignoring object")
                }
            }
        }

        self.batches = batches;
        self.index = index;
        self.regions = regions;
        self.spawn_points = spawn_points;
        self.special_tiles = special_tiles;
        Ok(())
    }

    /// Places the character and takes over the room input slot.
    pub fn enter(&mut self, ctx: EnterContext<'_>) -> Result<(), RoomError> {
        self.load(ctx.cache)?;

        let spawn = ctx.spawn.unwrap_or(&self.spec.entry_spawn).to_owned();
        let pos = self
            .spawn_point(&spawn)
            .ok_or_else(|| RoomError::MissingSpawnPoint {
                room: self.key.clone(),
                spawn: spawn.clone(),
            })?;
        ctx.character.set_position(pos);
        ctx.character.set_direction(self.spec.entry_facing);
        self.hint_visible = true;
        self.redepth(pos);

        ctx.router.push(
            Layer::Room,
            Handler::Room(self.key.clone()),
            KeyFilter::Only(Key::Interact),
        );
        self.active = true;
        debug!(room = %self.key, %spawn, x = pos.x, y = pos.y, "Entered room");
        Ok(())
    }

    pub fn leave(&mut self, router: &mut InputRouter) {
        if !router.remove(&Handler::Room(self.key.clone())) {
            warn!(room = %self.key, "Leaving a room that held no input handler");
        }
        self.active = false;
        debug!(room = %self.key, "Left room");
    }

    /// Whether the character may stand at `pos`. Accepted positions also
    /// re-sort special tiles around the character.
    ///
    /// # Panics
    /// When the room has not been loaded.
    pub fn allow_move(&mut self, pos: Vec2) -> bool {
        assert!(self.loaded, "movement query against room '{}' before load", self.key);
        let allowed = geometry::allow_move(&self.regions, pos);
        if allowed {
            self.redepth(pos);
        }
        allowed
    }

    fn redepth(&mut self, pos: Vec2) {
        let char_y = pos.y + DEPTH_OFFSET;
        for special in &mut self.special_tiles {
            special.behind = special.tile.dest.y > char_y;
        }
    }

    /// Whether `character` can interact with the region called `name`.
    pub fn check_collide(&self, name: &str, character: &Character) -> bool {
        match self.regions.iter().find(|r| r.name == name) {
            Some(region) => geometry::check_interact(region, character.position(), character.direction()),
            None => {
                warn!(room = %self.key, region = name, "Unknown collision region");
                false
            }
        }
    }

    /// The first trigger whose region the character is touching.
    pub fn interact(&self, character: &Character) -> Option<&Trigger> {
        self.spec
            .triggers
            .iter()
            .find(|t| self.check_collide(&t.region, character))
    }

    pub fn data(&self) -> &RoomData {
        &self.data
    }

    pub fn get_data(&self, key: &str) -> Option<&RoomValue> {
        self.data.get(key)
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<RoomValue>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn data_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.data)
    }

    /// Draw order for the world rect `view_min..view_max`: back batches, the
    /// char batch with special tiles split around the character, fore batches.
    pub fn draw_list(&self, view_min: Vec2, view_max: Vec2) -> Vec<DrawItem<'_>> {
        let mut items = Vec::new();
        let mut refs = visible_tiles(&self.index, view_min, view_max).into_iter().peekable();
        for pass in [DrawPass::Back, DrawPass::Char, DrawPass::Fore] {
            while let Some(r) = refs.peek() {
                let batch = &self.batches[r.batch as usize];
                if batch.pass != pass {
                    break;
                }
                items.push(DrawItem::Tile(&batch.tiles[r.tile as usize]));
                refs.next();
            }
            if pass == DrawPass::Char {
                let (behind, front): (Vec<_>, Vec<_>) =
                    self.special_tiles.iter().partition(|s| s.behind);
                items.extend(behind.into_iter().map(|s| DrawItem::Tile(&s.tile)));
                items.push(DrawItem::Character);
                items.extend(front.into_iter().map(|s| DrawItem::Tile(&s.tile)));
            }
        }
        items
    }
}

impl MovementGate for Room {
    fn allow_move(&mut self, pos: Vec2) -> bool {
        Room::allow_move(self, pos)
    }
}

fn named_by(obj: &MapObject, property: &str) -> String {
    obj.properties
        .get_string(property)
        .filter(|s| !s.is_empty())
        .unwrap_or(&obj.name)
        .to_owned()
}

fn region_from_object(obj: &MapObject) -> CollisionRegion {
    let walkable = obj.properties.get_bool("can_walk").unwrap_or(false);
    let name = named_by(obj, "cr_name");
    match &obj.polygon {
        Some(points) => CollisionRegion::polygon(name, points.clone(), walkable),
        None => CollisionRegion::rect(name, obj.rect(), walkable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir_map::{Properties, PropertyValue};
    use crate::tileset::TileId;
    use std::rc::Rc;

    fn object(kind: ObjectKind, name: &str, rect: Rect) -> MapObject {
        MapObject {
            id: 1,
            name: name.into(),
            kind,
            class_name: String::new(),
            position: rect.point(),
            size: rect.size(),
            gid: None,
            polygon: None,
            properties: Properties::new(),
        }
    }

    fn tile_at(y: f32) -> Tile {
        Tile {
            gid: TileId(1),
            image: Rc::from("t.png"),
            source: Rect::new(0.0, 0.0, 16.0, 16.0),
            dest: vec2(0.0, y),
            size: vec2(16.0, 16.0),
            collision: None,
        }
    }

    fn loaded_room() -> Room {
        let mut room = Room::new("test", RoomSpec::new("test"));
        room.regions = vec![CollisionRegion::rect("floor", Rect::new(0.0, 0.0, 100.0, 100.0), true)];
        room.special_tiles = vec![SpecialTile {
            name: "flap".into(),
            tile: tile_at(50.0),
            behind: false,
        }];
        room.loaded = true;
        room
    }

    #[test]
    fn region_names_prefer_property() {
        let mut obj = object(ObjectKind::CollisionRect, "rect_3", Rect::new(0.0, 0.0, 10.0, 10.0));
        obj.properties.insert("cr_name".into(), PropertyValue::String("cup".into()));
        let region = region_from_object(&obj);
        assert_eq!(region.name, "cup");
        assert!(!region.walkable);

        obj.properties.insert("can_walk".into(), PropertyValue::Bool(true));
        obj.properties.insert("cr_name".into(), PropertyValue::String(String::new()));
        let region = region_from_object(&obj);
        assert_eq!(region.name, "rect_3");
        assert!(region.walkable);
    }

    #[test]
    fn polygon_objects_become_polygon_regions() {
        let mut obj = object(ObjectKind::CollisionRect, "slope", Rect::new(0.0, 0.0, 0.0, 0.0));
        obj.polygon = Some(vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(0.0, 10.0)]);
        let region = region_from_object(&obj);
        assert!(matches!(region.shape, geometry::Shape::Polygon(ref v) if v.len() == 3));
    }

    #[test]
    fn accepted_moves_redepth_special_tiles() {
        let mut room = loaded_room();
        // Flap at y = 50; character feet at y + 4.
        assert!(room.allow_move(vec2(0.0, 20.0)));
        assert!(room.special_tiles[0].behind);
        assert!(room.allow_move(vec2(0.0, 46.0)));
        assert!(!room.special_tiles[0].behind);

        // Rejected moves leave depth alone.
        assert!(!room.allow_move(vec2(0.0, 500.0)));
        assert!(!room.special_tiles[0].behind);
    }

    #[test]
    fn redepth_does_not_change_the_answer() {
        let mut room = loaded_room();
        for p in [vec2(0.0, 20.0), vec2(0.0, 60.0), vec2(300.0, 0.0)] {
            let first = room.allow_move(p);
            assert_eq!(room.allow_move(p), first);
        }
    }

    #[test]
    #[should_panic(expected = "before load")]
    fn movement_before_load_panics() {
        let mut room = Room::new("test", RoomSpec::new("test"));
        room.allow_move(Vec2::ZERO);
    }

    #[test]
    fn draw_list_puts_character_between_special_tiles() {
        let mut room = loaded_room();
        room.special_tiles.push(SpecialTile {
            name: "bush".into(),
            tile: tile_at(0.0),
            behind: false,
        });
        room.allow_move(vec2(0.0, 20.0));
        let items = room.draw_list(Vec2::ZERO, vec2(800.0, 600.0));
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], DrawItem::Tile(t) if t.dest.y == 50.0));
        assert_eq!(items[1], DrawItem::Character);
        assert!(matches!(items[2], DrawItem::Tile(t) if t.dest.y == 0.0));
    }

    #[test]
    fn unknown_regions_never_collide() {
        let room = loaded_room();
        assert!(!room.check_collide("nowhere", &Character::new()));
    }

    #[test]
    fn room_data_is_json() {
        let mut room = loaded_room();
        room.set_data("cup.seen", true);
        room.set_data("visits", 2i64);
        room.set_data("mood", "calm");
        assert_eq!(room.data_json().unwrap(), r#"{"cup.seen":true,"mood":"calm","visits":2}"#);
        assert_eq!(room.get_data("visits"), Some(&RoomValue::Int(2)));
    }

    #[test]
    fn specs_deserialize_with_defaults() {
        let spec: RoomSpec = serde_json::from_str(
            r#"{
                "map": "example",
                "triggers": [
                    {"region": "cup", "bubble": "dots",
                     "interaction": {"kind": "dialogue", "prefix": "room.start.cup"}},
                    {"region": "gate",
                     "interaction": {"kind": "door", "room": "camp"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.objects_layer, "objects");
        assert_eq!(spec.entry_spawn, "start");
        assert_eq!(spec.entry_facing, Direction::Up);
        assert_eq!(spec.triggers[0].bubble, Some(Bubble::Dots));
        assert_eq!(
            spec.triggers[1].interaction,
            Interaction::Door { room: "camp".into(), spawn: None }
        );
    }
}
