#![allow(dead_code)]

use mystery::cache::ResourceCache;
use mystery::locale::StringTable;
use mystery::scene::{GameScene, RoomRegistry};
use mystery::MemoryAssets;

pub const TILESET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="terrain" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="../../textures/terrain.png" width="32" height="32"/>
 <tile id="1">
  <objectgroup draworder="index">
   <object id="1" x="0" y="8" width="16" height="8"/>
  </objectgroup>
 </tile>
</tileset>
"#;

/// 20×15 cells of 16 px: 320×240 px.
///
/// World-space (y-up) layout after inversion:
/// - `floor`  walkable 0..320 × 0..240
/// - `table`  obstacle 150..200 × 150..200
/// - `door`   obstacle 40..80 × 200..240
/// - spawns   `start` (40, 40), `by_table` (104, 160), `by_door` (28, 184)
/// - `fern`   special tile at (100, 120)
pub const OBJECTS: &str = r#"<objectgroup id="4" name="objects">
  <object id="1" name="floor" type="CRect" x="0" y="0" width="320" height="240">
   <properties><property name="can_walk" type="bool" value="true"/></properties>
  </object>
  <object id="2" name="rect_2" type="CRect" x="150" y="40" width="50" height="50">
   <properties><property name="cr_name" value="table"/></properties>
  </object>
  <object id="3" name="rect_3" type="CRect" x="40" y="0" width="40" height="40">
   <properties><property name="cr_name" value="door"/></properties>
  </object>
  <object id="4" name="start" type="SPoint" x="40" y="200"/>
  <object id="5" name="by_table" type="SPoint" x="104" y="80"/>
  <object id="6" name="by_door" type="SPoint" x="28" y="56"/>
  <object id="7" name="fern" type="IObj" gid="2" x="100" y="120" width="16" height="16"/>
 </objectgroup>"#;

pub fn csv(width: usize, height: usize, gid_at: impl Fn(usize, usize) -> u32) -> String {
    (0..height)
        .map(|row| {
            (0..width)
                .map(|col| gid_at(col, row).to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

pub fn layer(id: u32, name: &str, data: &str) -> String {
    format!(
        r#"<layer id="{id}" name="{name}" width="20" height="15"><data encoding="csv">
{data}
</data></layer>"#
    )
}

pub fn example_map() -> String {
    format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" tiledversion="1.10.2" orientation="orthogonal" renderorder="right-down" width="20" height="15" tilewidth="16" tileheight="16" infinite="0" backgroundcolor="#202830">
 <tileset firstgid="1" source="tilesets/terrain.tsx"/>
 {fore}
 {back}
 {char}
 {objects}
</map>"##,
        // Out of order on purpose: batches sort by pass, not document order.
        fore = layer(3, "fore_0", &csv(20, 15, |_, _| 0)),
        back = layer(1, "back_0", &csv(20, 15, |_, _| 1)),
        char = layer(2, "char_0", &csv(20, 15, |col, row| u32::from(col == 3 && row == 3) * 3)),
        objects = OBJECTS,
    )
}

pub const ROOMS: &str = r#"{
  "start": {
    "map": "example",
    "triggers": [
      { "region": "table", "interaction": { "kind": "dialogue", "prefix": "dialogue.table" } },
      { "region": "door", "interaction": { "kind": "door", "room": "hall", "spawn": "start" } }
    ]
  },
  "hall": {
    "map": "example",
    "entry_spawn": "by_door",
    "entry_facing": "down",
    "triggers": [
      { "region": "table", "interaction": { "kind": "message", "text": "sign" }, "bubble": "exclamation" }
    ]
  },
  "quiet": {
    "map": "example",
    "triggers": [
      { "region": "table", "interaction": { "kind": "dialogue", "prefix": "room.start.plot" } }
    ]
  },
  "broken": { "map": "example", "entry_spawn": "nowhere" }
}"#;

pub const EN_US: &str = r#"{
  "dialogue.table.0": "An old table.",
  "dialogue.table.1": "Someone left a cup on it.",
  "sign": "Keep out"
}"#;

pub fn assets() -> MemoryAssets {
    MemoryAssets::new()
        .with("maps/example.tmx", example_map())
        .with("maps/tilesets/terrain.tsx", TILESET)
        .with("rooms.json", ROOMS)
        .with("lang/en_us.json", EN_US)
}

pub fn cache() -> ResourceCache {
    let assets = assets();
    let strings = StringTable::load(&assets, "en_us");
    ResourceCache::new(Box::new(assets), strings)
}

pub fn scene() -> GameScene {
    let cache = cache();
    let registry = RoomRegistry::from_assets(cache.assets(), "rooms.json").unwrap();
    GameScene::new(cache, registry)
}
