// src/ir_map.rs
use macroquad::prelude::*;
use std::collections::HashMap;
use std::rc::Rc;

/// Parsed TMX document, before any tile compositing.
#[derive(Debug, Clone)]
pub struct IrMap {
    pub version: String,
    pub orientation: String,
    pub render_order: String,
    pub background_color: String,
    pub tile_w: u32,
    pub tile_h: u32,
    pub width: u32,  // in tiles
    pub height: u32, // in tiles
    pub infinite: bool,
    pub tilesets: Vec<TilesetRef>, // sorted by first_gid
    pub layers: Vec<IrLayer>,      // draw order: document order
    pub object_groups: Vec<IrObjectGroup>,
}

impl IrMap {
    /// Map size in pixels, or `(-1, -1)` for infinite maps.
    pub fn pixel_size(&self) -> (i32, i32) {
        if self.infinite {
            return (-1, -1);
        }
        let px = |cells: u32, tile: u32| {
            i32::try_from(u64::from(cells) * u64::from(tile)).unwrap_or(i32::MAX)
        };
        (px(self.width, self.tile_w), px(self.height, self.tile_h))
    }

    /// Background colour as RGBA. `#RRGGBB` is opaque, `#AARRGGBB` carries alpha.
    pub fn background_rgba(&self) -> [u8; 4] {
        parse_hex_color(&self.background_color).unwrap_or([0, 0, 0, 255])
    }
}

fn parse_hex_color(s: &str) -> Option<[u8; 4]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    let value = u32::from_str_radix(hex, 16).ok()?;
    let [a, r, g, b] = value.to_be_bytes();
    match hex.len() {
        6 => Some([r, g, b, 255]),
        8 => Some([r, g, b, if a == 0 { 255 } else { a }]),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct TilesetRef {
    pub first_gid: u32,
    pub tileset: Rc<IrTileset>,
}

/// One image atlas with a regular grid.
#[derive(Debug, Clone)]
pub struct IrTileset {
    pub name: String,
    pub image: String, // logical path, already resolved against the tileset file
    pub image_w: u32,
    pub image_h: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub tilecount: u32,
    pub columns: u32,
    pub spacing: u32, // 0 if not used
    pub margin: u32,  // 0 if not used
    /// Per-tile collision boxes, relative to the tile.
    pub collision: HashMap<u32, Rect>,
}

#[derive(Debug, Clone)]
pub struct IrLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u32>, // raw GIDs (flip flags kept)
}

#[derive(Debug, Clone)]
pub struct IrObjectGroup {
    pub name: String,
    pub objects: Vec<IrObject>,
}

/// An object exactly as written in the document (Tiled's y-down space).
#[derive(Debug, Clone)]
pub struct IrObject {
    pub id: u32,
    pub name: String,
    pub class_name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub gid: Option<u32>,
    /// Polygon points relative to `(x, y)`.
    pub polygon: Option<Vec<Vec2>>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    I64(i64),
    F32(f32),
    String(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(HashMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, value: PropertyValue) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            PropertyValue::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
