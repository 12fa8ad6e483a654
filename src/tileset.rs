use std::rc::Rc;

use macroquad::prelude::*;

use crate::error::MapError;
use crate::ir_map::{IrTileset, TilesetRef};

pub const FLIP_H: u32 = 0x8000_0000; // bit 31
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
pub const GID_MASK: u32 = 0x1FFF_FFFF; // keep lower 29 bits (bit 28 is free)

/// A global tile id as stored in layer data, flip flags included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    #[inline] pub fn raw(self) -> u32 { self.0 }
    #[inline] pub fn clean(self) -> u32 { self.0 & GID_MASK }
    #[inline] pub fn is_empty(self) -> bool { self.clean() == 0 }
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
}

/// Where a tile's pixels come from.
#[derive(Debug, Clone)]
pub struct SourceTile {
    pub tileset: Rc<IrTileset>,
    pub local_id: u32,
    pub source: Rect,
    pub collision: Option<Rect>,
}

/// Resolves global ids against the tilesets referenced by one map.
#[derive(Debug, Clone, Default)]
pub struct TilesetTable {
    sets: Vec<TilesetRef>, // sorted by first_gid
}

impl TilesetTable {
    pub fn new(mut sets: Vec<TilesetRef>) -> Self {
        sets.sort_unstable_by_key(|t| t.first_gid);
        Self { sets }
    }

    /// The tileset owning a gid is the one with the largest `first_gid <= gid`.
    pub fn resolve(&self, gid: TileId) -> Result<SourceTile, MapError> {
        let clean = gid.clean();
        let unresolved = MapError::UnresolvedTileId { gid: clean };
        if clean == 0 {
            return Err(unresolved);
        }
        let idx = self.sets.partition_point(|t| t.first_gid <= clean);
        let Some(owner) = idx.checked_sub(1).map(|i| &self.sets[i]) else {
            return Err(unresolved);
        };
        let ts = &owner.tileset;
        let local = clean - owner.first_gid;
        if local >= ts.tilecount || ts.columns == 0 {
            return Err(unresolved);
        }

        let col = local % ts.columns;
        let row = local / ts.columns;
        let sx = ts.margin as f32 + col as f32 * (ts.tile_w as f32 + ts.spacing as f32);
        let sy = ts.margin as f32 + row as f32 * (ts.tile_h as f32 + ts.spacing as f32);

        Ok(SourceTile {
            tileset: Rc::clone(ts),
            local_id: local,
            source: Rect::new(sx, sy, ts.tile_w as f32, ts.tile_h as f32),
            collision: ts.collision.get(&local).copied(),
        })
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
