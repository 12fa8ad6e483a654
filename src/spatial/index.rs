use macroquad::prelude::*;
use std::collections::HashMap;

pub const CHUNK_SIZE: i32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

/// Position of a tile inside a room's batches: `batches[batch].tiles[tile]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileRef {
    pub batch: u16,
    pub tile: u32,
}

#[inline]
pub fn world_to_chunk(p: Vec2) -> ChunkCoord {
    ChunkCoord {
        x: (p.x.floor() as i32).div_euclid(CHUNK_SIZE),
        y: (p.y.floor() as i32).div_euclid(CHUNK_SIZE),
    }
}

/// Static tiles bucketed by the chunks their rect overlaps.
#[derive(Debug, Clone, Default)]
pub struct ChunkIndex {
    pub buckets: HashMap<ChunkCoord, Vec<TileRef>>,
    len: usize,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tile covering `world`. A tile straddling a chunk border is
    /// recorded in every chunk it touches.
    pub fn add_tile(&mut self, tile: TileRef, world: Rect) {
        let min = world_to_chunk(world.point());
        let max = world_to_chunk(world.point() + world.size() - Vec2::splat(0.5).min(world.size()));
        for cy in min.y..=max.y {
            for cx in min.x..=max.x {
                self.buckets
                    .entry(ChunkCoord { x: cx, y: cy })
                    .or_default()
                    .push(tile);
            }
        }
        self.len += 1;
    }

    /// Number of distinct tiles added.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
