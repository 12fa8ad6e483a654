use crate::spatial::index::{ChunkCoord, ChunkIndex, TileRef, CHUNK_SIZE};
use macroquad::prelude::*;

const CULL_MARGIN_CHUNKS: i32 = 1;

/// Chunks covering the world-space rect between `view_min` and `view_max`,
/// row by row. The corners may come in either order.
pub fn visible_chunk_coords_rect(view_min: Vec2, view_max: Vec2) -> Vec<ChunkCoord> {
    let mut cx_min = (view_min.x.floor() as i32).div_euclid(CHUNK_SIZE);
    let mut cy_min = (view_min.y.floor() as i32).div_euclid(CHUNK_SIZE);
    let mut cx_max = (view_max.x.floor() as i32).div_euclid(CHUNK_SIZE);
    let mut cy_max = (view_max.y.floor() as i32).div_euclid(CHUNK_SIZE);

    if cx_min > cx_max {
        std::mem::swap(&mut cx_min, &mut cx_max);
    }
    if cy_min > cy_max {
        std::mem::swap(&mut cy_min, &mut cy_max);
    }

    let mut coords = Vec::new();
    for cy in cy_min..=cy_max {
        for cx in cx_min..=cx_max {
            coords.push(ChunkCoord { x: cx, y: cy });
        }
    }
    coords
}

/// Tiles in or near the view, in batch order and, within a batch, in the
/// order they were composited.
pub fn visible_tiles(index: &ChunkIndex, view_min: Vec2, view_max: Vec2) -> Vec<TileRef> {
    let pad = (CULL_MARGIN_CHUNKS * CHUNK_SIZE) as f32;
    let lo = view_min.min(view_max) - Vec2::splat(pad);
    let hi = view_min.max(view_max) + Vec2::splat(pad);

    let mut tiles: Vec<TileRef> = visible_chunk_coords_rect(lo, hi)
        .iter()
        .filter_map(|coord| index.buckets.get(coord))
        .flatten()
        .copied()
        .collect();
    tiles.sort_unstable();
    tiles.dedup();
    tiles
}
