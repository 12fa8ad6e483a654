//! Containment tests and the movement/interaction rules built on them.
//!
//! Everything here is a pure function of the regions and a character
//! position. Positions are the bottom-left corner of the 64x64 character
//! sprite, in y-up world space.

use macroquad::prelude::*;

use crate::direction::Direction;

/// Offsets of the two feet probed by [`allow_move`].
pub const PROBE_OFFSETS: [Vec2; 2] = [Vec2::new(20.0, 4.0), Vec2::new(44.0, 4.0)];

/// Offset of the footprint centre used for walkable-region interaction.
pub const CENTER_OFFSET: Vec2 = Vec2::new(32.0, 4.0);

/// Boundary-inclusive axis-aligned containment.
pub fn rect_contains(rect: &Rect, p: Vec2) -> bool {
    p.x >= rect.x && p.x <= rect.x + rect.w && p.y >= rect.y && p.y <= rect.y + rect.h
}

/// Even-odd ray casting. Points on an edge land on a fixed side of it, so
/// repeated queries always agree.
pub fn polygon_contains(vertices: &[Vec2], p: Vec2) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect(Rect),
    Polygon(Vec<Vec2>),
}

impl Shape {
    pub fn contains(&self, p: Vec2) -> bool {
        match self {
            Shape::Rect(r) => rect_contains(r, p),
            Shape::Polygon(v) => polygon_contains(v, p),
        }
    }
}

/// A named piece of room geometry: ground to stand on, or an obstacle.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRegion {
    pub name: String,
    pub shape: Shape,
    pub walkable: bool,
}

impl CollisionRegion {
    pub fn rect(name: impl Into<String>, rect: Rect, walkable: bool) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Rect(rect),
            walkable,
        }
    }

    pub fn polygon(name: impl Into<String>, vertices: Vec<Vec2>, walkable: bool) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Polygon(vertices),
            walkable,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.shape.contains(p)
    }
}

pub fn probe_points(pos: Vec2) -> [Vec2; 2] {
    PROBE_OFFSETS.map(|o| pos + o)
}

/// The four directional control points, one per side the character can
/// touch a region from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoints {
    pub left: Vec2,
    pub down: Vec2,
    pub right: Vec2,
    pub up: Vec2,
}

impl ControlPoints {
    pub fn iter(&self) -> impl Iterator<Item = (Direction, Vec2)> {
        [
            (Direction::Left, self.left),
            (Direction::Down, self.down),
            (Direction::Right, self.right),
            (Direction::Up, self.up),
        ]
        .into_iter()
    }
}

pub fn control_points(pos: Vec2) -> ControlPoints {
    ControlPoints {
        left: pos + vec2(16.0, 4.0),
        down: pos + vec2(32.0, 0.0),
        right: pos + vec2(48.0, 4.0),
        up: pos + vec2(32.0, 20.0),
    }
}

/// Movement gate: obstacles veto first, then each probe needs some walkable
/// region under it (not necessarily the same one).
pub fn allow_move(regions: &[CollisionRegion], pos: Vec2) -> bool {
    let probes = probe_points(pos);
    if regions
        .iter()
        .filter(|r| !r.walkable)
        .any(|r| probes.iter().any(|p| r.contains(*p)))
    {
        return false;
    }
    probes
        .iter()
        .all(|p| regions.iter().filter(|r| r.walkable).any(|r| r.contains(*p)))
}

/// The single side from which `pos` touches `region`, or `None` when no
/// control point or several of them are inside.
pub fn contact_side(region: &CollisionRegion, pos: Vec2) -> Option<Direction> {
    let mut hits = control_points(pos)
        .iter()
        .filter(|(_, p)| region.contains(*p))
        .map(|(side, _)| side);
    let side = hits.next()?;
    match hits.next() {
        Some(_) => None,
        None => Some(side),
    }
}

/// Whether a character at `pos` facing `facing` may interact with `region`.
pub fn check_interact(region: &CollisionRegion, pos: Vec2, facing: Direction) -> bool {
    if region.walkable {
        return region.contains(pos + CENTER_OFFSET);
    }
    contact_side(region, pos) == Some(facing)
}
