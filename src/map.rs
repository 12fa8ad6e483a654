use std::rc::Rc;
use std::str::FromStr;

use macroquad::prelude::*;
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::debug;

use crate::asset::AssetSource;
use crate::error::MapError;
use crate::ir_map::{IrMap, Properties};
use crate::loader::tmx_loader::{decode_map, TilesetCache};
use crate::tileset::{TileId, TilesetTable};

/// A tile ready to draw: where its pixels come from and where they go.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub gid: TileId,
    pub image: Rc<str>,
    pub source: Rect,
    pub dest: Vec2,
    pub size: Vec2,
    /// Per-tile collision box relative to `dest`, if the tileset defines one.
    pub collision: Option<Rect>,
}

/// The three draw passes a room composes its tile layers into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum DrawPass {
    Back,
    Char,
    Fore,
}

/// Parsed `<pass>_<order>` layer name, e.g. `back_0` or `fore_12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerName {
    pub pass: DrawPass,
    pub order: i32,
}

impl FromStr for LayerName {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MapError::InvalidLayerName(s.to_owned());
        let (pass, order) = s.split_once('_').ok_or_else(invalid)?;
        Ok(LayerName {
            pass: pass.parse().map_err(|_| invalid())?,
            order: order.parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompositeLayer {
    pub name: String,
    pub tiles: Vec<Tile>,
}

/// What a map object means to a room, decided once at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    CollisionRect,
    SpecialTile,
    SpawnPoint,
    Unknown,
}

impl ObjectKind {
    pub fn from_class(class_name: &str) -> Self {
        match class_name {
            "CRect" | "CollisionRect" | "CollisionPolygon" => ObjectKind::CollisionRect,
            "STile" | "IObj" | "SpecialTile" => ObjectKind::SpecialTile,
            "SPoint" | "SpawnPoint" => ObjectKind::SpawnPoint,
            _ => ObjectKind::Unknown,
        }
    }
}

/// A map object in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub kind: ObjectKind,
    pub class_name: String,
    pub position: Vec2,
    pub size: Vec2,
    pub gid: Option<TileId>,
    /// Absolute polygon vertices, anchored to `position`.
    pub polygon: Option<Vec<Vec2>>,
    pub properties: Properties,
}

impl MapObject {
    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }
}

/// A decoded map plus the rules for placing its tiles and objects in world space.
///
/// With `invert_y` on, y grows upwards: tile destinations and object positions
/// are both flipped against the map's pixel height, once, here.
#[derive(Debug, Clone)]
pub struct TiledMap {
    pub ir: IrMap,
    tilesets: TilesetTable,
    invert_y: bool,
}

impl TiledMap {
    pub fn load(
        assets: &dyn AssetSource,
        path: &str,
        tilesets: &mut TilesetCache,
        invert_y: bool,
    ) -> Result<Self, MapError> {
        let ir = decode_map(assets, path, tilesets)?;
        Ok(Self::from_ir(ir, invert_y))
    }

    pub fn from_ir(ir: IrMap, invert_y: bool) -> Self {
        let tilesets = TilesetTable::new(ir.tilesets.clone());
        Self { ir, tilesets, invert_y }
    }

    pub fn invert_y(&self) -> bool {
        self.invert_y
    }

    /// Map size in pixels, `(-1, -1)` when the map is infinite.
    pub fn pixel_size(&self) -> (i32, i32) {
        self.ir.pixel_size()
    }

    fn map_height_px(&self) -> f32 {
        self.ir.height as f32 * self.ir.tile_h as f32
    }

    /// Composites every tile layer, in document order.
    pub fn layers(&self) -> Result<Vec<CompositeLayer>, MapError> {
        if self.ir.infinite {
            return Err(MapError::UnsupportedMapFormat(
                "infinite maps cannot be tile-decoded".into(),
            ));
        }

        let tw = self.ir.tile_w as f32;
        let th = self.ir.tile_h as f32;
        let map_h = self.map_height_px();

        let mut out = Vec::with_capacity(self.ir.layers.len());
        for layer in &self.ir.layers {
            let mut tiles = Vec::new();
            let columns = layer.width.max(1) as usize;
            for (idx, raw) in layer.data.iter().enumerate() {
                let gid = TileId(*raw);
                if gid.is_empty() {
                    continue;
                }
                let src = self.tilesets.resolve(gid)?;

                let col = idx % columns;
                let row = idx / columns;
                let mut dest = vec2(col as f32 * tw, row as f32 * th);
                if self.invert_y {
                    dest.y = map_h - th - dest.y;
                }

                let collision = src.collision.map(|c| {
                    if self.invert_y {
                        Rect::new(c.x, src.source.h - c.y - c.h, c.w, c.h)
                    } else {
                        c
                    }
                });

                tiles.push(Tile {
                    gid,
                    image: Rc::from(src.tileset.image.as_str()),
                    source: src.source,
                    dest,
                    size: vec2(tw, th),
                    collision,
                });
            }
            debug!(layer = %layer.name, tiles = tiles.len(), "Composited layer");
            out.push(CompositeLayer {
                name: layer.name.clone(),
                tiles,
            });
        }
        Ok(out)
    }

    /// Objects of every object group named `group`, in world space.
    pub fn objects(&self, group: &str) -> Vec<MapObject> {
        let map_h = self.map_height_px();
        self.ir
            .object_groups
            .iter()
            .filter(|g| g.name == group)
            .flat_map(|g| g.objects.iter())
            .map(|o| {
                // Tile objects are anchored at their bottom edge.
                let top = if o.gid.is_some() { o.y - o.height } else { o.y };
                let y = if self.invert_y {
                    map_h - o.height - top
                } else {
                    top
                };
                let origin = vec2(o.x, y);
                let polygon = o.polygon.as_ref().map(|points| {
                    points
                        .iter()
                        .map(|p| {
                            if self.invert_y {
                                vec2(origin.x + p.x, origin.y - p.y)
                            } else {
                                origin + *p
                            }
                        })
                        .collect()
                });
                MapObject {
                    id: o.id,
                    name: o.name.clone(),
                    kind: ObjectKind::from_class(&o.class_name),
                    class_name: o.class_name.clone(),
                    position: origin,
                    size: vec2(o.width, o.height),
                    gid: o.gid.map(TileId),
                    polygon,
                    properties: o.properties.clone(),
                }
            })
            .collect()
    }

    /// Builds a single tile for a tile object, placed at the object's position.
    pub fn tile_for_object(&self, obj: &MapObject) -> Result<Option<Tile>, MapError> {
        let Some(gid) = obj.gid else {
            return Ok(None);
        };
        let src = self.tilesets.resolve(gid)?;
        let size = if obj.size.x > 0.0 && obj.size.y > 0.0 {
            obj.size
        } else {
            vec2(src.source.w, src.source.h)
        };
        Ok(Some(Tile {
            gid,
            image: Rc::from(src.tileset.image.as_str()),
            source: src.source,
            dest: obj.position,
            size,
            collision: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir_map::{IrLayer, IrObject, IrObjectGroup, IrTileset, TilesetRef};
    use std::collections::HashMap;

    fn one_tile_map(data: Vec<u32>) -> IrMap {
        IrMap {
            version: "1.10".into(),
            orientation: "orthogonal".into(),
            render_order: "right-down".into(),
            background_color: "#000000".into(),
            tile_w: 16,
            tile_h: 16,
            width: 2,
            height: 2,
            infinite: false,
            tilesets: vec![TilesetRef {
                first_gid: 1,
                tileset: Rc::new(IrTileset {
                    name: "t".into(),
                    image: "t.png".into(),
                    image_w: 16,
                    image_h: 16,
                    tile_w: 16,
                    tile_h: 16,
                    tilecount: 1,
                    columns: 1,
                    spacing: 0,
                    margin: 0,
                    collision: HashMap::from([(0, Rect::new(0.0, 12.0, 16.0, 4.0))]),
                }),
            }],
            layers: vec![IrLayer {
                name: "back_0".into(),
                width: 2,
                height: 2,
                data,
            }],
            object_groups: vec![IrObjectGroup {
                name: "objects".into(),
                objects: vec![IrObject {
                    id: 1,
                    name: "start".into(),
                    class_name: "SPoint".into(),
                    x: 16.0,
                    y: 16.0,
                    width: 16.0,
                    height: 16.0,
                    gid: None,
                    polygon: None,
                    properties: Properties::new(),
                }],
            }],
        }
    }

    #[test]
    fn csv_scenario_yields_single_tile_in_bottom_left_cell() {
        // "0,0,1,0": the id sits at column 0, row 1 (bottom row in y-down space).
        let map = TiledMap::from_ir(one_tile_map(vec![0, 0, 1, 0]), true);
        let layers = map.layers().unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].tiles.len(), 1);
        let tile = &layers[0].tiles[0];
        // dest_y = map_h - tile_h - row * tile_h = 32 - 16 - 16
        assert_eq!(tile.dest, vec2(0.0, 0.0));
        assert_eq!(tile.source, Rect::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(&*tile.image, "t.png");

        let flat = TiledMap::from_ir(one_tile_map(vec![0, 0, 1, 0]), false);
        assert_eq!(flat.layers().unwrap()[0].tiles[0].dest, vec2(0.0, 16.0));
    }

    #[test]
    fn tile_collision_box_is_flipped_with_the_map() {
        let map = TiledMap::from_ir(one_tile_map(vec![1, 0, 0, 0]), true);
        let tile = &map.layers().unwrap()[0].tiles[0];
        assert_eq!(tile.collision, Some(Rect::new(0.0, 0.0, 16.0, 4.0)));
    }

    #[test]
    fn every_index_maps_back_to_its_cell() {
        let map = TiledMap::from_ir(one_tile_map(vec![1, 1, 1, 1]), false);
        let tiles = &map.layers().unwrap()[0].tiles;
        for (idx, tile) in tiles.iter().enumerate() {
            let col = (tile.dest.x / 16.0) as usize;
            let row = (tile.dest.y / 16.0) as usize;
            assert_eq!(idx, row * 2 + col);
        }
    }

    #[test]
    fn spawn_and_coincident_tile_share_a_position_after_inversion() {
        // The spawn object covers cell (1, 1); a tile in that cell must land on it.
        let map = TiledMap::from_ir(one_tile_map(vec![0, 0, 0, 1]), true);
        let tile = map.layers().unwrap()[0].tiles[0].clone();
        let spawn = &map.objects("objects")[0];
        assert_eq!(spawn.kind, ObjectKind::SpawnPoint);
        assert_eq!(spawn.position, tile.dest);
        assert_eq!(spawn.position, vec2(16.0, 0.0));
    }

    #[test]
    fn polygon_points_anchor_to_inverted_origin() {
        let mut ir = one_tile_map(vec![0; 4]);
        let obj = &mut ir.object_groups[0].objects[0];
        obj.class_name = "CollisionPolygon".into();
        obj.width = 0.0;
        obj.height = 0.0;
        obj.polygon = Some(vec![vec2(0.0, 0.0), vec2(8.0, 0.0), vec2(0.0, 8.0)]);

        let inverted = TiledMap::from_ir(ir.clone(), true).objects("objects")[0].clone();
        assert_eq!(inverted.kind, ObjectKind::CollisionRect);
        assert_eq!(inverted.position, vec2(16.0, 16.0));
        assert_eq!(
            inverted.polygon.unwrap(),
            vec![vec2(16.0, 16.0), vec2(24.0, 16.0), vec2(16.0, 8.0)]
        );

        let plain = TiledMap::from_ir(ir, false).objects("objects")[0].clone();
        assert_eq!(plain.polygon.unwrap()[2], vec2(16.0, 24.0));
    }

    #[test]
    fn objects_filter_by_group_name() {
        let map = TiledMap::from_ir(one_tile_map(vec![0; 4]), true);
        assert!(map.objects("elsewhere").is_empty());
        assert_eq!(map.objects("objects").len(), 1);
    }

    #[test]
    fn infinite_maps_refuse_compositing() {
        let mut ir = one_tile_map(vec![]);
        ir.infinite = true;
        let map = TiledMap::from_ir(ir, true);
        assert_eq!(map.pixel_size(), (-1, -1));
        assert!(matches!(map.layers(), Err(MapError::UnsupportedMapFormat(_))));
    }

    #[test]
    fn unresolved_gid_aborts_compositing() {
        let map = TiledMap::from_ir(one_tile_map(vec![0, 7, 0, 0]), true);
        assert!(matches!(map.layers(), Err(MapError::UnresolvedTileId { gid: 7 })));
    }

    #[test]
    fn layer_names_parse_into_pass_and_order() {
        assert_eq!(
            "fore_12".parse::<LayerName>().unwrap(),
            LayerName { pass: DrawPass::Fore, order: 12 }
        );
        assert_eq!("char_0".parse::<LayerName>().unwrap().pass, DrawPass::Char);
        assert!(matches!("ground".parse::<LayerName>(), Err(MapError::InvalidLayerName(_))));
        assert!(matches!("mid_1".parse::<LayerName>(), Err(MapError::InvalidLayerName(_))));
        assert!(matches!("back_x".parse::<LayerName>(), Err(MapError::InvalidLayerName(_))));
    }

    #[test]
    fn object_kinds_accept_legacy_names() {
        assert_eq!(ObjectKind::from_class("IObj"), ObjectKind::SpecialTile);
        assert_eq!(ObjectKind::from_class("STile"), ObjectKind::SpecialTile);
        assert_eq!(ObjectKind::from_class("CRect"), ObjectKind::CollisionRect);
        assert_eq!(ObjectKind::from_class("SPoint"), ObjectKind::SpawnPoint);
        assert_eq!(ObjectKind::from_class("Lamp"), ObjectKind::Unknown);
    }
}
