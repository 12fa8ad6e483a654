// src/loader/tmx_loader.rs
use crate::asset::{resolve_relative, AssetSource};
use crate::error::{AssetError, MapError};
use crate::ir_map::*;
use crate::loader::layer_data::decode_layer_data;
use macroquad::prelude::*;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;
use tracing::{debug, trace};

/// Tilesets already decoded, keyed by their logical path.
pub type TilesetCache = HashMap<String, Rc<IrTileset>>;

pub fn decode_map(
    assets: &dyn AssetSource,
    path: &str,
    tilesets: &mut TilesetCache,
) -> Result<IrMap, MapError> {
    let text = assets.read_to_string(path)?;
    decode_map_str(&text, path, assets, tilesets)
}

pub fn decode_map_str(
    text: &str,
    path: &str,
    assets: &dyn AssetSource,
    tilesets: &mut TilesetCache,
) -> Result<IrMap, MapError> {
    let doc = Document::parse(text).map_err(|source| MapError::Xml {
        path: path.to_owned(),
        source,
    })?;
    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(MapError::malformed(path, "root element is not <map>"));
    }

    let orientation = root.attribute("orientation").unwrap_or("orthogonal");
    if orientation != "orthogonal" {
        return Err(MapError::UnsupportedMapFormat(format!(
            "orientation '{orientation}' (only orthogonal is supported)"
        )));
    }
    let render_order = root.attribute("renderorder").unwrap_or("right-down");
    if render_order != "right-down" {
        return Err(MapError::UnsupportedMapFormat(format!(
            "render order '{render_order}' (only right-down is supported)"
        )));
    }

    let width: u32 = attr(root, "width", path)?;
    let height: u32 = attr(root, "height", path)?;
    let infinite = attr_or::<u32>(root, "infinite", 0, path)? == 1;
    let tile_w: u32 = attr(root, "tilewidth", path)?;
    let tile_h: u32 = attr(root, "tileheight", path)?;
    if !infinite {
        for (axis, cells, tile) in [("width", width, tile_w), ("height", height, tile_h)] {
            let fits = cells
                .checked_mul(tile)
                .is_some_and(|px| i32::try_from(px).is_ok());
            if !fits {
                return Err(MapError::malformed(
                    path,
                    format!("map {axis} of {cells} tiles at {tile} px does not fit in i32 pixels"),
                ));
            }
        }
    }

    // Build IR tilesets
    let mut refs = Vec::new();
    for ts in children(root, "tileset") {
        let first_gid: u32 = attr(ts, "firstgid", path)?;
        let tileset = match ts.attribute("source") {
            Some(source) => load_external_tileset(assets, &resolve_relative(path, source), tilesets)?,
            None => Rc::new(parse_tileset(ts, path)?),
        };
        refs.push(TilesetRef { first_gid, tileset });
    }
    refs.sort_by_key(|t| t.first_gid);

    // Build IR layers
    let mut layers = Vec::new();
    let mut object_groups = Vec::new();
    collect_layers(root, path, width, height, infinite, &mut layers, &mut object_groups)?;

    debug!(
        map = path,
        width,
        height,
        tilesets = refs.len(),
        layers = layers.len(),
        object_groups = object_groups.len(),
        "Decoded map document"
    );

    Ok(IrMap {
        version: root
            .attribute("tiledversion")
            .or_else(|| root.attribute("version"))
            .unwrap_or("0.0")
            .to_owned(),
        orientation: orientation.to_owned(),
        render_order: render_order.to_owned(),
        background_color: root.attribute("backgroundcolor").unwrap_or("#000000").to_owned(),
        tile_w,
        tile_h,
        width,
        height,
        infinite,
        tilesets: refs,
        layers,
        object_groups,
    })
}

fn collect_layers(
    parent: Node,
    path: &str,
    map_w: u32,
    map_h: u32,
    infinite: bool,
    layers: &mut Vec<IrLayer>,
    groups: &mut Vec<IrObjectGroup>,
) -> Result<(), MapError> {
    for node in parent.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "layer" => layers.push(parse_tile_layer(node, path, map_w, map_h, infinite)?),
            "objectgroup" => groups.push(IrObjectGroup {
                name: node.attribute("name").unwrap_or_default().to_owned(),
                objects: children(node, "object")
                    .map(|o| parse_object(o, path))
                    .collect::<Result<Vec<_>, _>>()?,
            }),
            "group" => collect_layers(node, path, map_w, map_h, infinite, layers, groups)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_tile_layer(
    node: Node,
    path: &str,
    map_w: u32,
    map_h: u32,
    infinite: bool,
) -> Result<IrLayer, MapError> {
    let name = node.attribute("name").unwrap_or_default().to_owned();
    let width = attr_or(node, "width", map_w, path)?;
    let height = attr_or(node, "height", map_h, path)?;

    // Infinite maps store chunks; they are reported but never tile-decoded.
    if infinite {
        trace!(layer = %name, "Skipping tile data of infinite map");
        return Ok(IrLayer { name, width, height, data: Vec::new() });
    }

    let data_node = children(node, "data")
        .next()
        .ok_or_else(|| MapError::malformed(path, format!("layer '{name}' has no <data>")))?;
    let data = decode_layer_data(
        &name,
        data_node.attribute("encoding"),
        data_node.attribute("compression"),
        data_node.text().unwrap_or_default(),
    )?;

    let expected = (width as usize).checked_mul(height as usize).ok_or_else(|| {
        MapError::malformed(path, format!("layer '{name}' of {width}x{height} tiles is too large"))
    })?;
    if data.len() != expected {
        return Err(MapError::InvalidLayerSize {
            layer: name,
            expected,
            found: data.len(),
        });
    }

    Ok(IrLayer { name, width, height, data })
}

fn load_external_tileset(
    assets: &dyn AssetSource,
    ts_path: &str,
    cache: &mut TilesetCache,
) -> Result<Rc<IrTileset>, MapError> {
    if let Some(ts) = cache.get(ts_path) {
        return Ok(Rc::clone(ts));
    }
    let text = assets.read_to_string(ts_path).map_err(|e| match e {
        AssetError::NotFound(_) => MapError::MissingTileset {
            tileset: ts_path.to_owned(),
        },
        other => MapError::Asset(other),
    })?;
    let doc = Document::parse(&text).map_err(|source| MapError::Xml {
        path: ts_path.to_owned(),
        source,
    })?;
    let root = doc.root_element();
    if root.tag_name().name() != "tileset" {
        return Err(MapError::malformed(ts_path, "root element is not <tileset>"));
    }
    let tileset = Rc::new(parse_tileset(root, ts_path)?);
    debug!(tileset = ts_path, tiles = tileset.tilecount, "Decoded tileset");
    cache.insert(ts_path.to_owned(), Rc::clone(&tileset));
    Ok(tileset)
}

/// Parses a `<tileset>` element; `doc_path` is the file it lives in.
fn parse_tileset(node: Node, doc_path: &str) -> Result<IrTileset, MapError> {
    let tile_w: u32 = attr(node, "tilewidth", doc_path)?;
    let tile_h: u32 = attr(node, "tileheight", doc_path)?;
    let spacing = attr_or(node, "spacing", 0, doc_path)?;
    let margin: u32 = attr_or(node, "margin", 0, doc_path)?;

    let image = children(node, "image")
        .next()
        .ok_or_else(|| MapError::malformed(doc_path, "tileset has no <image>"))?;
    let source = image
        .attribute("source")
        .ok_or_else(|| MapError::malformed(doc_path, "<image> has no source"))?;
    let image_w: u32 = attr_or(image, "width", 0, doc_path)?;
    let image_h: u32 = attr_or(image, "height", 0, doc_path)?;

    let stride = tile_w.saturating_add(spacing);
    let derived_columns = if stride > 0 {
        image_w
            .saturating_sub(margin.saturating_mul(2))
            .saturating_add(spacing)
            / stride
    } else {
        0
    };
    let columns = attr_or(node, "columns", derived_columns, doc_path)?;
    let tilecount = attr(node, "tilecount", doc_path)?;

    let mut collision = HashMap::new();
    for tile in children(node, "tile") {
        let id: u32 = attr(tile, "id", doc_path)?;
        let boxed = children(tile, "objectgroup")
            .flat_map(|g| children(g, "object"))
            .find(|o| o.attribute("width").is_some() && o.attribute("height").is_some());
        if let Some(obj) = boxed {
            collision.insert(
                id,
                Rect::new(
                    attr_or(obj, "x", 0.0, doc_path)?,
                    attr_or(obj, "y", 0.0, doc_path)?,
                    attr(obj, "width", doc_path)?,
                    attr(obj, "height", doc_path)?,
                ),
            );
        }
    }

    Ok(IrTileset {
        name: node.attribute("name").unwrap_or_default().to_owned(),
        image: resolve_relative(doc_path, source),
        image_w,
        image_h,
        tile_w,
        tile_h,
        tilecount,
        columns,
        spacing,
        margin,
        collision,
    })
}

fn parse_object(node: Node, path: &str) -> Result<IrObject, MapError> {
    let class_name = node
        .attribute("type")
        .or_else(|| node.attribute("class"))
        .unwrap_or_default()
        .to_owned();

    let mut polygon = None;
    let mut properties = Properties::new();
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "polygon" => {
                let points = child.attribute("points").unwrap_or_default();
                polygon = Some(parse_points(points, path)?);
            }
            "properties" => properties = parse_properties(child, path)?,
            _ => {}
        }
    }

    Ok(IrObject {
        id: attr_or(node, "id", 0, path)?,
        name: node.attribute("name").unwrap_or_default().to_owned(),
        class_name,
        x: attr(node, "x", path)?,
        y: attr(node, "y", path)?,
        width: attr_or(node, "width", 0.0, path)?,
        height: attr_or(node, "height", 0.0, path)?,
        gid: node.attribute("gid").map(|g| parse_num(g, "gid", path)).transpose()?,
        polygon,
        properties,
    })
}

fn parse_points(points: &str, path: &str) -> Result<Vec<Vec2>, MapError> {
    points
        .split_whitespace()
        .map(|pair| {
            let (dx, dy) = pair
                .split_once(',')
                .ok_or_else(|| MapError::malformed(path, format!("bad polygon point '{pair}'")))?;
            Ok(vec2(parse_num(dx, "points", path)?, parse_num(dy, "points", path)?))
        })
        .collect()
}

fn parse_properties(node: Node, path: &str) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    for prop in children(node, "property") {
        let name = prop.attribute("name").unwrap_or_default().to_owned();
        let kind = prop.attribute("type").unwrap_or("string");
        let raw = prop
            .attribute("value")
            .or_else(|| prop.text())
            .unwrap_or_default();
        let invalid = || MapError::InvalidProperty {
            name: name.clone(),
            kind: kind.to_owned(),
            value: raw.to_owned(),
        };
        let value = match kind {
            "int" => PropertyValue::I64(raw.trim().parse().map_err(|_| invalid())?),
            "float" => PropertyValue::F32(raw.trim().parse().map_err(|_| invalid())?),
            "bool" => match raw {
                "true" => PropertyValue::Bool(true),
                "false" => PropertyValue::Bool(false),
                other => PropertyValue::String(other.to_owned()),
            },
            _ => PropertyValue::String(raw.to_owned()),
        };
        out.insert(name, value);
    }
    Ok(out)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

fn parse_num<T: FromStr>(raw: &str, name: &str, path: &str) -> Result<T, MapError> {
    raw.trim()
        .parse()
        .map_err(|_| MapError::malformed(path, format!("attribute '{name}' has invalid value '{raw}'")))
}

fn attr<T: FromStr>(node: Node, name: &str, path: &str) -> Result<T, MapError> {
    let raw = node.attribute(name).ok_or_else(|| {
        MapError::malformed(
            path,
            format!("<{}> is missing attribute '{name}'", node.tag_name().name()),
        )
    })?;
    parse_num(raw, name, path)
}

fn attr_or<T: FromStr>(node: Node, name: &str, default: T, path: &str) -> Result<T, MapError> {
    match node.attribute(name) {
        Some(raw) => parse_num(raw, name, path),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAssets;

    const TILESET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="terrain" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="../textures/terrain.png" width="32" height="32"/>
 <tile id="1">
  <objectgroup draworder="index">
   <object id="1" x="2" y="10" width="12" height="6"/>
  </objectgroup>
 </tile>
</tileset>
"#;

    fn map_xml(extra_attrs: &str, body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" tiledversion="1.10.2" orientation="orthogonal" renderorder="right-down" width="2" height="2" tilewidth="16" tileheight="16" infinite="0" {extra_attrs}>
 <tileset firstgid="1" source="tilesets/terrain.tsx"/>
 {body}
</map>"#
        )
    }

    fn assets(map: &str) -> MemoryAssets {
        MemoryAssets::new()
            .with("maps/test.tmx", map)
            .with("maps/tilesets/terrain.tsx", TILESET)
    }

    fn decode(map: &str) -> Result<IrMap, MapError> {
        let assets = assets(map);
        decode_map(&assets, "maps/test.tmx", &mut TilesetCache::new())
    }

    #[test]
    fn parses_header_tilesets_and_csv_layer() {
        let ir = decode(&map_xml(
            r##"backgroundcolor="#336699""##,
            r#"<layer id="1" name="back_0" width="2" height="2"><data encoding="csv">
1,0,
0,4
</data></layer>"#,
        ))
        .unwrap();

        assert_eq!(ir.version, "1.10.2");
        assert_eq!(ir.pixel_size(), (32, 32));
        assert_eq!(ir.background_rgba(), [0x33, 0x66, 0x99, 255]);
        assert_eq!(ir.tilesets.len(), 1);
        let ts = &ir.tilesets[0].tileset;
        assert_eq!(ts.image, "textures/terrain.png");
        assert_eq!(ts.collision.get(&1), Some(&Rect::new(2.0, 10.0, 12.0, 6.0)));
        assert_eq!(ir.layers[0].name, "back_0");
        assert_eq!(ir.layers[0].data, vec![1, 0, 0, 4]);
    }

    #[test]
    fn rejects_non_orthogonal_and_other_render_orders() {
        let iso = map_xml("", "").replace("orthogonal", "isometric");
        assert!(matches!(decode(&iso), Err(MapError::UnsupportedMapFormat(_))));

        let left_up = map_xml("", "").replace("right-down", "left-up");
        assert!(matches!(decode(&left_up), Err(MapError::UnsupportedMapFormat(_))));
    }

    #[test]
    fn infinite_maps_report_unknown_size_without_decoding_tiles() {
        let body = r#"<layer name="back_0" width="2" height="2"><data encoding="csv"><chunk x="0" y="0" width="16" height="16">1</chunk></data></layer>"#;
        let ir = decode(&map_xml("", body).replace(r#"infinite="0""#, r#"infinite="1""#)).unwrap();
        assert!(ir.infinite);
        assert_eq!(ir.pixel_size(), (-1, -1));
        assert!(ir.layers[0].data.is_empty());
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = decode("<map orientation=").unwrap_err();
        assert!(matches!(err, MapError::Xml { .. }));
    }

    #[test]
    fn missing_tileset_file_is_reported_by_name() {
        let assets = MemoryAssets::new().with("maps/test.tmx", map_xml("", ""));
        let err = decode_map(&assets, "maps/test.tmx", &mut TilesetCache::new()).unwrap_err();
        assert!(matches!(err, MapError::MissingTileset { ref tileset } if tileset == "maps/tilesets/terrain.tsx"));
    }

    #[test]
    fn layer_size_must_match_dimensions() {
        let body = r#"<layer name="back_0" width="2" height="2"><data encoding="csv">1,0,0</data></layer>"#;
        let err = decode(&map_xml("", body)).unwrap_err();
        assert!(matches!(err, MapError::InvalidLayerSize { expected: 4, found: 3, .. }));
    }

    #[test]
    fn huge_dimensions_are_errors_not_overflows() {
        let body = r#"<layer name="back_0"><data encoding="csv">1</data></layer>"#;
        let wide = map_xml("", body)
            .replace(r#"width="2" height="2""#, r#"width="70000" height="70000""#);
        assert!(matches!(
            decode(&wide),
            Err(MapError::InvalidLayerSize { expected: 4_900_000_000, found: 1, .. })
        ));

        let vast = map_xml("", "")
            .replace(r#"width="2""#, r#"width="300000""#)
            .replace(r#"tilewidth="16""#, r#"tilewidth="30000""#);
        assert!(matches!(decode(&vast), Err(MapError::Malformed { .. })));
    }

    #[test]
    fn tilesets_are_cached_by_path() {
        let assets = assets(&map_xml("", ""));
        let mut cache = TilesetCache::new();
        let first = decode_map(&assets, "maps/test.tmx", &mut cache).unwrap();
        let second = decode_map(&assets, "maps/test.tmx", &mut cache).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(Rc::ptr_eq(&first.tilesets[0].tileset, &second.tilesets[0].tileset));
    }

    #[test]
    fn parses_objects_with_typed_properties_and_polygons() {
        let body = r#"<objectgroup id="2" name="objects">
  <object id="3" name="floor" type="CRect" x="0" y="0" width="32" height="32">
   <properties>
    <property name="can_walk" type="bool" value="true"/>
    <property name="weight" type="int" value="5000000000"/>
    <property name="ratio" type="float" value="0.5"/>
    <property name="flag" type="bool" value="yes"/>
    <property name="note">multi
line</property>
   </properties>
  </object>
  <object id="4" name="rock" class="CRect" x="4" y="6">
   <polygon points="0,0 8,0 8,-4"/>
  </object>
 </objectgroup>"#;
        let ir = decode(&map_xml("", body)).unwrap();
        let objects = &ir.object_groups[0].objects;
        assert_eq!(ir.object_groups[0].name, "objects");

        let floor = &objects[0];
        assert_eq!(floor.class_name, "CRect");
        assert_eq!(floor.properties.get_bool("can_walk"), Some(true));
        assert_eq!(floor.properties.get_i64("weight"), Some(5_000_000_000));
        assert_eq!(floor.properties.get_f32("ratio"), Some(0.5));
        assert_eq!(floor.properties.get_string("flag"), Some("yes"));
        assert_eq!(floor.properties.get_string("note"), Some("multi\nline"));

        let rock = &objects[1];
        assert_eq!(rock.class_name, "CRect");
        assert_eq!(
            rock.polygon.as_deref(),
            Some(&[vec2(0.0, 0.0), vec2(8.0, 0.0), vec2(8.0, -4.0)][..])
        );
    }

    #[test]
    fn unparsable_int_property_is_an_error() {
        let body = r#"<objectgroup name="objects"><object x="0" y="0"><properties>
<property name="n" type="int" value="many"/></properties></object></objectgroup>"#;
        let err = decode(&map_xml("", body)).unwrap_err();
        assert!(matches!(err, MapError::InvalidProperty { ref name, .. } if name == "n"));
    }
}
