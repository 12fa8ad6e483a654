use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::asset::AssetSource;
use crate::error::MapError;
use crate::loader::tmx_loader::TilesetCache;
use crate::locale::{StringTable, Translate};
use crate::map::TiledMap;

/// Logical path of a map given by name: `"example"` → `"maps/example.tmx"`.
pub fn map_path(name: &str) -> String {
    if name.ends_with(".tmx") {
        name.to_owned()
    } else {
        format!("maps/{name}.tmx")
    }
}

/// Resources shared by every room of a game session.
///
/// Decoded maps and tilesets are filled in lazily and never replaced once
/// present, so rooms may hold on to the `Rc`s they were handed.
pub struct ResourceCache {
    assets: Box<dyn AssetSource>,
    strings: StringTable,
    maps: HashMap<String, Rc<TiledMap>>,
    tilesets: TilesetCache,
    invert_y: bool,
}

impl ResourceCache {
    pub fn new(assets: Box<dyn AssetSource>, strings: StringTable) -> Self {
        Self {
            assets,
            strings,
            maps: HashMap::new(),
            tilesets: TilesetCache::new(),
            invert_y: true,
        }
    }

    /// Keeps Tiled's y-down space instead of flipping maps to y-up.
    pub fn without_inversion(mut self) -> Self {
        self.invert_y = false;
        self
    }

    pub fn assets(&self) -> &dyn AssetSource {
        self.assets.as_ref()
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn map(&mut self, name: &str) -> Result<Rc<TiledMap>, MapError> {
        let path = map_path(name);
        if let Some(map) = self.maps.get(&path) {
            return Ok(Rc::clone(map));
        }
        let map = Rc::new(TiledMap::load(
            self.assets.as_ref(),
            &path,
            &mut self.tilesets,
            self.invert_y,
        )?);
        debug!(%path, cached = self.maps.len() + 1, "Cached map");
        self.maps.insert(path, Rc::clone(&map));
        Ok(map)
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn tileset_count(&self) -> usize {
        self.tilesets.len()
    }
}

impl Translate for ResourceCache {
    fn translate(&self, key: &str) -> String {
        self.strings.translate(key)
    }
}
