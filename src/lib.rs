//! Tile-map room runtime for Macroquad: Tiled TMX decoding, collision-gated
//! character movement and a room lifecycle driven by a data table.

pub mod animation;
pub mod asset;
pub mod cache;
pub mod character;
pub mod crash;
pub mod direction;
pub mod error;
pub mod geometry;
pub mod input;
pub mod ir_map;
pub mod loader {
    pub mod layer_data;
    pub mod tmx_loader;
}
pub mod locale;
pub mod logging;
pub mod map;
pub mod render {
    pub mod cull;
    pub mod draw;
}
pub mod room;
pub mod scene;
pub mod settings;
pub mod spatial {
    pub mod index;
}
pub mod tileset;

pub use asset::{AssetSource, DirAssets, MemoryAssets};
pub use cache::ResourceCache;
pub use character::{Character, CharacterState};
pub use direction::Direction;
pub use error::{AssetError, GameError, GameResult, MapError, RoomError, SettingsError};
pub use geometry::{allow_move, CollisionRegion};
pub use input::{InputEvent, InputRouter, Key};
pub use map::{TiledMap, Tile};
pub use room::{Room, RoomSpec};
pub use scene::{GameScene, RoomRegistry, SceneAction};
pub use settings::Settings;
