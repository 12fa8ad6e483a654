//! Error types for map decoding, room activation and settings.

use std::io;

/// Failure to fetch a file through an [`crate::asset::AssetSource`].
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Everything that can go wrong while decoding a TMX map or its tilesets.
#[derive(thiserror::Error, Debug)]
pub enum MapError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("malformed XML in {path}: {source}")]
    Xml {
        path: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("malformed document {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("unsupported map format: {0}")]
    UnsupportedMapFormat(String),

    #[error("layer '{layer}' uses unsupported encoding '{encoding}'")]
    UnsupportedEncoding { layer: String, encoding: String },

    #[error("layer '{layer}' has {found} tiles, expected {expected}")]
    InvalidLayerSize {
        layer: String,
        expected: usize,
        found: usize,
    },

    #[error("tileset '{tileset}' could not be found")]
    MissingTileset { tileset: String },

    #[error("tile gid {gid} is not covered by any tileset")]
    UnresolvedTileId { gid: u32 },

    #[error("property '{name}' of type '{kind}' has invalid value '{value}'")]
    InvalidProperty {
        name: String,
        kind: String,
        value: String,
    },

    #[error("layer name '{0}' is not of the form <back|char|fore>_<order>")]
    InvalidLayerName(String),
}

impl MapError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        MapError::Malformed {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while activating a room.
#[derive(thiserror::Error, Debug)]
pub enum RoomError {
    #[error("failed to load map: {0}")]
    Map(#[from] MapError),

    #[error("room '{room}' has no spawn point named '{spawn}'")]
    MissingSpawnPoint { room: String, spawn: String },

    #[error("no room registered under '{0}'")]
    UnknownRoom(String),
}

/// Errors while reading or writing the settings file.
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for game startup.
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Map error: {0}")]
    Map(#[from] MapError),

    #[error("Room error: {0}")]
    Room(#[from] RoomError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Room table error: {0}")]
    RoomTable(#[from] serde_json::Error),
}

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;
