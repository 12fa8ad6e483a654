//! Asset access by logical path.
//! Maps, tilesets, string tables and the room table are all fetched through an
//! [`AssetSource`]; on desktop that is a directory, in tests an in-memory map.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use crate::error::AssetError;

/// Read-only access to game assets addressed by `/`-separated logical paths.
pub trait AssetSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;

    fn read_to_string(&self, path: &str) -> Result<String, AssetError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| AssetError::Io {
            path: path.to_owned(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })
    }
}

/// Assets stored under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirAssets {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part));
        std::fs::read(&full).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => AssetError::NotFound(path.to_owned()),
            _ => AssetError::Io {
                path: path.to_owned(),
                source,
            },
        })
    }
}

/// Assets held in memory, keyed by logical path.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_owned()))
    }
}

/// Resolves `rel` against the directory containing `base_file`.
///
/// `resolve_relative("maps/example.tmx", "tilesets/a.tsx")` is
/// `"maps/tilesets/a.tsx"`; `..` segments climb out of the base directory.
pub fn resolve_relative(base_file: &str, rel: &str) -> String {
    let mut parts: Vec<&str> = base_file.split('/').collect();
    parts.pop();
    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.retain(|p| !p.is_empty());
    parts.join("/")
}
