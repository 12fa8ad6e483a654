// src/loader/layer_data.rs
use std::io::Read;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::MapError;

/// Decodes the text of a `<data>` element into global tile ids.
///
/// `base64` data is optionally `zlib` or `gzip` compressed and holds
/// little-endian `u32`s; `csv` data is a comma separated list.
pub fn decode_layer_data(
    layer: &str,
    encoding: Option<&str>,
    compression: Option<&str>,
    text: &str,
) -> Result<Vec<u32>, MapError> {
    match encoding {
        Some("base64") => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            let raw = BASE64_STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| MapError::malformed(layer, format!("invalid base64: {e}")))?;
            let bytes = match compression {
                None | Some("") => raw,
                Some("zlib") => inflate(layer, ZlibDecoder::new(raw.as_slice()))?,
                Some("gzip") => inflate(layer, GzDecoder::new(raw.as_slice()))?,
                Some(other) => {
                    return Err(MapError::UnsupportedEncoding {
                        layer: layer.to_owned(),
                        encoding: format!("base64+{other}"),
                    })
                }
            };
            gids_from_le_bytes(layer, &bytes)
        }
        Some("csv") => {
            if let Some(other) = compression.filter(|c| !c.is_empty()) {
                return Err(MapError::UnsupportedEncoding {
                    layer: layer.to_owned(),
                    encoding: format!("csv+{other}"),
                });
            }
            text.split(',')
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .map(|cell| {
                    cell.parse::<u32>().map_err(|_| {
                        MapError::malformed(layer, format!("invalid csv tile id '{cell}'"))
                    })
                })
                .collect()
        }
        other => Err(MapError::UnsupportedEncoding {
            layer: layer.to_owned(),
            encoding: other.unwrap_or("xml").to_owned(),
        }),
    }
}

fn inflate(layer: &str, mut decoder: impl Read) -> Result<Vec<u8>, MapError> {
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| MapError::malformed(layer, format!("decompression failed: {e}")))?;
    Ok(out)
}

fn gids_from_le_bytes(layer: &str, bytes: &[u8]) -> Result<Vec<u32>, MapError> {
    if bytes.len() % 4 != 0 {
        return Err(MapError::malformed(
            layer,
            format!("tile data is {} bytes, not a multiple of 4", bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
