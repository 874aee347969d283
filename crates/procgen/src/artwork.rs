//! Optional artist-provided cloud artwork.

use crate::textures::TextureData;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("artwork {path:?} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artwork {path:?} could not be decoded: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Load a raster image from disk as RGBA8.
pub fn load_artwork(path: &Path) -> Result<TextureData, ArtworkError> {
    let bytes = std::fs::read(path).map_err(|source| ArtworkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes).map_err(|source| ArtworkError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::info!("Loaded cloud artwork {:?} ({}x{})", path, width, height);

    // Dimensions come from the decoder, so the byte count always matches
    Ok(TextureData::from_rgba_bytes(width, height, rgba.as_raw()).unwrap_or_else(|| TextureData::new(0, 0)))
}
