//! Image and model decoding for particle targets, plus a single-shot background
//! loader the render loop can poll without blocking.

use std::path::PathBuf;

mod decode;
mod loader;

pub use decode::{decode_image, decode_image_bytes, decode_model, ImageData, ModelData};
pub use loader::{AssetLoader, AssetSlot};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to load glTF model: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("{0}")]
    Empty(&'static str),
}
