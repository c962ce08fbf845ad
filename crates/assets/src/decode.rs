use std::path::Path;

use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::AssetError;

/// Decoded RGBA8 pixels, row-major from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pixel(&self, index: usize) -> [u8; 4] {
        let i4 = index * 4;
        [
            self.rgba[i4],
            self.rgba[i4 + 1],
            self.rgba[i4 + 2],
            self.rgba[i4 + 3],
        ]
    }
}

/// Vertex data gathered from every mesh primitive in a glTF document.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub positions: Vec<[f32; 3]>,
    /// Linear RGB in `[0, 1]`; white where the model carries no vertex colors.
    pub colors: Vec<[f32; 3]>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Decodes an image file, shrinking it so it holds at most `max_pixels` pixels.
pub fn decode_image(path: &Path, max_pixels: usize) -> Result<ImageData, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_image_bytes(&bytes, max_pixels)
}

pub fn decode_image_bytes(bytes: &[u8], max_pixels: usize) -> Result<ImageData, AssetError> {
    let mut decoded = image::load_from_memory(bytes)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(AssetError::Empty("image has no pixels"));
    }

    if let Some((fit_w, fit_h)) = fit_within(width, height, max_pixels) {
        warn!(
            width,
            height, fit_w, fit_h, "image exceeds particle capacity; downscaling"
        );
        decoded = decoded.resize_exact(fit_w, fit_h, FilterType::Triangle);
    }

    let rgba = decoded.to_rgba8();
    debug!(width = rgba.width(), height = rgba.height(), "decoded image");
    Ok(ImageData {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// Returns reduced dimensions when `width * height` exceeds `max_pixels`.
fn fit_within(width: u32, height: u32, max_pixels: usize) -> Option<(u32, u32)> {
    let count = width as usize * height as usize;
    if count <= max_pixels {
        return None;
    }
    let scale = (max_pixels as f64 / count as f64).sqrt();
    let mut fit_w = ((width as f64 * scale).floor() as u32).max(1);
    let mut fit_h = ((height as f64 * scale).floor() as u32).max(1);
    while fit_w as usize * fit_h as usize > max_pixels {
        if fit_w >= fit_h && fit_w > 1 {
            fit_w -= 1;
        } else if fit_h > 1 {
            fit_h -= 1;
        } else {
            break;
        }
    }
    Some((fit_w, fit_h))
}

/// Loads a `.gltf`/`.glb` file, resolving external buffers relative to it.
pub fn decode_model(path: &Path) -> Result<ModelData, AssetError> {
    let (document, buffers, _images) = gltf::import(path)?;

    let mut positions = Vec::new();
    let mut colors = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let Some(read) = reader.read_positions() else {
                continue;
            };
            let before = positions.len();
            positions.extend(read);
            let added = positions.len() - before;

            if let Some(read) = reader.read_colors(0) {
                colors.extend(read.into_rgba_f32().take(added).map(|[r, g, b, _]| [r, g, b]));
            }
            colors.resize(positions.len(), [1.0, 1.0, 1.0]);
        }
    }

    if positions.is_empty() {
        return Err(AssetError::Empty("model has no vertex positions"));
    }
    debug!(vertices = positions.len(), "decoded model");
    Ok(ModelData { positions, colors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_png(dir: &Path, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join("picture.png");
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 10) as u8, (y * 10) as u8, 200, 255])
        });
        img.save(&path).expect("write png");
        path
    }

    #[test]
    fn decodes_png_pixels_in_row_major_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 4, 3);
        let image = decode_image(&path, 1_000_000).unwrap();
        assert_eq!((image.width, image.height), (4, 3));
        assert_eq!(image.pixel_count(), 12);
        assert_eq!(image.pixel(0), [0, 0, 200, 255]);
        assert_eq!(image.pixel(5), [10, 10, 200, 255]);
    }

    #[test]
    fn oversized_image_is_scaled_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 20, 10);
        let image = decode_image(&path, 50).unwrap();
        assert!(image.pixel_count() <= 50);
        assert_eq!(image.rgba.len(), image.pixel_count() * 4);
        assert!(image.width >= image.height);
    }

    #[test]
    fn fit_keeps_aspect_and_respects_budget() {
        assert_eq!(fit_within(10, 10, 100), None);
        let (w, h) = fit_within(4000, 2000, 1_000_000).unwrap();
        assert!(w as usize * h as usize <= 1_000_000);
        assert_eq!(w, 1414);
        assert_eq!(h, 707);
    }

    #[test]
    fn missing_image_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        let err = decode_image(&missing, 10).unwrap_err();
        assert!(matches!(err, AssetError::Io { ref path, .. } if path == &missing));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode_image_bytes(b"definitely not an image", 10).unwrap_err();
        assert!(matches!(err, AssetError::Image(_)));
    }

    const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "buffers": [{ "uri": "triangle.bin", "byteLength": 60 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 24 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [2.0, 1.0, 0.5] },
    { "bufferView": 1, "componentType": 5123, "normalized": true, "count": 3, "type": "VEC4" }
  ],
  "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0, "COLOR_0": 1 } }] }],
  "nodes": [{ "mesh": 0 }],
  "scenes": [{ "nodes": [0] }],
  "scene": 0
}"#;

    fn write_triangle(dir: &Path) -> std::path::PathBuf {
        let mut bin = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 2.0, 1.0, 0.5, 1.0, 0.5, 0.25] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        for value in [
            65535u16, 0, 0, 65535, 0, 65535, 0, 65535, 0, 0, 65535, 65535,
        ] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        std::fs::write(dir.join("triangle.bin"), bin).unwrap();
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, TRIANGLE_GLTF).unwrap();
        path
    }

    #[test]
    fn decodes_model_positions_and_normalized_colors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle(dir.path());
        let model = decode_model(&path).unwrap();
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.positions[1], [2.0, 1.0, 0.5]);
        assert_eq!(model.colors[0], [1.0, 0.0, 0.0]);
        assert_eq!(model.colors[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(decode_model(&dir.path().join("head.gltf")).is_err());
    }
}
