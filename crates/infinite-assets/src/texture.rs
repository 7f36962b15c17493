use std::path::Path;

use crate::error::AssetError;
use crate::model::EmbeddedPixels;

/// Pixel format of a loaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
}

/// A texture ready for upload, either loaded from a file or copied out of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: TextureFormat,
}

impl TextureAsset {
    pub fn from_embedded(pixels: &EmbeddedPixels) -> Self {
        Self {
            width: pixels.width,
            height: pixels.height,
            data: pixels.data.clone(),
            format: TextureFormat::Rgba8,
        }
    }
}

/// Load an image file and return it as an RGBA8 TextureAsset.
pub fn load_texture(path: &Path) -> Result<TextureAsset, AssetError> {
    let img = image::open(path)
        .map_err(|e| AssetError::ImageLoadFailed(path.to_path_buf(), e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(TextureAsset {
        width,
        height,
        data: rgba.into_raw(),
        format: TextureFormat::Rgba8,
    })
}
