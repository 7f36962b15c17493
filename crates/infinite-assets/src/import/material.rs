//! Material and texture slot resolution.

use std::path::Path;

use crate::asset_key::{resolve_texture_path, AssetKey};
use crate::error::TextureError;
use crate::import::ImportContext;
use crate::model::{EmbeddedPixels, Material, TextureRef};
use crate::scene::{EmbeddedTexture, ForeignScene, TextureSlot};

/// Resolve both slots of the material at `material_index`.
pub(crate) fn process_material(ctx: &mut ImportContext<'_>, material_index: usize) -> Material {
    Material {
        diffuse: process_material_slot(ctx, material_index, TextureSlot::Diffuse),
        specular: process_material_slot(ctx, material_index, TextureSlot::Specular),
    }
}

/// Resolve the first texture of one slot. Anything past the first is ignored.
/// A failure is reported on the context and leaves the slot at its default.
pub(crate) fn process_material_slot(
    ctx: &mut ImportContext<'_>,
    material_index: usize,
    slot: TextureSlot,
) -> TextureRef {
    let scene = ctx.scene;
    let Some(name) = scene.materials[material_index].textures(slot).first() else {
        return TextureRef::Default;
    };

    match resolve_texture(scene, ctx.working_directory(), ctx.asset_root(), name) {
        Ok(texture) => texture,
        Err(error) => {
            ctx.report(material_index, slot, error);
            TextureRef::Default
        }
    }
}

fn resolve_texture(
    scene: &ForeignScene,
    working_directory: &Path,
    asset_root: &Path,
    name: &str,
) -> Result<TextureRef, TextureError> {
    if let Some(texture) = scene.embedded_texture(name) {
        return embedded_pixels(name, texture).map(TextureRef::EmbeddedPixels);
    }

    if name.is_empty() {
        return Err(TextureError::EmptyPath);
    }

    let full_path = resolve_texture_path(working_directory, name)?;
    AssetKey::from_path(&full_path, asset_root).map(TextureRef::AssetKey)
}

/// Copy an uncompressed embedded texture into an RGBA8 buffer, one texel per pixel.
pub(crate) fn embedded_pixels(
    name: &str,
    texture: &EmbeddedTexture,
) -> Result<EmbeddedPixels, TextureError> {
    if texture.is_compressed() {
        return Err(TextureError::CompressedEmbedded(name.to_string()));
    }

    let pixel_count = texture.width as usize * texture.height as usize;
    let texels = texture
        .texels
        .get(..pixel_count)
        .ok_or_else(|| TextureError::TruncatedTexels {
            name: name.to_string(),
            expected: pixel_count,
            actual: texture.texels.len(),
        })?;

    let mut data = Vec::with_capacity(pixel_count * 4);
    for texel in texels {
        data.extend_from_slice(&[texel.r, texel.g, texel.b, texel.a]);
    }

    Ok(EmbeddedPixels {
        data,
        width: texture.width,
        height: texture.height,
    })
}
