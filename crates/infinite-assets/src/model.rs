//! Engine-side model asset produced by the scene importer.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::asset_key::AssetKey;

/// Mesh vertex with position, normal, and a single UV set.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// RGBA8 pixels copied out of a texture embedded in the scene file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPixels {
    /// `width * height * 4` bytes, RGBA order.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Where a material slot gets its texture from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TextureRef {
    /// Engine default texture.
    #[default]
    Default,
    EmbeddedPixels(EmbeddedPixels),
    /// A texture file the asset server resolves later.
    AssetKey(AssetKey),
}

impl TextureRef {
    pub fn is_default(&self) -> bool {
        matches!(self, TextureRef::Default)
    }

    pub fn asset_key(&self) -> Option<&AssetKey> {
        match self {
            TextureRef::AssetKey(key) => Some(key),
            TextureRef::Default | TextureRef::EmbeddedPixels(_) => None,
        }
    }
}

/// Diffuse and specular texture of a mesh. One texture per slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub diffuse: TextureRef,
    pub specular: TextureRef,
}

/// A renderable mesh with its world transform baked in at import time.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: Material,
    pub transform: Mat4,
}

impl Mesh {
    /// Raw vertex bytes for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes for GPU upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// An imported model: meshes in depth-first preorder of the source hierarchy.
///
/// An empty model is what a failed import produces.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
}

impl Model {
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self { meshes }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    /// Every texture file the model's materials refer to, in mesh order.
    pub fn texture_keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.meshes.iter().flat_map(|mesh| {
            [&mesh.material.diffuse, &mesh.material.specular]
                .into_iter()
                .filter_map(TextureRef::asset_key)
        })
    }
}
