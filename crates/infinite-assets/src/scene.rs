//! In-memory form of an externally authored scene, as produced by a
//! foreign-format reader and consumed by the import pipeline.
//!
//! Nothing in here is engine-specific: matrices are row-major, texel channels
//! keep the source's memory order, and textures are referenced by name.

use std::path::Path;

/// Row-major 4x4 matrix, `m[row][column]`.
pub type RowMatrix = [[f32; 4]; 4];

/// The row-major identity matrix.
pub const ROW_IDENTITY: RowMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Material texture slots the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    Specular,
}

impl std::fmt::Display for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureSlot::Diffuse => write!(f, "diffuse"),
            TextureSlot::Specular => write!(f, "specular"),
        }
    }
}

/// A parsed foreign scene.
#[derive(Debug, Clone, Default)]
pub struct ForeignScene {
    pub root: Option<SceneNode>,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    pub textures: Vec<EmbeddedTexture>,
    /// Set by the reader when it could not produce a usable scene.
    pub incomplete: bool,
}

/// A node of the scene hierarchy.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: RowMatrix,
    /// Indices into [`ForeignScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: ROW_IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: RowMatrix) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Raw geometry of one mesh.
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    /// Texture coordinate channels. Only channel 0 is imported.
    pub tex_coords: Vec<Vec<[f32; 2]>>,
    /// Faces as index lists into the vertex arrays. Faces may have any size.
    pub faces: Vec<Vec<u32>>,
    /// Index into [`ForeignScene::materials`].
    pub material: usize,
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// A material with texture references per slot. References are names that
/// are either embedded texture names (see [`ForeignScene::embedded_texture`])
/// or file paths relative to the scene file.
#[derive(Debug, Clone, Default)]
pub struct SceneMaterial {
    pub name: String,
    pub diffuse: Vec<String>,
    pub specular: Vec<String>,
}

impl SceneMaterial {
    pub fn textures(&self, slot: TextureSlot) -> &[String] {
        match slot {
            TextureSlot::Diffuse => &self.diffuse,
            TextureSlot::Specular => &self.specular,
        }
    }
}

/// One texel in the source's BGRA8888 memory order.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Texel {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Texel {
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }
}

/// A texture stored inside the scene file.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedTexture {
    /// Width in texels, or the payload size in bytes when `height` is zero.
    pub width: u32,
    /// Zero when the texture is still an encoded image file in `payload`.
    pub height: u32,
    pub texels: Vec<Texel>,
    pub payload: Vec<u8>,
    /// File extension style hint for encoded payloads, e.g. `png`.
    pub format_hint: String,
    /// Original file name, if the source recorded one.
    pub filename: Option<String>,
}

impl EmbeddedTexture {
    pub fn uncompressed(width: u32, height: u32, texels: Vec<Texel>) -> Self {
        Self {
            width,
            height,
            texels,
            ..Default::default()
        }
    }

    pub fn compressed(payload: Vec<u8>, format_hint: impl Into<String>) -> Self {
        Self {
            width: payload.len() as u32,
            height: 0,
            texels: Vec::new(),
            payload,
            format_hint: format_hint.into(),
            filename: None,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.height == 0
    }
}

impl ForeignScene {
    /// Look up embedded pixel data for a texture reference.
    ///
    /// `*N` names address `textures[N]` directly; any other name matches an
    /// embedded texture recording the same file name.
    pub fn embedded_texture(&self, name: &str) -> Option<&EmbeddedTexture> {
        if let Some(index) = name.strip_prefix('*') {
            return index
                .parse::<usize>()
                .ok()
                .and_then(|i| self.textures.get(i));
        }

        let wanted = file_name_of(name)?;
        self.textures.iter().find(|texture| {
            texture
                .filename
                .as_deref()
                .and_then(file_name_of)
                .is_some_and(|candidate| candidate == wanted)
        })
    }

    /// Structural integrity checks: every reference points at something that
    /// exists and per-vertex arrays line up with the vertex count.
    pub fn validate(&self) -> Result<(), String> {
        for (index, mesh) in self.meshes.iter().enumerate() {
            let vertex_count = mesh.vertex_count();

            if mesh.material >= self.materials.len() {
                return Err(format!(
                    "mesh {index} references material {} of {}",
                    mesh.material,
                    self.materials.len()
                ));
            }

            if let Some(normals) = &mesh.normals {
                if normals.len() != vertex_count {
                    return Err(format!(
                        "mesh {index} has {} normals for {vertex_count} vertices",
                        normals.len()
                    ));
                }
            }

            for (channel, uvs) in mesh.tex_coords.iter().enumerate() {
                if uvs.len() != vertex_count {
                    return Err(format!(
                        "mesh {index} UV channel {channel} has {} entries \
                         for {vertex_count} vertices",
                        uvs.len()
                    ));
                }
            }

            if let Some(bad) = mesh
                .faces
                .iter()
                .flatten()
                .find(|&&i| i as usize >= vertex_count)
            {
                return Err(format!(
                    "mesh {index} face index {bad} out of range for {vertex_count} vertices"
                ));
            }
        }

        if let Some(root) = &self.root {
            self.validate_node(root)?;
        }

        Ok(())
    }

    fn validate_node(&self, node: &SceneNode) -> Result<(), String> {
        if let Some(&bad) = node.meshes.iter().find(|&&i| i >= self.meshes.len()) {
            return Err(format!(
                "node '{}' references mesh {bad} of {}",
                node.name,
                self.meshes.len()
            ));
        }
        node.children
            .iter()
            .try_for_each(|child| self.validate_node(child))
    }
}

fn file_name_of(name: &str) -> Option<&str> {
    Path::new(name).file_name().and_then(|n| n.to_str())
}
