use std::path::Path;

use base64::Engine as _;
use glam::{Mat4, Vec3};
use gltf::image::Source;
use gltf::mesh::Mode;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::scene::{
    EmbeddedTexture, ForeignScene, RowMatrix, SceneMaterial, SceneMesh, SceneNode, Texel,
};

/// Post-processing applied while reading a scene.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ImportFlags {
    /// Expand triangle strips and fans into triangle faces.
    pub triangulate: bool,
    /// Compute smooth normals for primitives that have none.
    pub gen_smooth_normals: bool,
    /// Texture coordinates with a top-left origin.
    pub flip_uvs: bool,
}

/// The fixed flag set every import uses.
pub(crate) const IMPORT_FLAGS: ImportFlags = ImportFlags {
    triangulate: true,
    gen_smooth_normals: true,
    flip_uvs: true,
};

/// Read a glTF 2.0 file (.gltf or .glb) into a [`ForeignScene`].
pub fn read_scene(path: &Path) -> Result<ForeignScene, ImportError> {
    read_scene_with(path, IMPORT_FLAGS)
}

pub(crate) fn read_scene_with(
    path: &Path,
    flags: ImportFlags,
) -> Result<ForeignScene, ImportError> {
    let read_error = |e: gltf::Error| ImportError::Read(path.to_path_buf(), e.to_string());

    let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(read_error)?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob).map_err(read_error)?;

    let scene = SceneBuilder::new(&buffers, flags).build(&document);

    debug!(
        "glTF '{}': {} meshes, {} materials, {} embedded textures",
        path.display(),
        scene.meshes.len(),
        scene.materials.len(),
        scene.textures.len()
    );

    Ok(scene)
}

struct SceneBuilder<'a> {
    buffers: &'a [gltf::buffer::Data],
    flags: ImportFlags,
    scene: ForeignScene,
    /// Texture reference name of every glTF image, by image index.
    image_names: Vec<String>,
    /// Foreign mesh indices of every glTF mesh's primitives, by mesh index.
    mesh_primitives: Vec<Vec<usize>>,
    default_material: Option<usize>,
}

impl<'a> SceneBuilder<'a> {
    fn new(buffers: &'a [gltf::buffer::Data], flags: ImportFlags) -> Self {
        Self {
            buffers,
            flags,
            scene: ForeignScene::default(),
            image_names: Vec::new(),
            mesh_primitives: Vec::new(),
            default_material: None,
        }
    }

    fn build(mut self, document: &gltf::Document) -> ForeignScene {
        for image in document.images() {
            let name = self.read_image(&image);
            self.image_names.push(name);
        }

        for material in document.materials() {
            let material = self.read_material(&material);
            self.scene.materials.push(material);
        }

        for mesh in document.meshes() {
            let primitives = self.read_mesh(&mesh);
            self.mesh_primitives.push(primitives);
        }

        let root = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| {
                let mut root = SceneNode::new(scene.name().unwrap_or("root"));
                let mut path = Vec::new();
                for node in scene.nodes() {
                    if let Some(child) = self.read_node(&node, &mut path) {
                        root.children.push(child);
                    }
                }
                root
            });

        self.scene.root = root;
        self.scene.incomplete = self.scene.meshes.is_empty();
        self.scene
    }

    fn read_node(&self, node: &gltf::Node, path: &mut Vec<usize>) -> Option<SceneNode> {
        if path.contains(&node.index()) {
            warn!("Node {} is its own ancestor, skipping", node.index());
            return None;
        }
        path.push(node.index());

        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index()));
        let meshes = node
            .mesh()
            .and_then(|mesh| self.mesh_primitives.get(mesh.index()))
            .cloned()
            .unwrap_or_default();
        let children = node
            .children()
            .filter_map(|child| self.read_node(&child, path))
            .collect();

        path.pop();

        Some(SceneNode {
            name,
            transform: row_major(node.transform().matrix()),
            meshes,
            children,
        })
    }

    fn read_mesh(&mut self, mesh: &gltf::Mesh) -> Vec<usize> {
        let name = mesh.name().unwrap_or("unnamed");
        let mut indices = Vec::new();

        for primitive in mesh.primitives() {
            match self.read_primitive(name, &primitive) {
                Some(scene_mesh) => {
                    indices.push(self.scene.meshes.len());
                    self.scene.meshes.push(scene_mesh);
                }
                None => warn!(
                    "Mesh '{}' primitive {} has no positions, skipping",
                    name,
                    primitive.index()
                ),
            }
        }

        debug!("Loaded mesh '{}' with {} primitives", name, indices.len());
        indices
    }

    fn read_primitive(&mut self, name: &str, primitive: &gltf::Primitive) -> Option<SceneMesh> {
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();

        let mut normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());

        let mut tex_coords: Vec<Vec<[f32; 2]>> = (0..)
            .map_while(|set| reader.read_tex_coords(set).map(|tc| tc.into_f32().collect()))
            .collect();

        // glTF already uses a top-left UV origin.
        if !self.flags.flip_uvs {
            for uv in tex_coords.iter_mut().flatten() {
                uv[1] = 1.0 - uv[1];
            }
        }

        let indices: Vec<u32> = reader
            .read_indices()
            .map(|idx| idx.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());

        let faces = build_faces(primitive.mode(), &indices, self.flags.triangulate);

        if normals.is_none() && self.flags.gen_smooth_normals {
            normals = smooth_normals(&positions, &faces);
        }

        let material = match primitive.material().index() {
            Some(index) => index,
            None => self.default_material(),
        };

        Some(SceneMesh {
            name: format!("{}/{}", name, primitive.index()),
            positions,
            normals,
            tex_coords,
            faces,
            material,
        })
    }

    /// Index of the textureless material used by primitives that name none.
    fn default_material(&mut self) -> usize {
        *self.default_material.get_or_insert_with(|| {
            self.scene.materials.push(SceneMaterial {
                name: "default".into(),
                ..Default::default()
            });
            self.scene.materials.len() - 1
        })
    }

    fn read_material(&self, material: &gltf::Material) -> SceneMaterial {
        let spec_gloss = material.pbr_specular_glossiness();

        let diffuse = [
            spec_gloss.as_ref().and_then(|sg| sg.diffuse_texture()),
            material.pbr_metallic_roughness().base_color_texture(),
        ];
        let specular = [
            spec_gloss.as_ref().and_then(|sg| sg.specular_glossiness_texture()),
            material.specular().and_then(|s| s.specular_color_texture()),
        ];

        SceneMaterial {
            name: material.name().unwrap_or_default().to_string(),
            diffuse: self.texture_names(diffuse),
            specular: self.texture_names(specular),
        }
    }

    fn texture_names<'d>(
        &self,
        infos: impl IntoIterator<Item = Option<gltf::texture::Info<'d>>>,
    ) -> Vec<String> {
        infos
            .into_iter()
            .flatten()
            .filter_map(|info| self.image_names.get(info.texture().source().index()))
            .cloned()
            .collect()
    }

    /// Returns the name materials use to refer to this image.
    fn read_image(&mut self, image: &gltf::Image) -> String {
        match image.source() {
            Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = self
                    .buffers
                    .get(view.buffer().index())
                    .and_then(|data| data.0.get(start..end))
                    .map(<[u8]>::to_vec);
                self.embed(image, bytes, Some(mime_type))
            }
            Source::Uri { uri, mime_type } => match uri.strip_prefix("data:") {
                Some(data) => {
                    let (bytes, mime) = decode_data_uri(data);
                    self.embed(image, bytes, mime.or(mime_type))
                }
                None => urlencoding::decode(uri)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| uri.to_string()),
            },
        }
    }

    fn embed(
        &mut self,
        image: &gltf::Image,
        bytes: Option<Vec<u8>>,
        mime_type: Option<&str>,
    ) -> String {
        let name = format!("*{}", self.scene.textures.len());
        let format_hint = mime_type
            .and_then(|mime| mime.strip_prefix("image/"))
            .unwrap_or_default()
            .to_string();

        // glTF image names are labels, not file names, so `filename` stays unset
        // and materials reach embedded images only through `*N`.
        let texture = match bytes {
            Some(bytes) => decode_embedded(bytes, format_hint),
            None => {
                warn!("Embedded image {} has unreadable data", image.index());
                EmbeddedTexture::compressed(Vec::new(), format_hint)
            }
        };

        self.scene.textures.push(texture);
        name
    }
}

fn row_major(columns: [[f32; 4]; 4]) -> RowMatrix {
    Mat4::from_cols_array_2d(&columns)
        .transpose()
        .to_cols_array_2d()
}

/// Split the part of a `data:` URI after the scheme into its bytes and media type.
fn decode_data_uri(data: &str) -> (Option<Vec<u8>>, Option<&str>) {
    let Some((header, payload)) = data.split_once(',') else {
        return (None, None);
    };
    let mime = header.split(';').next().filter(|m| !m.is_empty());

    let bytes = if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD.decode(payload).ok()
    } else {
        Some(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    };

    (bytes, mime)
}

/// Decode an embedded image file to texels, or keep it encoded if the format
/// is not one we can read.
fn decode_embedded(bytes: Vec<u8>, format_hint: String) -> EmbeddedTexture {
    match image::load_from_memory(&bytes) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            let texels = rgba
                .pixels()
                .map(|pixel| {
                    let [r, g, b, a] = pixel.0;
                    Texel::rgba(r, g, b, a)
                })
                .collect();
            EmbeddedTexture::uncompressed(width, height, texels)
        }
        Err(e) => {
            debug!("Keeping embedded '{}' image encoded: {}", format_hint, e);
            EmbeddedTexture::compressed(bytes, format_hint)
        }
    }
}

/// Group a primitive's indices into faces.
fn build_faces(mode: Mode, indices: &[u32], triangulate: bool) -> Vec<Vec<u32>> {
    match mode {
        Mode::Points => indices.iter().map(|&i| vec![i]).collect(),
        Mode::Lines => indices.chunks_exact(2).map(<[u32]>::to_vec).collect(),
        Mode::LineStrip => indices.windows(2).map(<[u32]>::to_vec).collect(),
        Mode::LineLoop => {
            let mut faces: Vec<Vec<u32>> = indices.windows(2).map(<[u32]>::to_vec).collect();
            if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                if indices.len() > 2 {
                    faces.push(vec![last, first]);
                }
            }
            faces
        }
        Mode::Triangles => indices.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip if triangulate => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                // Every other triangle of a strip has reversed winding.
                if i % 2 == 0 {
                    vec![w[0], w[1], w[2]]
                } else {
                    vec![w[1], w[0], w[2]]
                }
            })
            .collect(),
        Mode::TriangleFan if triangulate => indices
            .windows(2)
            .skip(1)
            .map(|w| vec![indices[0], w[0], w[1]])
            .collect(),
        Mode::TriangleStrip | Mode::TriangleFan => {
            if indices.is_empty() {
                Vec::new()
            } else {
                vec![indices.to_vec()]
            }
        }
    }
}

/// Area-weighted vertex normals from triangle faces. `None` if there are no triangles.
fn smooth_normals(positions: &[[f32; 3]], faces: &[Vec<u32>]) -> Option<Vec<[f32; 3]>> {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    let mut any_triangle = false;

    for face in faces {
        let &[a, b, c] = face.as_slice() else {
            continue;
        };
        let corners = [a as usize, b as usize, c as usize];
        let (Some(pa), Some(pb), Some(pc)) = (
            positions.get(corners[0]),
            positions.get(corners[1]),
            positions.get(corners[2]),
        ) else {
            continue;
        };

        let (pa, pb, pc) = (Vec3::from(*pa), Vec3::from(*pb), Vec3::from(*pc));
        let normal = (pb - pa).cross(pc - pa);
        for corner in corners {
            accumulated[corner] += normal;
        }
        any_triangle = true;
    }

    any_triangle.then(|| {
        accumulated
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect()
    })
}
