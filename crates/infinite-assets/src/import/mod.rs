//! Scene import: turns a [`ForeignScene`] into an engine [`Model`].
//!
//! The walk starts at the root node with [`transform::axis_correction`] as the
//! parent transform, bakes each node's world transform into its meshes, and
//! resolves material textures relative to the scene file's directory.
//!
//! Texture problems never abort an import. They leave the affected slot at
//! [`TextureRef::Default`](crate::TextureRef::Default) and are collected as
//! [`SlotDiagnostic`]s on the returned [`ImportReport`].

mod extract;
mod material;
pub mod transform;
mod walker;

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::asset_key::AssetDirectory;
use crate::error::{ImportError, TextureError};
use crate::gltf_loader;
use crate::model::Model;
use crate::scene::{ForeignScene, TextureSlot};

/// A texture slot that fell back to the default texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDiagnostic {
    pub material: usize,
    pub slot: TextureSlot,
    pub error: TextureError,
}

/// Result of a successful import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub model: Model,
    pub diagnostics: Vec<SlotDiagnostic>,
}

/// State of one import call, passed down the whole traversal.
pub(crate) struct ImportContext<'a> {
    scene: &'a ForeignScene,
    working_directory: PathBuf,
    asset_root: &'a Path,
    diagnostics: Vec<SlotDiagnostic>,
}

impl<'a> ImportContext<'a> {
    fn new(scene: &'a ForeignScene, working_directory: &Path, asset_root: &'a Path) -> Self {
        Self {
            scene,
            working_directory: working_directory.to_path_buf(),
            asset_root,
            diagnostics: Vec::new(),
        }
    }

    fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    fn asset_root(&self) -> &Path {
        self.asset_root
    }

    fn report(&mut self, material: usize, slot: TextureSlot, error: TextureError) {
        error!("Material {} {} texture: {}", material, slot, error);
        self.diagnostics.push(SlotDiagnostic {
            material,
            slot,
            error,
        });
    }
}

/// Import an already parsed scene. Texture paths resolve against
/// `working_directory`; asset keys are made relative to the asset root of `assets`.
pub fn import_scene<D: AssetDirectory + ?Sized>(
    scene: &ForeignScene,
    working_directory: &Path,
    assets: &D,
) -> Result<ImportReport, ImportError> {
    if scene.incomplete {
        return Err(ImportError::Incomplete);
    }
    let root = scene.root.as_ref().ok_or(ImportError::MissingRoot)?;
    scene.validate().map_err(ImportError::Invalid)?;

    let mut ctx = ImportContext::new(scene, working_directory, assets.default_directory());
    let meshes = walker::process_node(&mut ctx, root, transform::axis_correction());

    Ok(ImportReport {
        model: Model::new(meshes),
        diagnostics: ctx.diagnostics,
    })
}

/// Read and import the scene file at `path`.
pub fn import_model<D: AssetDirectory + ?Sized>(
    path: &Path,
    assets: &D,
) -> Result<ImportReport, ImportError> {
    let scene = gltf_loader::read_scene(path)?;
    let working_directory = path.parent().unwrap_or_else(|| Path::new(""));
    let report = import_scene(&scene, working_directory, assets)?;

    info!(
        "Imported '{}': {} meshes, {} vertices, {} texture issues",
        path.display(),
        report.model.meshes.len(),
        report.model.vertex_count(),
        report.diagnostics.len()
    );

    Ok(report)
}

/// Load a model, or an empty one if the scene cannot be read.
///
/// Callers must treat an empty model as a failed load; the cause is logged.
pub fn load_model<D: AssetDirectory + ?Sized>(path: &Path, assets: &D) -> Model {
    match import_model(path, assets) {
        Ok(report) => report.model,
        Err(e) => {
            error!("Model import failed: {}", e);
            Model::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use glam::{Mat4, Vec3};

    use super::transform::{axis_correction, convert_matrix};
    use super::*;
    use crate::asset_key::AssetKey;
    use crate::model::{EmbeddedPixels, TextureRef};
    use crate::scene::{EmbeddedTexture, RowMatrix, SceneMaterial, SceneMesh, SceneNode, Texel};

    const ASSETS: &str = "/assets";

    fn translation(x: f32, y: f32, z: f32) -> RowMatrix {
        [
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, y],
            [0.0, 0.0, 1.0, z],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    fn rotation_z_then_scale(angle: f32, scale: f32) -> RowMatrix {
        let m = Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_rotation_z(angle);
        m.transpose().to_cols_array_2d()
    }

    fn triangle(name: &str, material: usize) -> SceneMesh {
        SceneMesh {
            name: name.into(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![vec![0, 1, 2]],
            material,
            ..Default::default()
        }
    }

    fn scene(
        root: SceneNode,
        meshes: Vec<SceneMesh>,
        materials: Vec<SceneMaterial>,
    ) -> ForeignScene {
        ForeignScene {
            root: Some(root),
            meshes,
            materials,
            ..Default::default()
        }
    }

    fn import(scene: &ForeignScene) -> ImportReport {
        import_scene(scene, Path::new("/assets/models/foo"), Path::new(ASSETS)).unwrap()
    }

    fn diffuse_material(textures: &[&str]) -> SceneMaterial {
        SceneMaterial {
            name: "mat".into(),
            diffuse: textures.iter().map(|t| t.to_string()).collect(),
            specular: Vec::new(),
        }
    }

    #[test]
    fn single_triangle_scene() {
        let l0 = translation(1.0, 2.0, 3.0);
        let scene = scene(
            SceneNode::new("root").with_transform(l0).with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![SceneMaterial::default()],
        );

        let report = import(&scene);
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.model.meshes.len(), 1);

        let mesh = &report.model.meshes[0];
        assert_eq!(mesh.vertices.len(), 3);
        assert!(mesh
            .vertices
            .iter()
            .all(|v| v.normal == [0.0; 3] && v.uv == [0.0; 2]));
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.indices, [0, 1, 2]);
        assert_eq!(mesh.material.diffuse, TextureRef::Default);
        assert_eq!(mesh.material.specular, TextureRef::Default);
        assert_eq!(mesh.transform, axis_correction() * convert_matrix(&l0));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with an INFO-level subscriber and return what it printed.
    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn visited_nodes_are_logged_at_info_and_slot_failures_once() {
        let scene = scene(
            SceneNode::new("root").with_child(SceneNode::new("child").with_meshes([0])),
            vec![triangle("tri", 0)],
            vec![diffuse_material(&[""])],
        );

        let logs = captured_logs(|| {
            import(&scene);
        });

        let node_lines: Vec<&str> = logs
            .lines()
            .filter(|line| line.contains("Processing node:"))
            .collect();
        assert_eq!(node_lines.len(), 2);
        assert!(node_lines[0].ends_with("Processing node: root"));
        assert!(node_lines[1].ends_with("Processing node: child"));
        assert!(node_lines.iter().all(|line| line.contains("INFO")));

        assert_eq!(logs.lines().filter(|line| line.contains("ERROR")).count(), 1);
    }

    #[test]
    fn meshes_only_on_child() {
        let l0 = translation(0.0, 5.0, 0.0);
        let l1 = rotation_z_then_scale(0.5, 2.0);
        let scene = scene(
            SceneNode::new("root")
                .with_transform(l0)
                .with_child(SceneNode::new("child").with_transform(l1).with_meshes([0])),
            vec![triangle("tri", 0)],
            vec![SceneMaterial::default()],
        );

        let model = import(&scene).model;
        assert_eq!(model.meshes.len(), 1);
        let expected = axis_correction() * convert_matrix(&l0) * convert_matrix(&l1);
        assert!(model.meshes[0].transform.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn meshes_come_out_in_preorder() {
        // root(0, 5) -> [a(1, 2) -> [a1(3)], b -> [b1(4)]]
        let tree = SceneNode::new("root")
            .with_meshes([0, 5])
            .with_child(
                SceneNode::new("a")
                    .with_meshes([1, 2])
                    .with_child(SceneNode::new("a1").with_meshes([3])),
            )
            .with_child(SceneNode::new("b").with_child(SceneNode::new("b1").with_meshes([4])));
        let meshes = (0..6).map(|i| triangle(&format!("m{i}"), 0)).collect::<Vec<_>>();
        let mut scene = scene(tree, meshes, vec![SceneMaterial::default()]);
        for (i, mesh) in scene.meshes.iter_mut().enumerate() {
            mesh.positions[0] = [i as f32, 0.0, 0.0];
        }

        let order: Vec<f32> = import(&scene)
            .model
            .meshes
            .iter()
            .map(|m| m.vertices[0].position[0])
            .collect();
        assert_eq!(order, [0.0, 5.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn shared_mesh_is_emitted_per_referencing_node() {
        let scene = scene(
            SceneNode::new("root")
                .with_child(
                    SceneNode::new("left")
                        .with_transform(translation(-1.0, 0.0, 0.0))
                        .with_meshes([0]),
                )
                .with_child(
                    SceneNode::new("right")
                        .with_transform(translation(1.0, 0.0, 0.0))
                        .with_meshes([0]),
                ),
            vec![triangle("tri", 0)],
            vec![SceneMaterial::default()],
        );

        let model = import(&scene).model;
        assert_eq!(model.meshes.len(), 2);
        let x = |m: &crate::Mesh| m.transform.transform_point3(Vec3::ZERO).x;
        assert_eq!(x(&model.meshes[0]), -1.0);
        assert_eq!(x(&model.meshes[1]), 1.0);
    }

    #[test]
    fn deep_chain_multiplies_every_ancestor() {
        let locals = [
            translation(1.0, 0.0, 0.0),
            rotation_z_then_scale(0.3, 1.5),
            translation(0.0, -2.0, 4.0),
            rotation_z_then_scale(-1.2, 0.5),
        ];
        let mut node = SceneNode::new("n3").with_transform(locals[3]).with_meshes([0]);
        for (depth, local) in locals.iter().enumerate().take(3).rev() {
            node = SceneNode::new(format!("n{depth}"))
                .with_transform(*local)
                .with_child(node);
        }
        let scene = scene(node, vec![triangle("tri", 0)], vec![SceneMaterial::default()]);

        let expected = locals
            .iter()
            .fold(axis_correction(), |acc, local| acc * convert_matrix(local));
        let model = import(&scene).model;
        assert!(model.meshes[0].transform.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn normals_and_first_uv_channel_are_copied() {
        let mut mesh = triangle("tri", 0);
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]; 3]);
        mesh.tex_coords = vec![
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            vec![[9.0, 9.0]; 3],
        ];
        let scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![mesh],
            vec![SceneMaterial::default()],
        );

        let vertices = &import(&scene).model.meshes[0].vertices;
        assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(vertices[1].uv, [1.0, 0.0]);
        assert_eq!(vertices[2].uv, [0.0, 1.0]);
    }

    #[test]
    fn faces_of_any_size_are_flattened_in_order() {
        let mut mesh = triangle("poly", 0);
        mesh.positions.push([1.0, 1.0, 0.0]);
        mesh.faces = vec![vec![2, 1, 0], vec![0, 1, 3, 2], vec![3]];
        let scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![mesh],
            vec![SceneMaterial::default()],
        );

        let mesh = &import(&scene).model.meshes[0];
        assert_eq!(mesh.indices, [2, 1, 0, 0, 1, 3, 2, 3]);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn file_texture_becomes_asset_key() {
        let scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![diffuse_material(&["tex.png"])],
        );

        let report =
            import_scene(&scene, Path::new("/assets/models/foo/"), Path::new("/assets/")).unwrap();
        assert_eq!(
            report.model.meshes[0].material.diffuse,
            TextureRef::AssetKey(AssetKey::new("models/foo/tex.png"))
        );
    }

    #[test]
    fn embedded_texture_becomes_rgba_pixels() {
        let mut scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![diffuse_material(&["*0"])],
        );
        scene.textures.push(EmbeddedTexture::uncompressed(
            2,
            1,
            vec![Texel::rgba(10, 20, 30, 255), Texel::rgba(40, 50, 60, 255)],
        ));

        assert_eq!(
            import(&scene).model.meshes[0].material.diffuse,
            TextureRef::EmbeddedPixels(EmbeddedPixels {
                data: vec![10, 20, 30, 255, 40, 50, 60, 255],
                width: 2,
                height: 1,
            })
        );
    }

    #[test]
    fn every_pixel_is_remapped() {
        let (width, height) = (3u32, 2u32);
        let texels: Vec<Texel> = (0..width * height)
            .map(|i| {
                let i = i as u8;
                Texel::rgba(i, i.wrapping_mul(3), i.wrapping_add(100), 255 - i)
            })
            .collect();
        let mut scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![diffuse_material(&["*0"])],
        );
        scene
            .textures
            .push(EmbeddedTexture::uncompressed(width, height, texels.clone()));

        let TextureRef::EmbeddedPixels(pixels) = &import(&scene).model.meshes[0].material.diffuse
        else {
            panic!("expected embedded pixels");
        };
        assert_eq!(pixels.data.len(), (width * height * 4) as usize);
        for (texel, out) in texels.iter().zip(pixels.data.chunks_exact(4)) {
            assert_eq!(out, [texel.r, texel.g, texel.b, texel.a]);
        }
    }

    #[test]
    fn only_first_texture_of_a_slot_is_used() {
        let single = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![diffuse_material(&["a.png"])],
        );
        let mut many = single.clone();
        many.materials[0] = diffuse_material(&["a.png", "b.png", "*0", ""]);

        let a = import(&single);
        let b = import(&many);
        assert_eq!(a.model.meshes[0].material, b.model.meshes[0].material);
        assert!(b.diagnostics.is_empty());
    }

    #[test]
    fn compressed_texture_only_affects_its_slot() {
        let mut first = diffuse_material(&["*0"]);
        first.specular = vec!["spec.png".into()];
        let mut scene = scene(
            SceneNode::new("root")
                .with_meshes([0])
                .with_child(SceneNode::new("child").with_meshes([1])),
            vec![triangle("a", 0), triangle("b", 1)],
            vec![first, diffuse_material(&["*1"])],
        );
        scene.textures = vec![
            EmbeddedTexture::compressed(vec![0xff, 0xd8, 0xff], "jpg"),
            EmbeddedTexture::uncompressed(1, 1, vec![Texel::rgba(1, 2, 3, 4)]),
        ];

        let report = import(&scene);
        assert_eq!(
            report.diagnostics,
            [SlotDiagnostic {
                material: 0,
                slot: TextureSlot::Diffuse,
                error: TextureError::CompressedEmbedded("*0".into()),
            }]
        );

        let meshes = &report.model.meshes;
        assert_eq!(meshes.len(), 2);
        assert!(meshes[0].material.diffuse.is_default());
        assert_eq!(
            meshes[0].material.specular,
            TextureRef::AssetKey(AssetKey::new("models/foo/spec.png"))
        );
        assert!(matches!(meshes[1].material.diffuse, TextureRef::EmbeddedPixels(_)));
        assert_eq!(meshes[0].vertices.len(), 3);
    }

    #[test]
    fn empty_texture_path_defaults_slot() {
        let scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![diffuse_material(&[""])],
        );

        let report = import(&scene);
        assert!(report.model.meshes[0].material.diffuse.is_default());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].error, TextureError::EmptyPath);
    }

    #[test]
    fn unresolvable_texture_path_defaults_slot() {
        let scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![
                diffuse_material(&["../../../../../outside.png"]),
                diffuse_material(&["/elsewhere/x.png"]),
            ],
        );
        let mut two = scene.clone();
        two.meshes[0].material = 1;

        for scene in [scene, two] {
            let report = import(&scene);
            assert!(report.model.meshes[0].material.diffuse.is_default());
            assert!(matches!(
                report.diagnostics[..],
                [SlotDiagnostic {
                    error: TextureError::PathResolution { .. },
                    ..
                }]
            ));
        }
    }

    #[test]
    fn incomplete_scene_is_rejected() {
        let mut scene = scene(SceneNode::new("root"), Vec::new(), Vec::new());
        scene.incomplete = true;
        let err = import_scene(&scene, Path::new("/"), Path::new(ASSETS)).unwrap_err();
        assert!(matches!(err, ImportError::Incomplete));
    }

    #[test]
    fn scene_without_root_is_rejected() {
        let scene = ForeignScene::default();
        let err = import_scene(&scene, Path::new("/"), Path::new(ASSETS)).unwrap_err();
        assert!(matches!(err, ImportError::MissingRoot));
    }

    #[test]
    fn structurally_broken_scene_is_rejected() {
        let scene = scene(
            SceneNode::new("root").with_meshes([3]),
            vec![triangle("tri", 0)],
            vec![SceneMaterial::default()],
        );
        let err = import_scene(&scene, Path::new("/"), Path::new(ASSETS)).unwrap_err();
        assert!(matches!(err, ImportError::Invalid(_)));
    }

    #[test]
    fn missing_file_loads_as_empty_model() {
        let model = load_model(Path::new("/does/not/exist.gltf"), Path::new(ASSETS));
        assert!(model.is_empty());
    }

    #[test]
    fn gltf_file_imports_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = crate::gltf_loader::tests::write_triangle_gltf(dir.path());

        let report = import_model(&path, dir.path()).unwrap();
        assert!(report.diagnostics.is_empty());

        let meshes = &report.model.meshes;
        assert_eq!(meshes.len(), 3);

        let expected = axis_correction() * Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(meshes.iter().all(|m| m.transform.abs_diff_eq(expected, 1e-6)));
        assert_eq!(meshes[0].indices, [0, 1, 2]);
        assert!(meshes[0].vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));

        assert_eq!(
            meshes[0].material.diffuse,
            TextureRef::EmbeddedPixels(EmbeddedPixels {
                data: vec![10, 20, 30, 255, 40, 50, 60, 255],
                width: 2,
                height: 1,
            })
        );
        assert_eq!(
            meshes[1].material.diffuse,
            TextureRef::AssetKey(AssetKey::new("models/tri/textures/wood grain.png"))
        );
        assert_eq!(meshes[2].material, crate::Material::default());
    }

    #[test]
    fn unparsable_file_loads_as_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.glb");
        std::fs::write(&path, b"glTF\x02\x00\x00\x00garbage").unwrap();
        assert!(load_model(&path, dir.path()).is_empty());
    }

    #[test]
    fn concurrent_imports_use_their_own_directory() {
        let scene = scene(
            SceneNode::new("root").with_meshes([0]),
            vec![triangle("tri", 0)],
            vec![diffuse_material(&["tex.png"])],
        );

        let keys: Vec<TextureRef> = std::thread::scope(|s| {
            let handles: Vec<_> = ["a", "b", "c", "d"]
                .into_iter()
                .map(|dir| {
                    let scene = &scene;
                    s.spawn(move || {
                        let working_directory = Path::new(ASSETS).join(dir);
                        import_scene(scene, &working_directory, Path::new(ASSETS))
                            .unwrap()
                            .model
                            .meshes[0]
                            .material
                            .diffuse
                            .clone()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let expected: Vec<TextureRef> = ["a", "b", "c", "d"]
            .iter()
            .map(|dir| TextureRef::AssetKey(AssetKey::new(format!("{dir}/tex.png"))))
            .collect();
        assert_eq!(keys, expected);
    }
}
