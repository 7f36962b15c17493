//! Vertex and index extraction for a single mesh.

use glam::Mat4;

use crate::import::material::process_material;
use crate::import::ImportContext;
use crate::model::{Mesh, Vertex};
use crate::scene::SceneMesh;

/// Convert one source mesh. Positions are copied untransformed; `transform`
/// is stored on the mesh instead.
pub(crate) fn process_mesh(ctx: &mut ImportContext<'_>, mesh: &SceneMesh, transform: Mat4) -> Mesh {
    let normals = mesh.normals.as_deref();
    let uvs = mesh.tex_coords.first();

    let vertices = mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let normal = normals
                .and_then(|n| n.get(i).copied())
                .unwrap_or_default();
            let uv = uvs.and_then(|uv| uv.get(i).copied()).unwrap_or_default();
            Vertex::new(position, normal, uv)
        })
        .collect();

    let indices = mesh.faces.iter().flatten().copied().collect();

    Mesh {
        vertices,
        indices,
        material: process_material(ctx, mesh.material),
        transform,
    }
}
