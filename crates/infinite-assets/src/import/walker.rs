//! Depth-first walk over the node hierarchy.

use glam::Mat4;
use tracing::info;

use crate::import::extract::process_mesh;
use crate::import::transform::compose;
use crate::import::ImportContext;
use crate::model::Mesh;
use crate::scene::SceneNode;

/// Flatten `node` and its descendants into meshes, in preorder: a node's own
/// meshes first, then each child's meshes in child order.
pub(crate) fn process_node(
    ctx: &mut ImportContext<'_>,
    node: &SceneNode,
    parent: Mat4,
) -> Vec<Mesh> {
    let mut meshes = Vec::new();
    walk(ctx, node, parent, &mut meshes);
    meshes
}

fn walk(ctx: &mut ImportContext<'_>, node: &SceneNode, parent: Mat4, out: &mut Vec<Mesh>) {
    info!("Processing node: {}", node.name);

    let transform = compose(parent, &node.transform);
    let scene = ctx.scene;

    for &mesh_index in &node.meshes {
        out.push(process_mesh(ctx, &scene.meshes[mesh_index], transform));
    }

    for child in &node.children {
        walk(ctx, child, transform, out);
    }
}
