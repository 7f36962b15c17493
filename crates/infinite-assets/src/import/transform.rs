//! Conversion of source matrices and parent-to-child composition.

use glam::{Mat4, Vec4};

use crate::scene::RowMatrix;

/// Convert a row-major source matrix into the engine's column-major [`Mat4`].
pub fn convert_matrix(matrix: &RowMatrix) -> Mat4 {
    Mat4::from_cols_array_2d(matrix).transpose()
}

/// World transform of a node: the parent's transform followed by the node's local one.
pub fn compose(parent: Mat4, local: &RowMatrix) -> Mat4 {
    parent * convert_matrix(local)
}

/// Applied once at the root: negates the Y and Z basis vectors.
pub fn axis_correction() -> Mat4 {
    Mat4::from_diagonal(Vec4::new(1.0, -1.0, -1.0, 1.0))
}
