use std::path::PathBuf;

/// Errors that can occur while resolving assets through the [`AssetServer`](crate::AssetServer).
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load image '{0}': {1}")]
    ImageLoadFailed(PathBuf, String),
}

/// Errors that abort a whole model import. A caller of
/// [`load_model`](crate::load_model) only ever sees these as an empty model.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read scene '{0}': {1}")]
    Read(PathBuf, String),

    #[error("scene is incomplete")]
    Incomplete,

    #[error("scene has no root node")]
    MissingRoot,

    #[error("invalid scene: {0}")]
    Invalid(String),
}

/// Errors scoped to a single material texture slot. The slot falls back to
/// the default texture and the import carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    #[error("embedded texture '{0}' is compressed, decompression is not supported")]
    CompressedEmbedded(String),

    #[error("embedded texture '{name}' has {actual} texels, expected {expected}")]
    TruncatedTexels {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("texture path is empty")]
    EmptyPath,

    #[error("failed to resolve texture path '{path}': {reason}")]
    PathResolution { path: String, reason: String },
}
