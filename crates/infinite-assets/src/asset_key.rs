use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TextureError;

/// Anything that knows the asset root directory asset keys are relative to.
pub trait AssetDirectory {
    fn default_directory(&self) -> &Path;
}

impl AssetDirectory for Path {
    fn default_directory(&self) -> &Path {
        self
    }
}

impl AssetDirectory for PathBuf {
    fn default_directory(&self) -> &Path {
        self
    }
}

/// Identifies a file asset by its `/`-separated path relative to the asset root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the key of `full_path` by removing the asset root in front of it.
    pub fn from_path(full_path: &Path, default_directory: &Path) -> Result<Self, TextureError> {
        let resolution_error = |reason: String| TextureError::PathResolution {
            path: full_path.display().to_string(),
            reason,
        };

        let mut full = normalize(full_path).map_err(resolution_error)?;
        let mut root = normalize(default_directory).map_err(resolution_error)?;

        if full.is_absolute() != root.is_absolute() {
            full = std::path::absolute(&full)
                .map_err(|e| resolution_error(e.to_string()))
                .and_then(|p| normalize(&p).map_err(resolution_error))?;
            root = std::path::absolute(&root)
                .map_err(|e| resolution_error(e.to_string()))
                .and_then(|p| normalize(&p).map_err(resolution_error))?;
        }

        let relative = full
            .strip_prefix(&root)
            .map_err(|_| resolution_error(format!("outside asset root '{}'", root.display())))?;

        let key = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        if key.is_empty() {
            return Err(resolution_error("names the asset root itself".into()));
        }

        Ok(Self(key))
    }

    /// Location of the asset on disk under `default_directory`.
    pub fn to_path(&self, default_directory: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(default_directory.to_path_buf(), |path, part| path.join(part))
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a texture path found in a scene file against the scene's directory.
///
/// Backslash separators are accepted. `.` and `..` are resolved lexically, the
/// file system is never touched.
pub fn resolve_texture_path(
    working_directory: &Path,
    texture_path: &str,
) -> Result<PathBuf, TextureError> {
    let resolution_error = |reason: &str| TextureError::PathResolution {
        path: texture_path.to_string(),
        reason: reason.to_string(),
    };

    if texture_path.contains('\0') {
        return Err(resolution_error("contains a NUL byte"));
    }

    let texture_path = texture_path.replace('\\', "/");
    normalize(&working_directory.join(texture_path))
        .map_err(|reason| resolution_error(reason.as_str()))
}

fn normalize(path: &Path) -> Result<PathBuf, String> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {
                    return Err("path escapes the filesystem root".into());
                }
                Some(Component::CurDir) | Some(Component::ParentDir) | None => out.push(".."),
            },
            Component::Normal(name) => out.push(name),
        }
    }
    Ok(out)
}
