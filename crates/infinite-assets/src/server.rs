use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::asset_key::{AssetDirectory, AssetKey};
use crate::error::{AssetError, ImportError};
use crate::import;
use crate::model::{Model, TextureRef};
use crate::texture::{self, TextureAsset};

/// Central asset registry. Imports models, resolves asset keys to textures,
/// and caches both.
pub struct AssetServer {
    base_path: PathBuf,
    models: HashMap<PathBuf, Arc<Model>>,
    textures: HashMap<AssetKey, TextureAsset>,
}

impl AssetServer {
    /// Create a new AssetServer rooted at the given base path. Asset keys are
    /// relative to this directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        info!("AssetServer created with base path: {}", base_path.display());
        Self {
            base_path,
            models: HashMap::new(),
            textures: HashMap::new(),
        }
    }

    /// Resolve a relative asset path against the base path.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Import a scene file into a model.
    /// Subsequent loads of the same path return the cached model.
    pub fn load_model(&mut self, path: &Path) -> Result<Arc<Model>, ImportError> {
        let full_path = self.resolve(path);

        if let Some(model) = self.models.get(&full_path) {
            return Ok(Arc::clone(model));
        }

        if !full_path.exists() {
            return Err(ImportError::Read(full_path, "file not found".into()));
        }

        let report = import::import_model(&full_path, &*self)?;
        let model = Arc::new(report.model);
        self.models.insert(full_path, Arc::clone(&model));

        Ok(model)
    }

    /// Load the texture file an asset key names.
    /// Subsequent loads of the same key return the cached texture.
    pub fn load_texture(&mut self, key: &AssetKey) -> Result<&TextureAsset, AssetError> {
        match self.textures.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = key.to_path(&self.base_path);
                if !path.exists() {
                    return Err(AssetError::NotFound(path));
                }
                let tex = texture::load_texture(&path)?;
                Ok(&*entry.insert(tex))
            }
        }
    }

    /// Pixels for a material slot, or `None` when the slot uses the default texture.
    pub fn texture_for(
        &mut self,
        texture: &TextureRef,
    ) -> Result<Option<TextureAsset>, AssetError> {
        match texture {
            TextureRef::Default => Ok(None),
            TextureRef::EmbeddedPixels(pixels) => Ok(Some(TextureAsset::from_embedded(pixels))),
            TextureRef::AssetKey(key) => self.load_texture(key).map(|tex| Some(tex.clone())),
        }
    }

    /// Check if a model at this path has been imported.
    pub fn is_model_loaded(&self, path: &Path) -> bool {
        self.models.contains_key(&self.resolve(path))
    }

    /// Check if the texture an asset key names has been loaded.
    pub fn is_texture_loaded(&self, key: &AssetKey) -> bool {
        self.textures.contains_key(key)
    }

    /// The base path this server resolves relative paths against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl AssetDirectory for AssetServer {
    fn default_directory(&self) -> &Path {
        &self.base_path
    }
}
