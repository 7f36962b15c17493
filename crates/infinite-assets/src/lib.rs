//! Infinite Assets - Asset loading and model import
//!
//! Imports externally authored scenes (glTF 2.0) into flat engine models with
//! baked world transforms, resolves material textures to embedded pixels or
//! asset keys, and caches loaded assets in the [`AssetServer`].

mod asset_key;
mod error;
mod gltf_loader;
pub mod import;
mod model;
pub mod scene;
mod server;
mod texture;

pub use asset_key::{resolve_texture_path, AssetDirectory, AssetKey};
pub use error::{AssetError, ImportError, TextureError};
pub use gltf_loader::read_scene;
pub use import::{import_model, import_scene, load_model, ImportReport, SlotDiagnostic};
pub use model::{EmbeddedPixels, Material, Mesh, Model, TextureRef, Vertex};
pub use scene::{ForeignScene, TextureSlot};
pub use server::AssetServer;
pub use texture::{load_texture, TextureAsset, TextureFormat};
