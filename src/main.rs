//! inspect-model - imports a scene file the way the engine does and logs
//! what came out of it.
//!
//! Usage: `inspect-model <scene file> [asset root]`

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use infinite_assets::{import_model, ImportReport, TextureRef};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use settings::ImportSettings;

fn describe(texture: &TextureRef) -> String {
    match texture {
        TextureRef::Default => "default".to_string(),
        TextureRef::EmbeddedPixels(pixels) => {
            format!("embedded {}x{}", pixels.width, pixels.height)
        }
        TextureRef::AssetKey(key) => format!("'{}'", key),
    }
}

/// Lines describing an import. Slot failures are only counted here; the
/// importer already logged each one as an error.
fn summary(scene_path: &Path, report: &ImportReport, verbose: bool) -> Vec<String> {
    let model = &report.model;
    let mut lines = vec![format!(
        "{}: {} meshes, {} vertices, {} texture slots left at default",
        scene_path.display(),
        model.meshes.len(),
        model.vertex_count(),
        report.diagnostics.len()
    )];

    if verbose {
        for (i, mesh) in model.meshes.iter().enumerate() {
            let origin = mesh.transform.w_axis.truncate();
            lines.push(format!(
                "  mesh {}: {} vertices, {} indices, origin {:?}, diffuse {}, specular {}",
                i,
                mesh.vertices.len(),
                mesh.indices.len(),
                origin,
                describe(&mesh.material.diffuse),
                describe(&mesh.material.specular)
            ));
        }
    }

    lines.extend(model.texture_keys().map(|key| format!("  texture {}", key)));
    lines
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let Some(scene_path) = args.next().map(PathBuf::from) else {
        bail!("usage: inspect-model <scene file> [asset root]");
    };

    let mut settings = ImportSettings::load();
    if let Some(asset_root) = args.next() {
        settings.asset_root = PathBuf::from(asset_root);
    }
    info!("Asset root: {}", settings.asset_root.display());

    let report = import_model(&scene_path, &settings.asset_root)?;
    for line in summary(&scene_path, &report, settings.verbose) {
        info!("{}", line);
    }

    Ok(())
}
