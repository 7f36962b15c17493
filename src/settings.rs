//! Import tool settings with persistence
//!
//! Settings are read from `~/.config/infinite/import.toml`

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Settings for the model inspection tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Directory asset keys are relative to
    pub asset_root: PathBuf,
    /// Print every mesh, not just the totals
    pub verbose: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            verbose: false,
        }
    }
}

impl ImportSettings {
    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("infinite").join("import.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No import settings found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("Failed to parse import settings: {}, using defaults", e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read import settings: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse settings from TOML text. Missing fields take their defaults.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let settings = ImportSettings::parse("verbose = true").unwrap();
        assert!(settings.verbose);
        assert_eq!(settings.asset_root, PathBuf::from("assets"));
    }

    #[test]
    fn round_trips_through_toml() {
        let settings = ImportSettings {
            asset_root: PathBuf::from("/srv/game/assets"),
            verbose: true,
        };
        let text = toml::to_string_pretty(&settings).unwrap();
        assert_eq!(ImportSettings::parse(&text).unwrap(), settings);
    }

    #[test]
    fn wrong_type_is_an_error() {
        assert!(ImportSettings::parse("verbose = 3").is_err());
    }
}
