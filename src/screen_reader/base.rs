//! User settings: what the control surface used to collect

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fish::{FishType, Location};

/// Which pull-bar reading the profile uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BarVariant {
    /// Marker position against the bright target zone on a 1-px scanline
    #[default]
    Index,
    /// Share of in-zone colored pixels on a 2-px strip
    Color,
}

/// Settings structure, stored as `config/settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub location: Location,
    pub fish_type: FishType,
    /// Cast binding: a single key or `mouseRight`
    pub fish_key: String,
    /// 0-100; raises the bright cutoff of the bar reader
    pub brightness: u8,
    pub auto_salvage: bool,
    /// Salvage when remaining bag capacity falls below this percentage
    pub salvage_capacity: u8,
    pub stop_key: String,
    pub window_title: String,
    pub bar_variant: BarVariant,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            location: Location::Tundra,
            fish_type: FishType::Yellow,
            fish_key: "5".to_string(),
            brightness: 50,
            auto_salvage: false,
            salvage_capacity: 25,
            stop_key: "F10".to_string(),
            window_title: crate::window::TARGET_TITLE.to_string(),
            bar_variant: BarVariant::Index,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults on a missing or corrupt file
    pub fn load(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            tracing::info!("[INIT] No settings at {:?}, using defaults", path);
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("[INIT] Invalid settings file {:?}: {}. Using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Write the settings as pretty JSON, creating `config/` when needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.location, Location::Tundra);
        assert_eq!(settings.fish_type, FishType::Yellow);
        assert_eq!(settings.stop_key, "F10");
        assert_eq!(settings.salvage_capacity, 25);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"location": "ashwold", "auto_salvage": true}"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.location, Location::Ashwold);
        assert!(settings.auto_salvage);
        assert_eq!(settings.fish_key, "5");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");
        let settings = Settings { brightness: 80, bar_variant: BarVariant::Color, ..Settings::default() };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[]").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }
}
