//! Calibration cache: last known boxes of HUD templates

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::error::Result;
use crate::geometry::MatchBox;

/// Last-known boxes keyed by template key. Never authoritative: callers fall back to a
/// full search on a miss.
#[derive(Debug, Default)]
pub struct RegionCache {
    path: Option<PathBuf>,
    regions: RwLock<HashMap<String, MatchBox>>,
}

impl RegionCache {
    /// In-memory cache with no backing file
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache file. Absence or corruption yields an empty, still file-backed cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let regions = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, MatchBox>>(&content) {
                Ok(map) => {
                    tracing::info!("[INIT] Loaded {} cached regions from {:?}", map.len(), path);
                    map
                }
                Err(e) => {
                    tracing::warn!("[INIT] Ignoring corrupt region cache {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path: Some(path), regions: RwLock::new(regions) }
    }

    pub fn get(&self, key: &str) -> Option<MatchBox> {
        self.regions.read().get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.regions.read().contains_key(key)
    }

    /// Store a box, writing through to disk when file-backed. A failed write only warns.
    pub fn put(&self, key: &str, b: MatchBox) {
        let changed = self.regions.write().insert(key.to_string(), b) != Some(b);
        if changed {
            if let Err(e) = self.save() {
                tracing::warn!("Failed to persist region cache: {}", e);
            }
        }
    }

    /// Forget everything in memory; the file is left as is
    pub fn clear(&self) {
        self.regions.write().clear();
    }

    /// Clear and delete the backing file
    pub fn reset(&self) -> Result<()> {
        self.clear();
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&*self.regions.read())?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mb(l: i32, t: i32) -> MatchBox {
        MatchBox::from_match(l, t, 40, 20).unwrap()
    }

    #[test]
    fn test_put_writes_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("regions.json");

        let cache = RegionCache::load(&path);
        assert!(cache.get("ready").is_none());
        cache.put("ready", mb(100, 200));

        let reloaded = RegionCache::load(&path);
        assert_eq!(reloaded.get("ready"), Some(mb(100, 200)));
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(&path, r#"{"ready": [1, 2, 3, 4], "#).unwrap();
        assert!(RegionCache::load(&path).get("ready").is_none());

        // zero-width box is rejected as a whole
        fs::write(&path, r#"{"ready": [1, 2, 0, 4]}"#).unwrap();
        assert!(RegionCache::load(&path).get("ready").is_none());
    }

    #[test]
    fn test_reset_deletes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.json");
        let cache = RegionCache::load(&path);
        cache.put("pulling", mb(5, 5));
        assert!(path.exists());

        cache.reset().unwrap();
        assert!(cache.get("pulling").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_keeps_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.json");
        let cache = RegionCache::load(&path);
        cache.put("standby", mb(1, 1));
        cache.clear();
        assert!(cache.get("standby").is_none());
        assert!(RegionCache::load(&path).contains("standby"));
    }
}
