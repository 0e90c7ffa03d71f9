//! Path utilities for finding data directories

use std::env;
use std::path::{Path, PathBuf};

/// Returns the folder where data files should be stored.
/// Uses the executable directory when a `config/` folder sits next to it,
/// otherwise the current working directory.
pub fn get_data_dir() -> PathBuf {
    if let Ok(exe_path) = env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            if parent.join("config").exists() {
                return parent.to_path_buf();
            }
        }
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config").join("settings.json")
}

pub fn regions_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config").join("regions.json")
}

pub fn images_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("images")
}

pub fn journal_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("debug").join("log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.exists() || dir == PathBuf::from("."));
    }

    #[test]
    fn test_layout_under_data_dir() {
        let root = Path::new("/data");
        assert_eq!(regions_path(root), Path::new("/data/config/regions.json"));
        assert_eq!(log_dir(root), Path::new("/data/debug/log"));
    }
}
