//! Session and cycle journals under `<data_dir>/logs`

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Session entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntry {
    pub start: String,
    pub stop: Option<String>,
}

/// One fish-and-trade cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleEntry {
    pub timestamp: String,
    pub location: String,
    pub fish_type: String,
    pub casts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bag_capacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salvaged: Option<bool>,
    pub traded: bool,
}

impl CycleEntry {
    pub fn now(location: &str, fish_type: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            location: location.to_string(),
            fish_type: fish_type.to_string(),
            casts: 0,
            bag_capacity: None,
            salvaged: None,
            traded: false,
        }
    }
}

/// Append-only JSON journals
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sessions_path(&self) -> PathBuf {
        self.dir.join("sessions.json")
    }

    fn cycles_path(&self) -> PathBuf {
        self.dir.join("cycles.json")
    }

    /// Load sessions from file
    pub fn load_sessions(&self) -> Vec<SessionEntry> {
        load(&self.sessions_path())
    }

    pub fn load_cycles(&self) -> Vec<CycleEntry> {
        load(&self.cycles_path())
    }

    pub fn start_session(&self) -> Result<()> {
        let mut sessions = self.load_sessions();
        sessions.push(SessionEntry { start: Utc::now().to_rfc3339(), stop: None });
        save(&self.sessions_path(), &sessions)
    }

    /// Stamp the stop time of the open session, if any
    pub fn stop_session(&self) -> Result<()> {
        let mut sessions = self.load_sessions();
        match sessions.last_mut() {
            Some(last) if last.stop.is_none() => last.stop = Some(Utc::now().to_rfc3339()),
            _ => return Ok(()),
        }
        save(&self.sessions_path(), &sessions)
    }

    pub fn log_cycle(&self, entry: CycleEntry) -> Result<()> {
        let mut cycles = self.load_cycles();
        cycles.push(entry);
        save(&self.cycles_path(), &cycles)
    }
}

/// Missing journals start empty. An unreadable one is moved to `<name>.corrupt` so the
/// next save does not overwrite it.
fn load<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            let aside = corrupt_path(path);
            tracing::warn!("[JOURNAL] Failed to parse {:?}: {}, moving it to {:?}", path, e, aside);
            if let Err(e) = fs::rename(path, &aside) {
                tracing::warn!("[JOURNAL] Failed to move corrupt journal aside: {}", e);
            }
            Vec::new()
        }
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

fn save<T: Serialize>(path: &Path, data: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_sessions_empty() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("logs"));
        assert!(journal.load_sessions().is_empty());
    }

    #[test]
    fn test_session_start_and_stop() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("logs"));
        journal.start_session().unwrap();
        journal.stop_session().unwrap();
        journal.start_session().unwrap();

        let sessions = journal.load_sessions();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].stop.is_some());
        assert!(sessions[1].stop.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&sessions[0].start).is_ok());
    }

    #[test]
    fn test_cycles_append() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path());
        let mut entry = CycleEntry::now("tundra", "yellow");
        entry.casts = 12;
        entry.traded = true;
        journal.log_cycle(entry.clone()).unwrap();
        journal.log_cycle(CycleEntry::now("tundra", "yellow")).unwrap();

        let cycles = journal.load_cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], entry);
        let raw = fs::read_to_string(dir.path().join("cycles.json")).unwrap();
        assert!(!raw.contains("bag_capacity"));
    }

    #[test]
    fn test_corrupt_journal_starts_over() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("sessions.json"), "{not json").unwrap();
        let journal = Journal::new(dir.path());
        journal.start_session().unwrap();
        assert_eq!(journal.load_sessions().len(), 1);

        // the unreadable journal is kept for inspection
        let aside = dir.path().join("sessions.json.corrupt");
        assert_eq!(fs::read_to_string(aside).unwrap(), "{not json");
    }
}
