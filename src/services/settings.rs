//! Persisted shell settings.
//!
//! One JSON record survives restarts: the last selected data-source path.
//! Loading is forgiving: a missing or corrupt record must never block
//! startup. Save failures are logged, not surfaced to the caller.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

const SETTINGS_FILE: &str = "settings.json";

/// On-disk shape of the settings record.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersistedSettings {
    data_source_path: Option<PathBuf>,
}

/// Store for the persisted settings record.
///
/// Single reader and single writer (the command handlers), so the in-memory
/// copy only needs a `Mutex` for interior mutability.
pub struct SettingsStore {
    file: PathBuf,
    current: Mutex<Option<PathBuf>>,
}

impl SettingsStore {
    /// Open the store rooted at the per-install config directory, loading
    /// the record once.
    pub fn open(config_dir: PathBuf) -> Self {
        let file = config_dir.join(SETTINGS_FILE);
        let current = load_record(&file);
        if let Some(path) = &current {
            log::info!("Last data source restored from settings: {}", path.display());
        }
        Self {
            file,
            current: Mutex::new(current),
        }
    }

    /// Last selected data-source path, if any.
    pub fn last_database(&self) -> Option<PathBuf> {
        self.current.lock().unwrap().clone()
    }

    /// Record a newly selected data source.
    ///
    /// The in-memory copy is updated first and is not rolled back if the
    /// write fails; a failed write only costs persistence across restarts.
    pub fn save(&self, data_source: &Path) {
        *self.current.lock().unwrap() = Some(data_source.to_path_buf());
        if let Err(e) = write_record(&self.file, data_source) {
            log::warn!("Could not persist settings to {}: {e}", self.file.display());
        }
    }
}

/// Read the record; any failure yields `None`.
fn load_record(file: &Path) -> Option<PathBuf> {
    let contents = match fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(e) => {
            log::debug!("No readable settings at {}: {e}", file.display());
            return None;
        }
    };
    match serde_json::from_str::<PersistedSettings>(&contents) {
        Ok(record) => record.data_source_path,
        Err(e) => {
            log::warn!("Ignoring corrupt settings file {}: {e}", file.display());
            None
        }
    }
}

/// Overwrite the record atomically: write a sibling temp file, then rename.
fn write_record(file: &Path, data_source: &Path) -> io::Result<()> {
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir)?;
    }
    let record = PersistedSettings {
        data_source_path: Some(data_source.to_path_buf()),
    };
    let body = serde_json::to_vec_pretty(&record)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = file.with_extension("json.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips_across_instances() {
        let dir = tempdir().expect("tempdir");
        let store = SettingsStore::open(dir.path().join("cfg"));
        store.save(Path::new("/data/reports.db"));

        // A later run opens a fresh store over the same directory.
        let reopened = SettingsStore::open(dir.path().join("cfg"));
        assert_eq!(
            reopened.last_database(),
            Some(PathBuf::from("/data/reports.db"))
        );
    }

    #[test]
    fn load_on_missing_record_is_none() {
        let dir = tempdir().expect("tempdir");
        let store = SettingsStore::open(dir.path().to_path_buf());
        assert_eq!(store.last_database(), None);
    }

    #[test]
    fn load_on_corrupt_record_is_none() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join(SETTINGS_FILE), b"{ not json").expect("seed corrupt file");
        let store = SettingsStore::open(dir.path().to_path_buf());
        assert_eq!(store.last_database(), None);
    }

    #[test]
    fn save_creates_the_missing_config_directory() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("corescout").join("config");
        let store = SettingsStore::open(nested.clone());
        store.save(Path::new("units.sqlite3"));
        assert!(nested.join(SETTINGS_FILE).is_file());
    }

    #[test]
    fn save_failure_keeps_the_in_memory_state() {
        // A file where the config directory should be makes the write fail.
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").expect("seed blocker");
        let store = SettingsStore::open(blocker.join("nested"));
        store.save(Path::new("/data/next.db"));
        assert_eq!(store.last_database(), Some(PathBuf::from("/data/next.db")));
    }
}
