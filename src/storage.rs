use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Result;

pub const PROJECTS_KEY: &str = "timesheet-projects";
pub const ENTRIES_KEY: &str = "timesheet-entries";
pub const CURRENT_ENTRY_KEY: &str = "timesheet-current-entry";

/// Synchronous string slots addressed by fixed key names.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per slot inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.slots.remove(key);
        Ok(())
    }
}

/// Reads and decodes a slot. An absent key is `None`; an empty slot counts as absent.
pub fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_str(&raw)?))
}

pub fn write_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string_pretty(value)?;
    debug!(key, bytes = raw.len(), "writing slot");
    store.set(key, raw)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::domain::{Project, default_projects};
    use crate::error::TimesheetError;

    use super::{FileStore, KeyValueStore, MemoryStore, PROJECTS_KEY, read_json, write_json};

    #[test]
    fn file_store_round_trips_and_removes_slots() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get(PROJECTS_KEY).expect("read"), None);

        let projects = default_projects(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        write_json(&mut store, PROJECTS_KEY, &projects).expect("write should succeed");
        assert!(dir.path().join("nested").join("timesheet-projects.json").exists());

        let loaded: Vec<Project> = read_json(&store, PROJECTS_KEY)
            .expect("read should succeed")
            .expect("slot present");
        assert_eq!(loaded, projects);

        store.remove(PROJECTS_KEY).expect("remove should succeed");
        store.remove(PROJECTS_KEY).expect("second remove is a no-op");
        assert_eq!(store.get(PROJECTS_KEY).expect("read"), None);
    }

    #[test]
    fn malformed_slots_surface_as_json_errors() {
        let mut store = MemoryStore::default();
        store.set(PROJECTS_KEY, "{not json".to_string()).expect("set");
        let result: Result<Option<Vec<Project>>, _> = read_json(&store, PROJECTS_KEY);
        assert!(matches!(result, Err(TimesheetError::Json(_))));

        store.set(PROJECTS_KEY, "  ".to_string()).expect("set");
        let blank: Option<Vec<Project>> = read_json(&store, PROJECTS_KEY).expect("blank slot");
        assert!(blank.is_none());
    }
}
