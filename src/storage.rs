use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::filename::FilenameTemplate;
use crate::models::{CommonTask, UserPreference, WorkRecord};

/// Key for the remembered author/department/time range.
pub const USER_INFO_KEY: &str = "dailyWork_userInfo";
/// Key for the filename template preference.
pub const FILENAME_FORMAT_KEY: &str = "preferredFileNameFormat";
/// Key for the common task list.
pub const COMMON_TASKS_KEY: &str = "dailyWork_commonTasks";
/// Key for the record currently being edited.
pub const DRAFT_KEY: &str = "dailyWork_draft";

/// Minimal string key-value persistence.
///
/// Values are opaque strings (JSON in practice). Implementations never
/// validate them; interpretation happens in the typed helpers below.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    /// Returns `None` if the file does not exist or cannot be read.
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        let mut f = OpenOptions::new().read(true).open(&path).ok()?;
        let mut s = String::new();
        if f.read_to_string(&mut s).is_err() {
            warn!("Could not read {}", path.display());
            return None;
        }
        Some(s)
    }

    /// Overwrites the existing file.
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let path = self.path_for(key);
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        f.write_all(value.as_bytes())?;
        debug!("Stored {}", path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store, for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Reads and decodes a JSON value. Absent or malformed data is `None`.
fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring malformed value for '{}': {}", key, e);
            None
        }
    }
}

fn save_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    store.set(key, &s)
}

/// Loads the remembered identity defaults, if any.
pub fn load_user_preference(store: &dyn KeyValueStore) -> Option<UserPreference> {
    load_json(store, USER_INFO_KEY)
}

pub fn save_user_preference(store: &mut dyn KeyValueStore, pref: &UserPreference) -> Result<()> {
    save_json(store, USER_INFO_KEY, pref)
}

/// Loads the filename template, or the built-in default when none is stored.
pub fn load_filename_template(store: &dyn KeyValueStore) -> FilenameTemplate {
    load_json(store, FILENAME_FORMAT_KEY).unwrap_or_default()
}

pub fn save_filename_template(
    store: &mut dyn KeyValueStore,
    template: &FilenameTemplate,
) -> Result<()> {
    save_json(store, FILENAME_FORMAT_KEY, template)
}

/// Loads the common task list; empty when none is stored.
pub fn load_common_tasks(store: &dyn KeyValueStore) -> Vec<CommonTask> {
    load_json(store, COMMON_TASKS_KEY).unwrap_or_default()
}

pub fn save_common_tasks(store: &mut dyn KeyValueStore, tasks: &[CommonTask]) -> Result<()> {
    save_json(store, COMMON_TASKS_KEY, &tasks)
}

/// Loads the record being edited, if any.
pub fn load_draft(store: &dyn KeyValueStore) -> Option<WorkRecord> {
    load_json(store, DRAFT_KEY)
}

pub fn save_draft(store: &mut dyn KeyValueStore, record: &WorkRecord) -> Result<()> {
    save_json(store, DRAFT_KEY, record)
}

pub fn clear_draft(store: &mut dyn KeyValueStore) -> Result<()> {
    store.remove(DRAFT_KEY)
}
