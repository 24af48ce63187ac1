use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Settings, SettingsFile};

const STORAGE_FILE: &str = "storage.json";
const STORAGE_BAD_FILE: &str = "storage.json.bad";
const SETTINGS_FILE: &str = "settings.json";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// String-keyed blob store the task list is persisted into.
///
/// Values are opaque to the store; each `set` overwrites the whole value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .expect("kv poisoned")
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("kv poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("kv poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Data directory holding `storage.json` (the key-value entries) and
/// `settings.json`.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let file: SettingsFile = self.load_json(self.root.join(SETTINGS_FILE))?;
        Ok(file.settings.normalized())
    }

    /// Missing or unreadable settings fall back to defaults.
    pub fn load_settings_or_default(&self) -> Settings {
        match self.load_settings() {
            Ok(settings) => settings,
            Err(err) => {
                log::info!("storage: using default settings ({err})");
                Settings::default()
            }
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let file = SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: settings.clone(),
        };
        self.ensure_dirs()?;
        self.write_json(self.root.join(SETTINGS_FILE), &file)
    }

    fn load_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.load_json(self.root.join(STORAGE_FILE)) {
            Ok(entries) => Ok(entries),
            Err(StorageError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err),
        }
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn write_json<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(data)?;
        write_atomic(&path, &json)
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = match self.load_entries() {
            Ok(entries) => entries,
            Err(StorageError::Json(err)) => {
                // Keep the unreadable file for inspection and start a fresh one.
                let bad = self.root.join(STORAGE_BAD_FILE);
                log::warn!(
                    "storage: {STORAGE_FILE} is corrupt, moving it to {}: {err}",
                    bad.display()
                );
                fs::rename(self.root.join(STORAGE_FILE), bad)?;
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        entries.insert(key.to_string(), value.to_string());
        self.ensure_dirs()?;
        self.write_json(self.root.join(STORAGE_FILE), &entries)
    }
}

/// Writes through a sibling `<name>.tmp` file and renames it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let temp_path = temp_path_for(path)?;
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

fn temp_path_for(path: &Path) -> Result<PathBuf, StorageError> {
    let mut name = path
        .file_name()
        .ok_or_else(|| StorageError::Io(std::io::Error::other("path has no file name")))?
        .to_os_string();
    name.push(".tmp");
    Ok(path.with_file_name(name))
}
