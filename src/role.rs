use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const VISITOR_ROLE: &str = "visitor";
pub const DEFAULT_ROLE_STORAGE_KEY: &str = "currentRole";

/// Identifier of the identity mode a user picked. `visitor` is the anonymous sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleKey(String);

impl RoleKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn visitor() -> Self {
        Self(VISITOR_ROLE.to_owned())
    }

    pub fn is_visitor(&self) -> bool {
        self.0 == VISITOR_ROLE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoleKey {
    fn default() -> Self {
        Self::visitor()
    }
}

impl Display for RoleKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RoleKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access storage file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file `{path}` is not a JSON object of strings: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value persistence with the semantics of browser local storage.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage. Clones share the same entries, which lets a test
/// drop a widget and "reload" another one against the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(key: &str, value: &str) -> Self {
        let storage = Self::default();
        if let Ok(mut entries) = storage.entries.lock() {
            entries.insert(key.to_owned(), value.to_owned());
        }
        storage
    }

    /// Storage that fails every operation, like a browser with storage disabled.
    pub fn unavailable() -> Self {
        Self {
            entries: Arc::default(),
            unavailable: true,
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable("storage is disabled".to_owned()));
        }
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_owned()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Storage persisted as a flat JSON object in a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let raw = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, raw).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_entries(&entries)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// The persisted current role. Storage is read once on load; afterwards the
/// cached value is authoritative and storage is only written to.
#[derive(Debug)]
pub struct RoleState<S> {
    storage: S,
    storage_key: String,
    current: RoleKey,
}

impl<S: KeyValueStorage> RoleState<S> {
    pub fn load(storage: S, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let current = match storage.get_item(&storage_key) {
            Ok(Some(value)) => RoleKey::from(value),
            Ok(None) => RoleKey::visitor(),
            Err(error) => {
                warn!(
                    storage_key = %storage_key,
                    error = %error,
                    "role storage unreadable; starting as visitor"
                );
                RoleKey::visitor()
            }
        };
        debug!(storage_key = %storage_key, role = %current, "loaded persisted role");

        Self {
            storage,
            storage_key,
            current,
        }
    }

    pub fn current(&self) -> &RoleKey {
        &self.current
    }

    /// Switches to `role` and persists it. Returns the previous role.
    /// A failed write is logged; the in-memory switch still happens.
    pub fn set_role(&mut self, role: RoleKey) -> RoleKey {
        if let Err(error) = self.storage.set_item(&self.storage_key, role.as_str()) {
            warn!(
                storage_key = %self.storage_key,
                role = %role,
                error = %error,
                "failed to persist role"
            );
        }
        let previous = std::mem::replace(&mut self.current, role);
        info!(from = %previous, to = %self.current, "role switched");
        previous
    }

    pub fn reset(&mut self) -> RoleKey {
        self.set_role(RoleKey::visitor())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{remove_dir_if_exists, temp_path};

    use super::*;

    #[test]
    fn absent_value_defaults_to_visitor() {
        let state = RoleState::load(MemoryStorage::new(), DEFAULT_ROLE_STORAGE_KEY);
        assert!(state.current().is_visitor());
    }

    #[test]
    fn unavailable_storage_defaults_to_visitor_and_still_switches() {
        let mut state = RoleState::load(MemoryStorage::unavailable(), DEFAULT_ROLE_STORAGE_KEY);
        assert!(state.current().is_visitor());

        let previous = state.set_role(RoleKey::from("citizen"));
        assert!(previous.is_visitor());
        assert_eq!(state.current().as_str(), "citizen");
    }

    #[test]
    fn set_role_round_trips_across_reload() {
        let storage = MemoryStorage::new();
        let mut state = RoleState::load(storage.clone(), DEFAULT_ROLE_STORAGE_KEY);
        state.set_role(RoleKey::from("resident"));
        assert_eq!(state.current().as_str(), "resident");

        let reloaded = RoleState::load(storage, DEFAULT_ROLE_STORAGE_KEY);
        assert_eq!(reloaded.current().as_str(), "resident");
    }

    #[test]
    fn any_role_value_is_accepted() {
        let storage = MemoryStorage::new();
        let mut state = RoleState::load(storage.clone(), DEFAULT_ROLE_STORAGE_KEY);
        state.set_role(RoleKey::from("retired-role"));
        state.set_role(RoleKey::from(""));

        let reloaded = RoleState::load(storage, DEFAULT_ROLE_STORAGE_KEY);
        assert_eq!(reloaded.current().as_str(), "");
        assert!(!reloaded.current().is_visitor());
    }

    #[test]
    fn reset_returns_to_visitor_and_persists() {
        let storage = MemoryStorage::with_item(DEFAULT_ROLE_STORAGE_KEY, "citizen");
        let mut state = RoleState::load(storage.clone(), DEFAULT_ROLE_STORAGE_KEY);
        assert_eq!(state.current().as_str(), "citizen");

        state.reset();
        assert!(state.current().is_visitor());
        assert_eq!(
            storage
                .get_item(DEFAULT_ROLE_STORAGE_KEY)
                .expect("memory storage should be readable")
                .as_deref(),
            Some(VISITOR_ROLE)
        );
    }

    #[test]
    fn file_storage_persists_and_preserves_other_keys() {
        let dir = temp_path("file-storage");
        let path = dir.join("nested").join("local_storage.json");
        let mut storage = FileStorage::new(&path);

        assert_eq!(
            storage
                .get_item("currentRole")
                .expect("missing file reads"),
            None
        );
        storage.set_item("theme", "dark").expect("write theme");
        storage
            .set_item("currentRole", "citizen")
            .expect("write role");

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened
                .get_item("currentRole")
                .expect("read role")
                .as_deref(),
            Some("citizen")
        );
        assert_eq!(
            reopened.get_item("theme").expect("read theme").as_deref(),
            Some("dark")
        );

        storage.remove_item("currentRole").expect("remove role");
        assert_eq!(reopened.get_item("currentRole").expect("read role"), None);

        remove_dir_if_exists(&dir);
    }

    #[test]
    fn malformed_storage_file_reads_as_visitor() {
        let dir = temp_path("malformed-storage");
        fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("local_storage.json");
        fs::write(&path, "[1, 2, 3]").expect("fixture should be writable");

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get_item("currentRole"),
            Err(StorageError::Malformed { .. })
        ));
        let state = RoleState::load(storage, DEFAULT_ROLE_STORAGE_KEY);
        assert!(state.current().is_visitor());

        remove_dir_if_exists(&dir);
    }
}
