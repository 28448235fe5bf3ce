//! Durable key-value storage for UI preferences.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::PreferenceError;

/// Durable string store, the server-side stand-in for browser local storage.
pub trait PreferenceStore: Send + Sync + std::fmt::Debug {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    /// Write a value, making it durable before returning.
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// One browser's view of a shared store.
///
/// Keys are stored as `{client_id}/{key}`, so clients never see each
/// other's values.
#[derive(Debug, Clone)]
pub struct ClientPreferences {
    inner: Arc<dyn PreferenceStore>,
    client_id: String,
}

impl ClientPreferences {
    /// Scope `inner` to `client_id`.
    #[must_use]
    pub fn new(inner: Arc<dyn PreferenceStore>, client_id: impl Into<String>) -> Self {
        Self {
            inner,
            client_id: client_id.into(),
        }
    }

    /// The client this view belongs to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}/{key}", self.client_id)
    }
}

impl PreferenceStore for ClientPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        self.inner.get(&self.scoped(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.inner.set(&self.scoped(key), value)
    }
}

/// Preferences kept in a JSON object on disk.
///
/// The file is read once on open and rewritten on every `set`.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FilePreferenceStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(
            name: "preferences.opened",
            path = %path.display(),
            entries = values.len(),
            "Preference store opened"
        );

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let guard = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut guard = self.values.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&*guard)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Non-durable store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let guard = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut guard = self.values.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(store.get("darkMode").unwrap(), None);
        store.set("darkMode", "true").unwrap();

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("darkMode").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();

        let err = FilePreferenceStore::open(&path).unwrap_err();
        assert!(matches!(err, PreferenceError::Json(_)));
    }

    #[test]
    fn client_views_do_not_share_values() {
        let shared: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferenceStore::new());
        let alice = ClientPreferences::new(Arc::clone(&shared), "alice");
        let bob = ClientPreferences::new(Arc::clone(&shared), "bob");

        alice.set("darkMode", "true").unwrap();
        assert_eq!(alice.get("darkMode").unwrap().as_deref(), Some("true"));
        assert_eq!(bob.get("darkMode").unwrap(), None);
        assert_eq!(shared.get("alice/darkMode").unwrap().as_deref(), Some("true"));
        assert_eq!(shared.get("darkMode").unwrap(), None);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryPreferenceStore::with_entry("darkMode", "false");
        assert_eq!(store.get("darkMode").unwrap().as_deref(), Some("false"));
        store.set("darkMode", "true").unwrap();
        assert_eq!(store.get("darkMode").unwrap().as_deref(), Some("true"));
    }
}
