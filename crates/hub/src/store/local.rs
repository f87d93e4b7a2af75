//! On-device key-value storage for the snapshot and the selected identity.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use libertad_hub_core::{Snapshot, UserRole};

/// Key holding the JSON-encoded snapshot.
///
/// The `v4` suffix marks the format in which messages carry a sender.
pub const SNAPSHOT_KEY: &str = "libertad-app-data-v4";

/// Key receiving a copy of a snapshot blob that could not be parsed, so the
/// next save does not destroy it.
pub const UNREADABLE_SNAPSHOT_KEY: &str = "libertad-app-data-v4-unreadable";

/// Key holding the currently selected identity.
pub const IDENTITY_KEY: &str = "libertad-app-auth-mode";

/// Errors from the raw key-value layer.
///
/// These never escape [`LocalStore`]; they are logged there.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Minimal string key-value storage.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read a value; `None` when the key was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    /// Replace the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;

    /// Delete `key`; deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Arc<K> {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        (**self).remove(key)
    }
}

/// Directory-backed storage: one file per key.
///
/// Writes go to a temporary sibling and are renamed into place, so a reader
/// never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// In-process storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing encoding.
    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Snapshot and identity persistence on top of a [`KeyValueStore`].
///
/// Every operation is synchronous and infallible from the caller's point of
/// view: errors are logged and reads fall back to `None`.
#[derive(Debug, Clone)]
pub struct LocalStore<K> {
    kv: K,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub const fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Underlying key-value storage.
    pub const fn inner(&self) -> &K {
        &self.kv
    }

    /// Load the stored snapshot.
    ///
    /// Messages written before senders existed are given the non-admin
    /// identity. Records that cannot be decoded are skipped and logged.
    /// Returns `None` when nothing is stored or the stored value is not a
    /// snapshot document at all.
    #[instrument(skip(self))]
    pub fn load(&self) -> Option<Snapshot> {
        let raw = match self.kv.get(SNAPSHOT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No local snapshot stored");
                return None;
            }
            Err(e) => {
                error!(error = %e, "Failed to read local snapshot");
                return None;
            }
        };

        let decoded = serde_json::from_str(&raw).and_then(Snapshot::from_stored_value);
        match decoded {
            Ok(decoded) => {
                if decoded.patched > 0 {
                    info!(
                        patched = decoded.patched,
                        "Assigned default sender to legacy messages"
                    );
                }
                if decoded.dropped > 0 {
                    warn!(
                        dropped = decoded.dropped,
                        "Skipped undecodable records in local snapshot"
                    );
                }
                debug!(counts = %decoded.snapshot.counts(), "Loaded local snapshot");
                Some(decoded.snapshot)
            }
            Err(e) => {
                error!(error = %e, "Local snapshot parse error");
                match self.kv.set(UNREADABLE_SNAPSHOT_KEY, &raw) {
                    Ok(()) => warn!(key = UNREADABLE_SNAPSHOT_KEY, "Kept unreadable snapshot"),
                    Err(e) => error!(error = %e, "Failed to keep unreadable snapshot"),
                }
                None
            }
        }
    }

    /// Overwrite the stored snapshot.
    #[instrument(skip(self, snapshot), fields(last_updated = snapshot.last_updated))]
    pub fn save(&self, snapshot: &Snapshot) {
        let result = serde_json::to_string(snapshot)
            .map_err(LocalStoreError::from)
            .and_then(|raw| self.kv.set(SNAPSHOT_KEY, &raw));
        if let Err(e) = result {
            error!(error = %e, "Failed to write local snapshot");
        }
    }

    /// Currently selected identity, if any.
    pub fn load_identity(&self) -> Option<UserRole> {
        match self.kv.get(IDENTITY_KEY) {
            Ok(Some(raw)) => match raw.trim().parse() {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!(error = %e, "Ignoring stored identity");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "Failed to read stored identity");
                None
            }
        }
    }

    /// Persist the selected identity.
    pub fn save_identity(&self, role: UserRole) {
        if let Err(e) = self.kv.set(IDENTITY_KEY, role.as_str()) {
            error!(error = %e, %role, "Failed to store identity");
        }
    }

    /// Forget the selected identity.
    pub fn clear_identity(&self) {
        if let Err(e) = self.kv.remove(IDENTITY_KEY) {
            error!(error = %e, "Failed to clear identity");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use libertad_hub_core::{Message, MessageId, WishlistCategory, WishlistItem};

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::empty(10);
        snapshot
            .wishlist
            .push(WishlistItem::new("Picnic", None, WishlistCategory::Plans, 1));
        snapshot
            .mailbox
            .push(Message::new(MessageId::new("m1"), "hola", 2, UserRole::Admin));
        snapshot
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let store = LocalStore::new(MemoryStore::new());
        assert!(store.load().is_none());
        assert!(store.load_identity().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = LocalStore::new(MemoryStore::new());
        let snapshot = sample();
        store.save(&snapshot);
        assert_eq!(store.load(), Some(snapshot));
    }

    #[test]
    fn test_malformed_blob_loads_nothing() {
        let store = LocalStore::new(MemoryStore::new().with_entry(SNAPSHOT_KEY, "{not json"));
        assert!(store.load().is_none());
        assert_eq!(
            store.inner().get(UNREADABLE_SNAPSHOT_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn test_fractional_pao_does_not_hide_other_records() {
        let blob = r#"{
            "wishlist": [{"id": "w1", "categoryId": "plans", "title": "Keep me", "createdAt": 1}],
            "makeup": [
                {"id": "p1", "brand": "B", "name": "Serum", "category": "skincare",
                 "paoMonths": 1.5, "dateOpened": 2},
                {"id": "p2", "brand": "B", "name": "Broken", "category": 7}
            ],
            "mailbox": [],
            "lastUpdated": 3
        }"#;
        let store = LocalStore::new(MemoryStore::new().with_entry(SNAPSHOT_KEY, blob));

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.wishlist[0].title, "Keep me");
        assert_eq!(snapshot.makeup.len(), 1);
        assert!((snapshot.makeup[0].pao_months - 1.5).abs() < f64::EPSILON);
        assert!(store.inner().get(UNREADABLE_SNAPSHOT_KEY).unwrap().is_none());
    }

    #[test]
    fn test_legacy_blob_is_migrated() {
        let legacy = r#"{
            "wishlist": [],
            "mailbox": [{"id": "m1", "text": "old", "date": 1, "read": false}],
            "lastUpdated": 1
        }"#;
        let store = LocalStore::new(MemoryStore::new().with_entry(SNAPSHOT_KEY, legacy));

        let snapshot = store.load().unwrap();
        assert!(snapshot.makeup.is_empty());
        assert_eq!(snapshot.mailbox.len(), 1);
        assert_eq!(snapshot.mailbox[0].sender(), UserRole::Libertad);
    }

    #[test]
    fn test_identity_round_trip() {
        let store = LocalStore::new(MemoryStore::new());
        store.save_identity(UserRole::Admin);
        assert_eq!(store.load_identity(), Some(UserRole::Admin));
        assert_eq!(
            store.inner().get(IDENTITY_KEY).unwrap().as_deref(),
            Some("admin")
        );

        store.clear_identity();
        assert_eq!(store.load_identity(), None);
    }

    #[test]
    fn test_unknown_identity_is_ignored() {
        let store = LocalStore::new(MemoryStore::new().with_entry(IDENTITY_KEY, "guest"));
        assert_eq!(store.load_identity(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(FileStore::open(dir.path().join("nested")).unwrap());

        let snapshot = sample();
        store.save(&snapshot);
        store.save_identity(UserRole::Libertad);

        let reopened = LocalStore::new(FileStore::open(dir.path().join("nested")).unwrap());
        assert_eq!(reopened.load(), Some(snapshot));
        assert_eq!(reopened.load_identity(), Some(UserRole::Libertad));
        assert!(dir.path().join("nested").join(SNAPSHOT_KEY).exists());
    }

    #[test]
    fn test_file_store_remove_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.remove(IDENTITY_KEY).is_ok());
        assert_eq!(store.get(IDENTITY_KEY).unwrap(), None);
    }
}
