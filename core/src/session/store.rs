//! Persistence for the durable session.
//!
//! The auth token and the service URL are only ever written and cleared
//! together, so the store deals in whole [`StoredSession`] values.

use crate::config::{self, ConfigError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// The two persisted values: the durable token and the base URL it is valid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub auth_token: String,
    pub service_url: String,
}

impl StoredSession {
    pub fn new(auth_token: impl Into<String>, service_url: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            service_url: service_url.into(),
        }
    }
}

/// Get/set/clear access to the persisted session.
pub trait SessionStore: Send + Sync {
    /// Read the stored session, `None` when nothing is stored.
    fn load(&self) -> Result<Option<StoredSession>, StoreError>;

    /// Persist token and service URL together, replacing any previous session.
    fn save(&self, session: &StoredSession) -> Result<(), StoreError>;

    /// Remove both values. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Session stored as `session.json` in the client storage root.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$REMOTE_HOME/session.json` (default `~/.remote/session.json`).
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::new(config::get_home()?.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let session: StoredSession = serde_json::from_str(&content)?;
        Ok(Some(session))
    }

    /// Atomic: write tmp + rename.
    fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, used by tests and embedders that keep their own persistence.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::ENV_LOCK;
    use tempfile::TempDir;

    fn sample() -> StoredSession {
        StoredSession::new("tok.en.sig", "https://192.168.1.20:8443")
    }

    #[test]
    fn test_file_store_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!dir.path().join("nested").join("session.json.tmp").exists());
    }

    #[test]
    fn test_file_store_writes_both_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["authToken"], "tok.en.sig");
        assert_eq!(raw["serviceUrl"], "https://192.168.1.20:8443");
    }

    #[test]
    fn test_file_store_clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&sample()).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), None);

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_half_written_session_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        fs::write(store.path(), r#"{"authToken": "only-token"}"#).unwrap();
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_open_default_uses_remote_home() {
        let _lock = ENV_LOCK.lock().unwrap();
        let home = TempDir::new().unwrap();
        std::env::set_var("REMOTE_HOME", home.path());

        let store = FileSessionStore::open_default().unwrap();
        assert_eq!(store.path(), home.path().join("session.json"));

        std::env::remove_var("REMOTE_HOME");
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
