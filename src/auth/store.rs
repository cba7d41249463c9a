//! Durable session credentials
//!
//! Two keys are persisted: the bearer token and the role tag. They are
//! written together on sign-in and deleted together on sign-out; a
//! half-present pair is an error condition that startup restoration detects
//! and purges.
//!
//! The platform credential store (via `keyring`) is preferred. When it is
//! unusable - headless Linux without a secret service, stripped-down
//! containers - a plain JSON file under the user config directory takes
//! over. The backend is probed and chosen once, at construction.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Storage strategy for a single key/value pair
pub trait CredentialBackend: Send + Sync {
    /// Human-readable backend name, for logs
    fn name(&self) -> &'static str;

    fn save(&self, key: &str, value: &str) -> Result<()>;

    fn load(&self, key: &str) -> Result<Option<String>>;

    fn delete(&self, key: &str) -> Result<()>;
}

/// Platform-native encrypted store
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    /// Whether the platform store is usable at all. A missing entry is a
    /// normal answer; a platform error means the store itself is absent.
    pub fn probe(service: &str) -> bool {
        match keyring::Entry::new(service, "__probe__") {
            Ok(entry) => matches!(
                entry.get_password(),
                Ok(_) | Err(keyring::Error::NoEntry)
            ),
            Err(_) => false,
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }
}

impl CredentialBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::StorageUnavailable(e.to_string())),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::StorageUnavailable(e.to_string())),
        }
    }
}

/// Unencrypted JSON-file store, used where no platform store exists
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `<config_dir>/stockroom/credentials.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stockroom").join("credentials.json"))
    }

    fn read_map(&self) -> Map<String, Value> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .and_then(|value| value.as_object().cloned())
            .unwrap_or_default()
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl CredentialBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .read_map()
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Terminal fallback when no home/config directory exists. Saves fail,
/// loads see nothing, deletes succeed - the process runs signed out rather
/// than crashing.
struct UnavailableBackend;

impl CredentialBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn save(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::StorageUnavailable(
            "no credential store and no config directory".to_string(),
        ))
    }

    fn load(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// Persists the session token and role tag behind whichever backend the
/// platform offers.
pub struct CredentialStore {
    backend: Box<dyn CredentialBackend>,
    token_key: String,
    role_key: String,
}

impl CredentialStore {
    /// Select a backend: keyring when the platform store answers the probe,
    /// otherwise the JSON-file fallback.
    pub fn new(config: &StorageConfig) -> Self {
        let backend: Box<dyn CredentialBackend> = if KeyringBackend::probe(&config.service) {
            Box::new(KeyringBackend::new(&config.service))
        } else if let Some(path) = FileBackend::default_path() {
            Box::new(FileBackend::new(path))
        } else {
            Box::new(UnavailableBackend)
        };

        tracing::debug!(backend = backend.name(), "selected credential backend");

        Self {
            backend,
            token_key: config.token_key.clone(),
            role_key: config.role_key.clone(),
        }
    }

    /// Build a store over an explicit backend
    pub fn with_backend(
        backend: Box<dyn CredentialBackend>,
        token_key: &str,
        role_key: &str,
    ) -> Self {
        Self {
            backend,
            token_key: token_key.to_string(),
            role_key: role_key.to_string(),
        }
    }

    /// Stored bearer token, if any. Storage failures degrade to "no session".
    pub fn token(&self) -> Option<String> {
        match self.backend.load(&self.token_key) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("failed to read stored token: {}", e);
                None
            }
        }
    }

    /// Stored role tag, if any
    pub fn role(&self) -> Option<String> {
        match self.backend.load(&self.role_key) {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!("failed to read stored role: {}", e);
                None
            }
        }
    }

    /// Write both keys. If the second write fails the first is rolled back
    /// so restoration never sees a half-written pair.
    pub fn store(&self, token: &str, role: &str) -> Result<()> {
        self.backend.save(&self.token_key, token)?;
        if let Err(e) = self.backend.save(&self.role_key, role) {
            let _ = self.backend.delete(&self.token_key);
            return Err(e);
        }
        Ok(())
    }

    /// Delete both keys. Never fails: sign-out must always succeed from the
    /// caller's point of view, even when nothing was stored.
    pub fn clear(&self) {
        for key in [&self.role_key, &self.token_key] {
            if let Err(e) = self.backend.delete(key) {
                tracing::warn!(key = key.as_str(), "failed to clear stored credential: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn file_store(dir: &tempfile::TempDir) -> CredentialStore {
        let backend = FileBackend::new(dir.path().join("credentials.json"));
        CredentialStore::with_backend(Box::new(backend), "APP_JWT", "APP_USER_TYPE")
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let store = file_store(&dir);

        store.store("tok.en.sig", "admin").unwrap();
        assert_eq!(store.token().as_deref(), Some("tok.en.sig"));
        assert_eq!(store.role().as_deref(), Some("admin"));

        store.clear();
        assert!(store.token().is_none());
        assert!(store.role().is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = file_store(&dir);

        store.clear();
        store.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_overwrite() {
        let dir = tempdir().unwrap();
        let store = file_store(&dir);

        store.store("first.t.s", "admin").unwrap();
        store.store("second.t.s", "customer").unwrap();
        assert_eq!(store.token().as_deref(), Some("second.t.s"));
        assert_eq!(store.role().as_deref(), Some("customer"));
    }

    #[test]
    fn test_file_backend_survives_garbage_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json at all").unwrap();

        let backend = FileBackend::new(path);
        assert!(backend.load("APP_JWT").unwrap().is_none());
        backend.save("APP_JWT", "a.b.c").unwrap();
        assert_eq!(backend.load("APP_JWT").unwrap().as_deref(), Some("a.b.c"));
    }

    #[test]
    fn test_unavailable_backend_degrades() {
        let store =
            CredentialStore::with_backend(Box::new(UnavailableBackend), "t", "r");
        assert!(store.store("a.b.c", "admin").is_err());
        assert!(store.token().is_none());
        store.clear(); // must not panic
    }
}
