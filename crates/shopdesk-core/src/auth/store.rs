use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed key the session token is stored under
pub const TOKEN_KEY: &str = "auth_token";

/// Keychain service name
const SERVICE_NAME: &str = "shopdesk";

/// Persistence of the single session token.
///
/// `get` never fails: when the underlying storage cannot be read the token is
/// treated as absent, so callers fall back to requiring a login.
pub trait TokenStore: Send + Sync {
    /// Persist `token`, replacing any previous value. No validation.
    fn set(&self, token: &str) -> Result<()>;

    fn get(&self) -> Option<String>;

    /// Remove the token. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Which storage backend holds the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
}

impl StoreBackend {
    pub fn open(self, cache_dir: PathBuf) -> Arc<dyn TokenStore> {
        match self {
            StoreBackend::File => Arc::new(FileTokenStore::new(cache_dir)),
            StoreBackend::Keyring => Arc::new(KeyringTokenStore::new()),
        }
    }
}

// ============================================================================
// File
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Token kept as a small JSON file in the cache directory
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn token_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", TOKEN_KEY))
    }
}

impl TokenStore for FileTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let stored = StoredToken {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&path, contents).context("Failed to write token file")?;
        debug!(path = %path.display(), "Token saved");
        Ok(())
    }

    fn get(&self) -> Option<String> {
        let path = self.token_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read token file");
                return None;
            }
        };

        match serde_json::from_str::<StoredToken>(&contents) {
            Ok(stored) => Some(stored.token),
            Err(e) => {
                warn!(error = %e, "Failed to parse token file");
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(self.token_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove token file"),
        }
    }
}

// ============================================================================
// OS keychain
// ============================================================================

pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> keyring::Result<Entry> {
        Entry::new(&self.service, TOKEN_KEY)
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        let entry = self.entry().context("Failed to create keyring entry")?;
        entry
            .set_password(token)
            .context("Failed to store token in keychain")?;

        // Without a platform credential store keyring falls back to a mock
        // that forgets everything once the entry is dropped
        let stored = self
            .entry()
            .and_then(|entry| entry.get_password())
            .ok();
        if stored.as_deref() != Some(token) {
            bail!("Keychain did not keep the token; set token_store to \"file\"");
        }
        debug!(service = %self.service, "Token saved to keychain");
        Ok(())
    }

    fn get(&self) -> Option<String> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Failed to create keyring entry");
                return None;
            }
        };
        match entry.get_password() {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read token from keychain");
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        let entry = self.entry().context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    value: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            value: Mutex::new(Some(token.to_string())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn set(&self, token: &str) -> Result<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn get(&self) -> Option<String> {
        self.slot().clone()
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shopdesk-store-{}-{}-{}",
            name,
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(), None);

        store.set("abc").unwrap();
        assert_eq!(store.get().as_deref(), Some("abc"));

        store.set("def").unwrap();
        assert_eq!(store.get().as_deref(), Some("def"));
    }

    #[test]
    fn test_memory_store_clear_is_idempotent() {
        let store = MemoryTokenStore::with_token("abc");
        store.clear().unwrap();
        assert_eq!(store.get(), None);
        store.clear().unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = scratch_dir("round-trip");
        let store = FileTokenStore::new(dir.clone());
        assert_eq!(store.get(), None);

        store.set("header.payload.sig").unwrap();
        assert_eq!(store.get().as_deref(), Some("header.payload.sig"));

        // A second store over the same directory sees the persisted value
        let reopened = FileTokenStore::new(dir.clone());
        assert_eq!(reopened.get().as_deref(), Some("header.payload.sig"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_clear() {
        let dir = scratch_dir("clear");
        let store = FileTokenStore::new(dir.clone());

        store.clear().unwrap(); // nothing stored yet
        store.set("abc").unwrap();
        store.clear().unwrap();
        assert_eq!(store.get(), None);
        store.clear().unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_unreadable_is_absent() {
        let dir = scratch_dir("unreadable");
        // A directory where the token file should be makes reads fail
        std::fs::create_dir_all(dir.join("auth_token.json")).unwrap();
        let store = FileTokenStore::new(dir.clone());
        assert_eq!(store.get(), None);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_corrupt_is_absent() {
        let dir = scratch_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("auth_token.json"), "{not json").unwrap();
        let store = FileTokenStore::new(dir.clone());
        assert_eq!(store.get(), None);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    #[ignore = "needs an OS keychain"]
    fn test_keyring_store_round_trip() {
        let store = KeyringTokenStore::with_service("shopdesk-test-round-trip");
        store.clear().unwrap();
        assert_eq!(store.get(), None);

        store.set("header.payload.sig").unwrap();
        assert_eq!(store.get().as_deref(), Some("header.payload.sig"));

        // A second store with the same service reads the same entry
        let reopened = KeyringTokenStore::with_service("shopdesk-test-round-trip");
        assert_eq!(reopened.get().as_deref(), Some("header.payload.sig"));

        store.clear().unwrap();
        assert_eq!(reopened.get(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_store_backend_from_config_value() {
        let backend: StoreBackend = serde_json::from_str(r#""keyring""#).unwrap();
        assert_eq!(backend, StoreBackend::Keyring);
        assert_eq!(StoreBackend::default(), StoreBackend::File);
    }
}
