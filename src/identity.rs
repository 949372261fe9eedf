//! Anonymous session identity
//!
//! A [`SessionIdentity`] hands out one durable token per user profile. The
//! token scopes chat history on the server; it is a convenience handle, not
//! a credential.
//!
//! Storage is injected through the [`KeyValueStore`] trait:
//!
//! - [`SledStore`] -- embedded `sled` database (the default durable backend)
//! - [`KeyringStore`] -- the operating system credential store
//! - [`MemoryStore`] -- process memory, for tests and throwaway sessions
//!
//! Storage failures never surface to callers. They are logged and the
//! identity degrades to an in-memory token that stays stable for the
//! lifetime of the [`SessionIdentity`] value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use ulid::Ulid;

use crate::config::{IdentityBackend, IdentityConfig};
use crate::error::{ConfidantError, Result};

/// Prefix of every generated token
pub const TOKEN_PREFIX: &str = "guest_";

/// Minimal key-value persistence used by [`SessionIdentity`]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SledStore
// ---------------------------------------------------------------------------

/// Durable store backed by an embedded `sled` database
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Opens or creates the database at `path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfidantError::IdentityStorageUnavailable`] if the
    /// database cannot be opened (for example when another process holds
    /// its lock)
    ///
    /// # Examples
    ///
    /// ```
    /// use confidant::identity::{KeyValueStore, SledStore};
    ///
    /// # fn main() -> confidant::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::open(dir.path().join("identity"))?;
    /// store.set("session_id", "guest_01")?;
    /// assert_eq!(store.get("session_id")?.as_deref(), Some("guest_01"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            ConfidantError::IdentityStorageUnavailable(format!(
                "Failed to open {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self { db })
    }

    /// Default database location: `<user data dir>/identity`
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "confidant", "confidant").ok_or_else(|| {
            ConfidantError::IdentityStorageUnavailable(
                "Could not determine data directory".to_string(),
            )
        })?;
        Ok(dirs.data_dir().join("identity"))
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .get(key.as_bytes())
            .map_err(|e| ConfidantError::IdentityStorageUnavailable(format!("Get failed: {}", e)))?;
        match value {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    ConfidantError::IdentityStorageUnavailable(format!("Corrupt value: {}", e))
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| {
                ConfidantError::IdentityStorageUnavailable(format!("Insert failed: {}", e))
            })?;
        self.db.flush().map_err(|e| {
            ConfidantError::IdentityStorageUnavailable(format!("Flush failed: {}", e))
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db.remove(key.as_bytes()).map_err(|e| {
            ConfidantError::IdentityStorageUnavailable(format!("Remove failed: {}", e))
        })?;
        self.db.flush().map_err(|e| {
            ConfidantError::IdentityStorageUnavailable(format!("Flush failed: {}", e))
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KeyringStore
// ---------------------------------------------------------------------------

/// Store backed by the OS native credential store
///
/// Each key becomes one keyring entry under the `confidant` service.
#[derive(Debug, Clone, Default)]
pub struct KeyringStore;

impl KeyringStore {
    const SERVICE: &'static str = "confidant";

    fn entry(key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(Self::SERVICE, key).map_err(|e| ConfidantError::Keyring(e).into())
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match Self::entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ConfidantError::Keyring(e).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(value)
            .map_err(ConfidantError::Keyring)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ConfidantError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Opens the store selected by `config`
///
/// # Errors
///
/// Returns [`ConfidantError::IdentityStorageUnavailable`] when the sled
/// database cannot be opened
pub fn open_store(config: &IdentityConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        IdentityBackend::Sled => {
            let path = match &config.path {
                Some(path) => PathBuf::from(path),
                None => SledStore::default_path()?,
            };
            tracing::debug!("Opening identity store at {}", path.display());
            Ok(Arc::new(SledStore::open(path)?))
        }
        IdentityBackend::Keyring => Ok(Arc::new(KeyringStore)),
        IdentityBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

// ---------------------------------------------------------------------------
// SessionIdentity
// ---------------------------------------------------------------------------

/// Generates a fresh token: `guest_` plus a lowercase ULID
///
/// The ULID's 48-bit millisecond timestamp and 80 random bits keep
/// concurrent first-time visitors apart.
///
/// # Examples
///
/// ```
/// use confidant::identity::new_token;
///
/// let token = new_token();
/// assert!(token.starts_with("guest_"));
/// assert_eq!(token.len(), "guest_".len() + 26);
/// ```
pub fn new_token() -> String {
    format!("{}{}", TOKEN_PREFIX, Ulid::new().to_string().to_lowercase())
}

/// Durable anonymous identity for the current profile
#[derive(Debug)]
pub struct SessionIdentity {
    store: Arc<dyn KeyValueStore>,
    key: String,
    fallback: Mutex<Option<String>>,
}

impl SessionIdentity {
    /// Creates an identity that stores its token under `key`
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            fallback: Mutex::new(None),
        }
    }

    /// Builds an identity from configuration
    ///
    /// If the configured store cannot be opened the identity runs on a
    /// [`MemoryStore`] instead.
    pub fn from_config(config: &IdentityConfig) -> Self {
        let store = open_store(config).unwrap_or_else(|e| {
            tracing::warn!("Identity storage unavailable, using in-memory token: {}", e);
            Arc::new(MemoryStore::new())
        });
        Self::new(store, config.key.clone())
    }

    /// Returns the stored token, creating and storing one if absent
    ///
    /// Never fails. When the store cannot be read or written the token is
    /// kept in memory and reused by later calls on this value.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use confidant::identity::{MemoryStore, SessionIdentity};
    ///
    /// let identity = SessionIdentity::new(Arc::new(MemoryStore::new()), "session_id");
    /// let first = identity.get_or_create();
    /// assert_eq!(identity.get_or_create(), first);
    /// ```
    pub fn get_or_create(&self) -> String {
        let mut fallback = self.fallback();
        if let Some(token) = fallback.as_ref() {
            return token.clone();
        }

        match self.store.get(&self.key) {
            Ok(Some(token)) if !token.trim().is_empty() => return token,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to read identity token: {}", e);
                let token = new_token();
                *fallback = Some(token.clone());
                return token;
            }
        }

        let token = new_token();
        match self.store.set(&self.key, &token) {
            Ok(()) => tracing::info!("Created new session identity"),
            Err(e) => {
                tracing::warn!("Failed to persist identity token, keeping it in memory: {}", e);
                *fallback = Some(token.clone());
            }
        }
        token
    }

    /// Forgets the current token so the next call mints a new one
    ///
    /// # Errors
    ///
    /// Returns the store's error if the stored token cannot be removed
    pub fn reset(&self) -> Result<()> {
        *self.fallback() = None;
        self.store.remove(&self.key)
    }

    fn fallback(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.fallback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
