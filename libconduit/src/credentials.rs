//! Secure storage for the signed-in user
//!
//! The store holds a single record: the [`User`] returned by login, encoded
//! in its `{"user": {...}}` envelope. Every backend exposes the same three
//! operations and reports failures as [`CredentialStoreError`]:
//!
//! - `KeyringStore`: OS keyring (macOS Keychain, Windows Credential Manager,
//!   Secret Service on Linux)
//! - `FileStore`: a JSON file readable only by the owner
//! - `MemoryStore`: process-local, used by tests and previews
//!
//! # Example
//!
//! ```no_run
//! use libconduit::credentials::{CredentialConfig, CredentialStore};
//! use libconduit::User;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CredentialConfig::default().open_store()?;
//!
//! store.replace(&User::new("jwt", "jake", None))?;
//! let user = store.load()?;
//! store.delete()?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::CredentialStoreError;
use crate::types::User;

type StoreResult<T> = std::result::Result<T, CredentialStoreError>;

/// Single-record credential storage.
///
/// Access is assumed to be single-writer; callers serialise through the
/// session Store rather than a lock here.
pub trait CredentialStore: Send + Sync {
    /// Persist `user`
    fn save(&self, user: &User) -> StoreResult<()>;

    /// Remove the stored user. Removing a missing record succeeds.
    fn delete(&self) -> StoreResult<()>;

    /// Read the stored user.
    ///
    /// Returns `NoItem` when nothing is stored and `MalformedData` when the
    /// stored bytes do not decode as a user.
    fn load(&self) -> StoreResult<User>;

    fn backend_name(&self) -> &str;

    /// Delete then save, so a stale record never survives a new login
    fn replace(&self, user: &User) -> StoreResult<()> {
        self.delete()?;
        self.save(user)
    }
}

fn encode(user: &User) -> StoreResult<String> {
    serde_json::to_string(user).map_err(|e| CredentialStoreError::MalformedData(e.to_string()))
}

fn decode(raw: &str) -> StoreResult<User> {
    serde_json::from_str(raw).map_err(|e| CredentialStoreError::MalformedData(e.to_string()))
}

/// OS keyring backend.
///
/// The user is stored as one secret under `(service, "user")`.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub const ACCOUNT: &'static str = "user";

    /// # Errors
    ///
    /// Returns `CredentialStoreError::Platform` if an entry cannot be created,
    /// e.g. on headless Linux without Secret Service.
    pub fn new(service: impl Into<String>) -> StoreResult<Self> {
        let service = service.into();
        keyring::Entry::new(&service, Self::ACCOUNT).map_err(|e| {
            CredentialStoreError::Platform(format!("OS keyring not accessible: {}", e))
        })?;
        Ok(Self { service })
    }

    fn entry(&self) -> StoreResult<keyring::Entry> {
        keyring::Entry::new(&self.service, Self::ACCOUNT)
            .map_err(|e| CredentialStoreError::Platform(e.to_string()))
    }
}

impl CredentialStore for KeyringStore {
    fn save(&self, user: &User) -> StoreResult<()> {
        let payload = encode(user)?;
        self.entry()?
            .set_password(&payload)
            .map_err(|e| CredentialStoreError::Platform(e.to_string()))?;

        tracing::debug!("Stored user {} in OS keyring ({})", user.username, self.service);
        Ok(())
    }

    fn delete(&self) -> StoreResult<()> {
        match self.entry()?.delete_password() {
            Ok(()) => {
                tracing::debug!("Deleted stored user from OS keyring ({})", self.service);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("No stored user in OS keyring ({})", self.service);
                Ok(())
            }
            Err(e) => Err(CredentialStoreError::Platform(e.to_string())),
        }
    }

    fn load(&self) -> StoreResult<User> {
        match self.entry()?.get_password() {
            Ok(payload) => decode(&payload),
            Err(keyring::Error::NoEntry) => Err(CredentialStoreError::NoItem),
            Err(keyring::Error::BadEncoding(_)) => Err(CredentialStoreError::MalformedData(
                "keyring entry is not valid UTF-8".to_string(),
            )),
            Err(e) => Err(CredentialStoreError::Platform(e.to_string())),
        }
    }

    fn backend_name(&self) -> &str {
        "keyring"
    }
}

/// JSON file backend (mode 0600 on Unix)
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn save(&self, user: &User) -> StoreResult<()> {
        let payload = encode(user)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CredentialStoreError::Platform(e.to_string()))?;
        }
        std::fs::write(&self.path, payload)
            .map_err(|e| CredentialStoreError::Platform(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| CredentialStoreError::Platform(e.to_string()))?;
        }

        tracing::debug!("Stored user {} in {}", user.username, self.path.display());
        Ok(())
    }

    fn delete(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialStoreError::Platform(e.to_string())),
        }
    }

    fn load(&self) -> StoreResult<User> {
        match std::fs::read_to_string(&self.path) {
            Ok(payload) => decode(&payload),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CredentialStoreError::NoItem),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(CredentialStoreError::MalformedData(e.to_string()))
            }
            Err(e) => Err(CredentialStoreError::Platform(e.to_string())),
        }
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}

/// In-process backend with call counters and injectable save failures
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
    deletes: AtomicUsize,
    loads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: &User) -> StoreResult<Self> {
        let store = Self::new();
        *store.slot() = Some(encode(user)?);
        Ok(store)
    }

    /// Seed the slot with raw bytes, e.g. to simulate corrupted data
    pub fn with_raw(raw: impl Into<String>) -> Self {
        let store = Self::new();
        *store.slot() = Some(raw.into());
        store
    }

    /// Make every subsequent `save` fail with `Platform`
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.slot().is_none()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, user: &User) -> StoreResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CredentialStoreError::Platform("save rejected".to_string()));
        }
        *self.slot() = Some(encode(user)?);
        Ok(())
    }

    fn delete(&self) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        *self.slot() = None;
        Ok(())
    }

    fn load(&self) -> StoreResult<User> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.slot().as_deref() {
            Some(payload) => decode(payload),
            None => Err(CredentialStoreError::NoItem),
        }
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Keyring,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub storage: StorageBackend,

    /// File location for the `file` backend
    #[serde(default = "default_credential_path")]
    pub path: String,

    /// Keyring service name for the `keyring` backend
    #[serde(default = "default_service")]
    pub service: String,
}

fn default_credential_path() -> String {
    "~/.config/conduit/user.json".to_string()
}

fn default_service() -> String {
    "conduit".to_string()
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Keyring,
            path: default_credential_path(),
            service: default_service(),
        }
    }
}

impl CredentialConfig {
    pub fn expand_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }

    /// Build the configured backend
    pub fn open_store(&self) -> StoreResult<Arc<dyn CredentialStore>> {
        let store: Arc<dyn CredentialStore> = match self.storage {
            StorageBackend::Keyring => Arc::new(KeyringStore::new(self.service.clone())?),
            StorageBackend::File => Arc::new(FileStore::new(self.expand_path())),
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
        };
        tracing::debug!("Using {} credential store", store.backend_name());
        Ok(store)
    }
}
