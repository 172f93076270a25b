//! Secure key-value backends for account storage.
//!
//! The store treats secure storage as an opaque key-value service addressed
//! by key within a fixed service namespace:
//! - [`SecretBackend`] - Trait for backend operations (enables mocking)
//! - [`KeyringBackend`] - OS keyring implementation
//!
//! Platform-native storage via the `keyring` crate:
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - Windows: Credential Manager

use keyring::Entry;

use crate::accounts::error::AccountError;

const SERVICE_NAME: &str = "chat.courier.cli";

/// Reserved backend key holding the list of stored account names.
///
/// The keyring API cannot enumerate entries, so the backend keeps its own
/// registry beneath the [`SecretBackend`] trait. The store rejects account
/// names starting with `.`, which keeps this key unreachable from callers.
const REGISTRY_KEY: &str = ".names";

/// Opaque secure key-value service the account store is built on.
#[cfg_attr(test, mockall::automock)]
pub trait SecretBackend: Send + Sync {
    /// Stores `value` under `key`, overwriting any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), AccountError>;

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if no value exists for `key`.
    fn get(&self, key: &str) -> Result<Vec<u8>, AccountError>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if no value exists for `key`.
    fn delete(&self, key: &str) -> Result<(), AccountError>;

    /// Lists every stored key. Empty vec when nothing is stored.
    fn list_keys(&self) -> Result<Vec<String>, AccountError>;
}

/// Secure storage backed by the OS keyring, one entry per key.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    /// Creates a backend bound to the courier service namespace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, AccountError> {
        Entry::new(&self.service, key).map_err(|e| map_keyring_error(key, e))
    }

    fn read_registry(&self) -> Result<Vec<String>, AccountError> {
        let entry = self.entry(REGISTRY_KEY)?;
        match entry.get_secret() {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AccountError::Corrupted(format!("account name registry: {e}"))),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(map_keyring_error(REGISTRY_KEY, e)),
        }
    }

    fn write_registry(&self, names: &[String]) -> Result<(), AccountError> {
        let bytes = serde_json::to_vec(names)
            .map_err(|e| AccountError::Corrupted(format!("account name registry: {e}")))?;
        self.entry(REGISTRY_KEY)?
            .set_secret(&bytes)
            .map_err(|e| map_keyring_error(REGISTRY_KEY, e))
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretBackend for KeyringBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), AccountError> {
        self.entry(key)?
            .set_secret(value)
            .map_err(|e| map_keyring_error(key, e))?;

        let mut names = self.read_registry()?;
        if !names.iter().any(|n| n == key) {
            names.push(key.to_string());
            names.sort();
            self.write_registry(&names)?;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, AccountError> {
        self.entry(key)?
            .get_secret()
            .map_err(|e| map_keyring_error(key, e))
    }

    fn delete(&self, key: &str) -> Result<(), AccountError> {
        self.entry(key)?
            .delete_credential()
            .map_err(|e| map_keyring_error(key, e))?;

        let mut names = self.read_registry()?;
        if names.iter().any(|n| n == key) {
            names.retain(|n| n != key);
            self.write_registry(&names)?;
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, AccountError> {
        self.read_registry()
    }
}

/// Maps keyring failures onto the store's error taxonomy.
///
/// Backend failures are surfaced verbatim and never retried here: a silently
/// repeated secure-storage prompt would take the keyring out of the user's
/// control.
fn map_keyring_error(key: &str, err: keyring::Error) -> AccountError {
    match err {
        keyring::Error::NoEntry => AccountError::NotFound(key.to_string()),
        keyring::Error::NoStorageAccess(e) => AccountError::PermissionDenied(e.to_string()),
        other => AccountError::Unavailable(other.to_string()),
    }
}

/// In-memory backend for tests.
#[cfg(test)]
pub(crate) struct MemoryBackend {
    entries: std::sync::Mutex<std::collections::BTreeMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(std::collections::BTreeMap::new()),
        }
    }
}

#[cfg(test)]
impl SecretBackend for MemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), AccountError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, AccountError> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AccountError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), AccountError> {
        self.entries
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AccountError::NotFound(key.to_string()))
    }

    fn list_keys(&self) -> Result<Vec<String>, AccountError> {
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }
}
