//! The multi-account credential store.
//!
//! [`AccountStore`] owns the "at most one primary account" invariant on top
//! of an opaque [`SecretBackend`]. One backend entry per account, keyed by
//! account name; the primary flag and all other metadata live inside each
//! account's serialized record, so there is no separate index to keep in
//! sync at the store level.
//!
//! In-process concurrency: writes (`set`/`delete`/`set_primary`) take the
//! store's write lock because the primary invariant requires read-modify-write
//! across records; reads run concurrently under the read lock and never
//! observe a half-finished primary rewrite. Cross-process races are bounded
//! by whatever per-entry atomicity the backend offers; two racing CLI
//! invocations are last-writer-wins.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::accounts::backend::SecretBackend;
use crate::accounts::error::AccountError;
use crate::accounts::types::AccountRecord;

/// Account name used when the user doesn't pick one.
pub const DEFAULT_ACCOUNT_NAME: &str = "default";

/// Durable storage of [`AccountRecord`]s with primary-account selection.
pub struct AccountStore<B: SecretBackend> {
    backend: B,
    lock: RwLock<()>,
}

impl<B: SecretBackend> AccountStore<B> {
    /// Creates a store on top of the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            lock: RwLock::new(()),
        }
    }

    /// Inserts or overwrites the record for `name`.
    ///
    /// A new record gets `created_at = now` and is not primary, unless it is
    /// the very first account in the store, which becomes primary so a
    /// single-account setup needs no extra step. Overwriting an existing
    /// record updates only the credential and bot name; `created_at` and the
    /// primary flag carry over.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidName`] for an empty or reserved name,
    /// or a backend error if secure storage cannot be reached.
    pub fn set(&self, name: &str, credential: &str, bot_name: &str) -> Result<(), AccountError> {
        validate_name(name)?;
        let _guard = self.write_guard();

        let record = match self.read_record(name)? {
            Some(prev) => AccountRecord {
                name: name.to_string(),
                credential: credential.to_string(),
                bot_name: bot_name.to_string(),
                is_primary: prev.is_primary,
                created_at: prev.created_at,
            },
            None => AccountRecord {
                name: name.to_string(),
                credential: credential.to_string(),
                bot_name: bot_name.to_string(),
                is_primary: self.backend.list_keys()?.is_empty(),
                created_at: Utc::now(),
            },
        };

        self.write_record(&record)
    }

    /// Loads the record for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if no record exists for `name`.
    pub fn get(&self, name: &str) -> Result<AccountRecord, AccountError> {
        validate_name(name)?;
        let _guard = self.read_guard();
        self.read_record(name)?
            .ok_or_else(|| AccountError::NotFound(name.to_string()))
    }

    /// Removes the record for `name`.
    ///
    /// Deleting the primary account promotes nobody: `get_primary` falls back
    /// to the first remaining account (see [`get_primary`](Self::get_primary))
    /// until a new primary is chosen.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if no record exists for `name`.
    pub fn delete(&self, name: &str) -> Result<(), AccountError> {
        validate_name(name)?;
        let _guard = self.write_guard();
        self.backend.delete(name)
    }

    /// Returns all records. Empty vec, not an error, when no accounts exist.
    ///
    /// Records that fail to decode are skipped with a warning so one
    /// corrupted entry doesn't hide every other account; `get` on the same
    /// name still reports the corruption.
    pub fn list(&self) -> Result<Vec<AccountRecord>, AccountError> {
        let _guard = self.read_guard();
        self.read_all()
    }

    /// Atomically makes `name` the only primary account.
    ///
    /// Other records are cleared first and the target flagged last, so an
    /// interrupted rewrite degrades to "no primary" (covered by the
    /// `get_primary` fallback) rather than two primaries. The whole rewrite
    /// happens under a single write-lock acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if no record exists for `name`.
    pub fn set_primary(&self, name: &str) -> Result<(), AccountError> {
        validate_name(name)?;
        let _guard = self.write_guard();

        let records = self.read_all()?;
        let mut target = records
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| AccountError::NotFound(name.to_string()))?;

        for mut rec in records {
            if rec.name != name && rec.is_primary {
                rec.is_primary = false;
                self.write_record(&rec)?;
            }
        }
        if !target.is_primary {
            target.is_primary = true;
            self.write_record(&target)?;
        }
        Ok(())
    }

    /// Returns the name of the primary account.
    ///
    /// If no record is flagged primary but accounts exist, falls back to the
    /// lexicographically first name. The fallback is deliberate and
    /// deterministic: callers rely on it to label output "(primary)" versus
    /// "(first account)". Returns `Ok(None)` when the store is empty.
    pub fn get_primary(&self) -> Result<Option<String>, AccountError> {
        let _guard = self.read_guard();
        let records = self.read_all()?;

        if let Some(rec) = records.iter().find(|r| r.is_primary) {
            return Ok(Some(rec.name.clone()));
        }
        Ok(records
            .iter()
            .map(|r| r.name.as_str())
            .min()
            .map(String::from))
    }

    fn read_record(&self, name: &str) -> Result<Option<AccountRecord>, AccountError> {
        match self.backend.get(name) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| AccountError::Corrupted(format!("account '{name}': {e}"))),
            Err(AccountError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_record(&self, record: &AccountRecord) -> Result<(), AccountError> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| AccountError::Corrupted(format!("account '{}': {e}", record.name)))?;
        self.backend.put(&record.name, &bytes)
    }

    fn read_all(&self) -> Result<Vec<AccountRecord>, AccountError> {
        let mut records = Vec::new();
        for key in self.backend.list_keys()? {
            match self.read_record(&key) {
                Ok(Some(rec)) => records.push(rec),
                // Deleted by another process between list and read; skip.
                Ok(None) => {}
                Err(AccountError::Corrupted(detail)) => {
                    tracing::warn!("skipping undecodable account entry: {detail}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_name(name: &str) -> Result<(), AccountError> {
    if name.is_empty() {
        return Err(AccountError::InvalidName(
            name.to_string(),
            "name cannot be empty".to_string(),
        ));
    }
    if name.starts_with('.') {
        return Err(AccountError::InvalidName(
            name.to_string(),
            "names starting with '.' are reserved".to_string(),
        ));
    }
    Ok(())
}
