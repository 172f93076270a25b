//! Account selection policy for command handlers.
//!
//! Selection precedence: explicit `--account` flag or `COURIER_ACCOUNT`
//! environment variable, then the primary account, then the store's
//! documented first-account fallback. The selection is carried as an explicit
//! value threaded through handlers so tests can run in parallel without
//! ambient state.

use crate::accounts::{AccountRecord, AccountStore, SecretBackend};
use crate::error::{CourierError, Result};

/// How an account ended up selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// Named explicitly via flag or environment variable.
    Explicit,
    /// The store's primary account.
    Primary,
    /// No account is flagged primary; deterministic first-account fallback.
    FirstAccount,
}

/// A resolved account plus how it was chosen, for "(primary)" vs
/// "(first account)" labeling.
#[derive(Debug)]
pub struct SelectedAccount {
    pub record: AccountRecord,
    pub source: SelectionSource,
}

impl SelectedAccount {
    /// Short label describing how the account was chosen.
    #[must_use]
    pub const fn source_label(&self) -> &'static str {
        match self.source {
            SelectionSource::Explicit => "selected",
            SelectionSource::Primary => "primary",
            SelectionSource::FirstAccount => "first account",
        }
    }
}

/// Explicit account selection, constructed once in `main`.
#[derive(Debug, Clone, Default)]
pub struct AccountSelection {
    explicit: Option<String>,
}

impl AccountSelection {
    /// Creates a selection from the already-parsed flag/env value.
    #[must_use]
    pub fn new(explicit: Option<String>) -> Self {
        Self { explicit }
    }

    /// Resolves the selection against the store.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::NotAuthenticated`] when the store is empty and
    /// nothing was named explicitly, or `NotFound` for an explicit name with
    /// no record.
    pub fn resolve<B: SecretBackend>(&self, store: &AccountStore<B>) -> Result<SelectedAccount> {
        if let Some(name) = &self.explicit {
            let record = store.get(name)?;
            return Ok(SelectedAccount {
                record,
                source: SelectionSource::Explicit,
            });
        }

        let Some(name) = store.get_primary()? else {
            return Err(CourierError::NotAuthenticated);
        };
        let record = store.get(&name)?;
        let source = if record.is_primary {
            SelectionSource::Primary
        } else {
            SelectionSource::FirstAccount
        };
        Ok(SelectedAccount { record, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::backend::MemoryBackend;

    fn store() -> AccountStore<MemoryBackend> {
        AccountStore::new(MemoryBackend::new())
    }

    #[test]
    fn explicit_name_wins_over_primary() {
        let store = store();
        store.set("default", "tok-A", "").unwrap();
        store.set("work", "tok-B", "").unwrap();

        let selected = AccountSelection::new(Some("work".to_string()))
            .resolve(&store)
            .unwrap();

        assert_eq!(selected.record.name, "work");
        assert_eq!(selected.source, SelectionSource::Explicit);
    }

    #[test]
    fn explicit_unknown_name_is_not_found() {
        let store = store();
        store.set("default", "tok-A", "").unwrap();

        let err = AccountSelection::new(Some("nope".to_string()))
            .resolve(&store)
            .unwrap_err();
        assert!(matches!(
            err,
            CourierError::Account(crate::accounts::AccountError::NotFound(_))
        ));
    }

    #[test]
    fn falls_back_to_primary() {
        let store = store();
        store.set("default", "tok-A", "").unwrap();
        store.set("work", "tok-B", "").unwrap();
        store.set_primary("work").unwrap();

        let selected = AccountSelection::new(None).resolve(&store).unwrap();
        assert_eq!(selected.record.name, "work");
        assert_eq!(selected.source, SelectionSource::Primary);
        assert_eq!(selected.source_label(), "primary");
    }

    #[test]
    fn first_account_fallback_is_labeled() {
        let store = store();
        store.set("beta", "tok-B", "").unwrap();
        store.set("alpha", "tok-A", "").unwrap();
        // Remove the flagged primary; only the fallback remains.
        store.delete("beta").unwrap();
        store.set("zulu", "tok-Z", "").unwrap();

        let selected = AccountSelection::new(None).resolve(&store).unwrap();
        assert_eq!(selected.record.name, "alpha");
        assert_eq!(selected.source, SelectionSource::FirstAccount);
        assert_eq!(selected.source_label(), "first account");
    }

    #[test]
    fn empty_store_requires_login() {
        let store = store();
        let err = AccountSelection::new(None).resolve(&store).unwrap_err();
        assert!(matches!(err, CourierError::NotAuthenticated));
    }
}
