//! Account management command handlers.
//!
//! This module implements the account commands:
//! - [`handle_account_list`] - List saved accounts (`courier account list`)
//! - [`handle_account_use`] - Change the primary account (`courier account use`)

use crate::accounts::{AccountStore, KeyringBackend};
use crate::error::Result;

/// Handle the `courier account list` command.
///
/// Shows every saved account sorted by name. Exactly one account is marked
/// "(primary)"; when none carries the flag, the store's deterministic
/// fallback is marked "(first account)" instead.
///
/// # Errors
///
/// Returns an error if the credential store is unreachable.
pub fn handle_account_list() -> Result<()> {
    let store = AccountStore::new(KeyringBackend::new());

    let mut accounts = store.list()?;
    if accounts.is_empty() {
        println!("No accounts saved.");
        println!();
        println!("Run 'courier auth login' to add one.");
        return Ok(());
    }
    accounts.sort_by(|a, b| a.name.cmp(&b.name));

    let fallback = store.get_primary()?;
    let has_flagged = accounts.iter().any(|r| r.is_primary);

    println!("{} account(s):", accounts.len());
    println!();
    for rec in &accounts {
        let marker = if rec.is_primary {
            " (primary)"
        } else if !has_flagged && fallback.as_deref() == Some(rec.name.as_str()) {
            " (first account)"
        } else {
            ""
        };
        if rec.bot_name.is_empty() {
            println!("  {}{marker}", rec.name);
        } else {
            println!("  {} - {}{marker}", rec.name, rec.bot_name);
        }
    }

    Ok(())
}

/// Handle the `courier account use <name>` command.
///
/// # Errors
///
/// Returns an error if the account does not exist or the store is
/// unreachable.
pub fn handle_account_use(name: &str) -> Result<()> {
    let store = AccountStore::new(KeyringBackend::new());
    store.set_primary(name)?;
    println!("Account '{name}' is now the primary account.");
    Ok(())
}
