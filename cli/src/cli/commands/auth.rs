//! Authentication command handlers.
//!
//! This module implements the auth commands:
//! - [`handle_login`] - Add an account (`courier auth login`)
//! - [`handle_logout`] - Remove an account (`courier auth logout`)
//! - [`handle_status`] - Show authentication status (`courier auth status`)

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::accounts::{AccountStore, KeyringBackend, SecretBackend, DEFAULT_ACCOUNT_NAME};
use crate::cli::selection::AccountSelection;
use crate::client::CourierApiClient;
use crate::config::CourierConfig;
use crate::error::{CourierError, Result};
use crate::login::{self, LoginError, LoginOptions};

/// Handle the `courier auth login` command.
///
/// Interactive by default: starts the local callback server, shows the
/// verification URL and blocks until the browser submission, a timeout or
/// Ctrl-C. With `--token` the credential is validated and stored directly,
/// no server involved.
///
/// # Errors
///
/// Returns an error if the callback server cannot start, the login times
/// out or is cancelled, or the credential store rejects the write.
pub async fn handle_login(
    config: &CourierConfig,
    name: Option<String>,
    token: Option<String>,
    no_browser: bool,
) -> Result<()> {
    let store = Arc::new(AccountStore::new(KeyringBackend::new()));

    // Non-interactive path: pure validation plus one store call.
    if let Some(token) = token {
        let account = name.unwrap_or_else(|| DEFAULT_ACCOUNT_NAME.to_string());
        let token = token.trim();
        if token.is_empty() {
            return Err(LoginError::InvalidSubmission.into());
        }
        store.set(&account, token, "")?;
        println!("Saved credential for account '{account}'.");
        resolve_bot_name(config, &store, &account).await;
        return Ok(());
    }

    let options = LoginOptions {
        account_name: name,
        timeout: Duration::from_secs(config.login.timeout_secs),
    };
    let pending = login::start(Arc::clone(&store), options).await?;

    println!("To connect a bot account, visit:");
    println!();
    println!("  {}", pending.verification_url());
    println!();

    if no_browser {
        println!("Open the URL manually to continue.");
    } else if login::open_browser(&pending) {
        println!("Browser opened automatically.");
    } else {
        println!("Could not open browser. Please visit the URL manually.");
    }
    println!();
    println!("Waiting for the credential to be submitted (Ctrl-C to cancel)...");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = pending.wait(cancel).await?;

    println!();
    println!("Credential saved for account '{}'.", result.account);
    resolve_bot_name(config, &store, &result.account).await;
    Ok(())
}

/// Handle the `courier auth logout` command.
///
/// # Errors
///
/// Returns an error if the account does not exist or the store is
/// unreachable.
pub fn handle_logout(
    selection: &AccountSelection,
    name: Option<String>,
    yes: bool,
) -> Result<()> {
    let store = AccountStore::new(KeyringBackend::new());

    let name = match name {
        Some(n) => n,
        None => selection.resolve(&store)?.record.name,
    };

    if !yes && !confirm(&format!("Remove account '{name}'?"))? {
        println!("Aborted.");
        return Ok(());
    }

    store.delete(&name)?;
    println!("Removed account '{name}'.");
    Ok(())
}

/// Handle the `courier auth status` command.
///
/// # Errors
///
/// Returns an error if the credential store is unreachable.
pub async fn handle_status(config: &CourierConfig, selection: &AccountSelection) -> Result<()> {
    let store = AccountStore::new(KeyringBackend::new());

    let selected = match selection.resolve(&store) {
        Ok(selected) => selected,
        Err(CourierError::NotAuthenticated) => {
            println!("Not logged in");
            println!();
            println!("Run 'courier auth login' to authenticate.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let record = &selected.record;
    println!("Account:    {} ({})", record.name, selected.source_label());
    if !record.bot_name.is_empty() {
        println!("Bot:        {}", record.bot_name);
    }
    println!("Token:      {}", record.token_preview());
    println!("Added:      {}", record.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("API Server: {}", config.api.base_url);

    let client = CourierApiClient::new(&config.api)?;
    client.set_token(record.credential.clone()).await;
    match client.fetch_identity().await {
        Ok(identity) => {
            if identity.bot_id.is_empty() {
                println!("Platform:   token accepted, bot '{}'", identity.bot_name);
            } else {
                println!(
                    "Platform:   token accepted, bot '{}' ({})",
                    identity.bot_name, identity.bot_id
                );
            }
        }
        Err(CourierError::Unauthorized) => {
            println!();
            println!("Warning: the platform rejected this token. Run 'courier auth login' to replace it.");
        }
        Err(e) => {
            println!();
            println!("Warning: could not reach the platform: {e}");
        }
    }

    Ok(())
}

/// Best-effort lookup of the bot's display name after a successful login.
///
/// The credential is already saved; an unreachable platform must not fail
/// the login, so failures are reported as a note and nothing more.
async fn resolve_bot_name<B: SecretBackend>(
    config: &CourierConfig,
    store: &AccountStore<B>,
    account: &str,
) {
    match try_resolve_bot_name(config, store, account).await {
        Ok(bot_name) => println!("Connected as bot '{bot_name}'."),
        Err(e) => {
            tracing::debug!("bot identity lookup failed: {e}");
            println!("Note: could not verify the token with the platform yet: {e}");
        }
    }
}

async fn try_resolve_bot_name<B: SecretBackend>(
    config: &CourierConfig,
    store: &AccountStore<B>,
    account: &str,
) -> Result<String> {
    let record = store.get(account)?;

    let client = CourierApiClient::new(&config.api)?;
    client.set_token(record.credential.clone()).await;
    let identity = client.fetch_identity().await?;

    store.set(account, &record.credential, &identity.bot_name)?;
    Ok(identity.bot_name)
}

/// Ask a yes/no question on stdin. Defaults to "no".
fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N]: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
