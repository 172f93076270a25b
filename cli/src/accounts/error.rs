//! Account-store-specific error types.

use thiserror::Error;

/// Errors specific to credential store operations.
#[derive(Error, Debug)]
pub enum AccountError {
    /// Invalid account name (empty or reserved).
    #[error("Invalid account name '{0}': {1}")]
    InvalidName(String, String),

    /// Account with the given name was not found.
    #[error("Account '{0}' not found. Run 'courier account list' to see saved accounts.")]
    NotFound(String),

    /// The secure storage backend cannot be reached (e.g. keyring locked).
    #[error("Failed to access credential storage: {0}. Ensure your system keyring is unlocked.")]
    Unavailable(String),

    /// The OS denied access to secure storage.
    #[error("Access to credential storage was denied: {0}. Check your OS keychain permissions.")]
    PermissionDenied(String),

    /// A stored record could not be decoded.
    #[error("Stored account data is corrupted: {0}. Run 'courier auth logout' then 'courier auth login'.")]
    Corrupted(String),
}

#[allow(dead_code)]
impl AccountError {
    /// Checks if this is a "not found" error that might be recoverable.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
