//! Multi-account credential storage for the courier CLI.
//!
//! This module provides durable, keyed storage of per-account secrets and
//! metadata on top of the OS keyring, with "primary account" selection
//! semantics.

pub mod backend;
pub mod error;
pub mod store;
pub mod types;

pub use backend::{KeyringBackend, SecretBackend};
pub use error::AccountError;
pub use store::{AccountStore, DEFAULT_ACCOUNT_NAME};
pub use types::AccountRecord;
