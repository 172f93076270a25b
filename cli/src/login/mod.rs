//! Interactive, browser-mediated login for the courier CLI.
//!
//! A short-lived HTTP server on an ephemeral loopback port walks the operator
//! through pasting a bot token into a local page instead of into the
//! terminal, where it would land in shell history. The submission is bound to
//! the session by a single-use unguessable token; on success the credential
//! is written to the account store exactly once.

pub mod error;
pub mod flow;
pub mod server;
pub mod session;

pub use error::LoginError;
pub use flow::{open_browser, start, LoginOptions, PendingLogin, DEFAULT_LOGIN_TIMEOUT_SECS};
pub use session::{LoginResult, SessionState};
