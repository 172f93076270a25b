//! Login-flow-specific error types.

use thiserror::Error;

use crate::accounts::AccountError;

/// Errors specific to the interactive login flow.
///
/// Timeout and cancellation are distinct variants so the operator can tell
/// "re-run the command" apart from "check your input".
#[derive(Error, Debug)]
pub enum LoginError {
    /// Could not bind a loopback port for the callback server.
    #[error("Could not bind a local port for the login callback: {0}")]
    PortBindFailed(String),

    /// No valid submission arrived within the configured wait.
    #[error("Login timed out after {0} seconds. Re-run 'courier auth login' to try again.")]
    TimedOut(u64),

    /// The caller's cancellation signal fired before a submission arrived.
    #[error("Login was cancelled before a credential was received.")]
    Cancelled,

    /// A submission with a valid session token carried an empty credential.
    #[error("The submitted credential was empty. Re-run 'courier auth login' and paste a valid token.")]
    InvalidSubmission,

    /// Persisting the submitted credential failed.
    #[error(transparent)]
    Store(#[from] AccountError),

    /// The callback server task stopped without producing an outcome.
    #[error("The local login server stopped unexpectedly. Re-run 'courier auth login'.")]
    ServerClosed,
}
