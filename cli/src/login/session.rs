//! Login session state machine and single-use session token.
//!
//! A session exists only for the duration of one login attempt and is never
//! persisted. Every terminal transition goes through one mutex-guarded cell
//! holding a take-once [`oneshot::Sender`], so "valid submission received",
//! "timeout elapsed" and "caller cancelled" can race freely and exactly one
//! of them wins.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::accounts::AccountError;
use crate::login::error::LoginError;

/// States of one login session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, local port not yet bound.
    Idle,
    /// Port bound, entry page not yet served.
    Listening,
    /// Entry page served, waiting for the credential submission.
    AwaitingSubmission,
    /// Valid submission received and persisted. Terminal.
    Completed,
    /// Submission with a valid token was rejected or could not be persisted. Terminal.
    Failed,
    /// No valid submission within the configured wait. Terminal.
    TimedOut,
    /// Caller cancelled. Terminal.
    Cancelled,
}

impl SessionState {
    /// Whether the session has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }
}

/// Outcome of a completed login: the account that was written to the store.
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// Name of the new (or overwritten) account.
    pub account: String,
    /// The credential that was persisted.
    pub credential: String,
}

pub(crate) type Outcome = Result<LoginResult, LoginError>;

/// What the HTTP handler should tell the browser about a submission.
#[derive(Debug)]
pub(crate) enum SubmitVerdict {
    /// This submission completed the session.
    Completed,
    /// The session was already terminal; valid token, idempotent no-op.
    AlreadyDone,
    /// Wrong or missing session token. The session stays open.
    TokenMismatch,
    /// Valid token but empty credential. The session failed.
    EmptyCredential,
    /// Valid token but the store write failed. The session failed.
    StoreFailed(String),
}

struct Cell {
    state: SessionState,
    tx: Option<oneshot::Sender<Outcome>>,
}

/// Shared state of one login attempt.
pub(crate) struct Session {
    token: String,
    cell: Mutex<Cell>,
}

impl Session {
    pub fn new(token: String, tx: oneshot::Sender<Outcome>) -> Self {
        Self {
            token,
            cell: Mutex::new(Cell {
                state: SessionState::Idle,
                tx: Some(tx),
            }),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn mark_listening(&self) {
        let mut cell = self.lock();
        if cell.state == SessionState::Idle {
            cell.state = SessionState::Listening;
        }
    }

    pub fn mark_awaiting(&self) {
        let mut cell = self.lock();
        if cell.state == SessionState::Listening {
            cell.state = SessionState::AwaitingSubmission;
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Handles one submission. `persist` runs inside the critical section
    /// that flips the state, so a duplicate submission can never trigger a
    /// second store write.
    pub fn try_submit<F>(&self, token: &str, name: &str, credential: &str, persist: F) -> SubmitVerdict
    where
        F: FnOnce() -> Result<(), AccountError>,
    {
        let mut cell = self.lock();

        // Token equality is checked before any state mutation; a stray or
        // forged request can never finish someone else's session.
        let token_ok = constant_time_eq(token, &self.token);

        if cell.state.is_terminal() {
            return if token_ok {
                SubmitVerdict::AlreadyDone
            } else {
                SubmitVerdict::TokenMismatch
            };
        }
        if !token_ok {
            return SubmitVerdict::TokenMismatch;
        }

        if credential.is_empty() {
            finish_locked(
                &mut cell,
                SessionState::Failed,
                Err(LoginError::InvalidSubmission),
            );
            return SubmitVerdict::EmptyCredential;
        }

        match persist() {
            Ok(()) => {
                finish_locked(
                    &mut cell,
                    SessionState::Completed,
                    Ok(LoginResult {
                        account: name.to_string(),
                        credential: credential.to_string(),
                    }),
                );
                SubmitVerdict::Completed
            }
            Err(e) => {
                let detail = e.to_string();
                finish_locked(&mut cell, SessionState::Failed, Err(LoginError::Store(e)));
                SubmitVerdict::StoreFailed(detail)
            }
        }
    }

    /// Attempts an external terminal transition (timeout or cancellation).
    ///
    /// Returns `true` if this call won the single-fire race; `false` means a
    /// submission already finished the session and its outcome is waiting on
    /// the completion channel.
    pub fn finish(&self, state: SessionState) -> bool {
        let mut cell = self.lock();
        if cell.tx.is_some() {
            cell.state = state;
            cell.tx = None;
            true
        } else {
            false
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn finish_locked(cell: &mut Cell, state: SessionState, outcome: Outcome) {
    cell.state = state;
    if let Some(tx) = cell.tx.take() {
        // The receiver may have gone away on cancellation; nothing to do.
        let _ = tx.send(outcome);
    }
}

/// Generates an unguessable, single-use session token.
pub(crate) fn generate_session_token() -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Constant-time string comparison.
///
/// Comparison time must not depend on where the strings first differ, or the
/// session token could be probed byte by byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (Session, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let session = Session::new(generate_session_token(), tx);
        session.mark_listening();
        session.mark_awaiting();
        (session, rx)
    }

    #[test]
    fn tokens_are_unique_and_urlsafe() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn constant_time_eq_basic() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }

    #[test]
    fn wrong_token_leaves_session_open_and_skips_persist() {
        let (session, _rx) = session();
        let mut persisted = false;

        let verdict = session.try_submit("wrong", "default", "tok", || {
            persisted = true;
            Ok(())
        });

        assert!(matches!(verdict, SubmitVerdict::TokenMismatch));
        assert!(!persisted);
        assert_eq!(session.state(), SessionState::AwaitingSubmission);
    }

    #[test]
    fn correct_token_completes_exactly_once() {
        let (session, mut rx) = session();
        let token = session.token().to_string();
        let mut writes = 0;

        let first = session.try_submit(&token, "default", "tok-A", || {
            writes += 1;
            Ok(())
        });
        let second = session.try_submit(&token, "default", "tok-B", || {
            writes += 1;
            Ok(())
        });

        assert!(matches!(first, SubmitVerdict::Completed));
        assert!(matches!(second, SubmitVerdict::AlreadyDone));
        assert_eq!(writes, 1);

        let outcome = rx.try_recv().unwrap().unwrap();
        assert_eq!(outcome.account, "default");
        assert_eq!(outcome.credential, "tok-A");
    }

    #[test]
    fn concurrent_duplicate_submissions_write_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let (session, mut rx) = session();
        let session = Arc::new(session);
        let token = session.token().to_string();
        let writes = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|s| {
            for _ in 0..4 {
                let session = Arc::clone(&session);
                let writes = Arc::clone(&writes);
                let token = token.clone();
                s.spawn(move || {
                    session.try_submit(&token, "default", "tok", || {
                        writes.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                });
            }
        });

        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().unwrap().is_ok());
    }

    #[test]
    fn empty_credential_fails_the_session() {
        let (session, mut rx) = session();
        let token = session.token().to_string();

        let verdict = session.try_submit(&token, "default", "", || Ok(()));

        assert!(matches!(verdict, SubmitVerdict::EmptyCredential));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(LoginError::InvalidSubmission)
        ));
    }

    #[test]
    fn store_failure_fails_the_session() {
        let (session, mut rx) = session();
        let token = session.token().to_string();

        let verdict = session.try_submit(&token, "default", "tok", || {
            Err(AccountError::Unavailable("keyring locked".to_string()))
        });

        assert!(matches!(verdict, SubmitVerdict::StoreFailed(_)));
        assert!(matches!(rx.try_recv().unwrap(), Err(LoginError::Store(_))));
    }

    #[test]
    fn external_finish_wins_only_once() {
        let (session, _rx) = session();
        let token = session.token().to_string();

        assert!(session.finish(SessionState::TimedOut));
        assert!(!session.finish(SessionState::Cancelled));
        assert_eq!(session.state(), SessionState::TimedOut);

        // A late submission with the right token is acknowledged idempotently.
        let verdict = session.try_submit(&token, "default", "tok", || Ok(()));
        assert!(matches!(verdict, SubmitVerdict::AlreadyDone));
    }

    #[test]
    fn submission_beats_late_timeout() {
        let (session, _rx) = session();
        let token = session.token().to_string();

        let verdict = session.try_submit(&token, "default", "tok", || Ok(()));
        assert!(matches!(verdict, SubmitVerdict::Completed));

        // The timeout lost the race; the completed outcome stands.
        assert!(!session.finish(SessionState::TimedOut));
        assert_eq!(session.state(), SessionState::Completed);
    }
}
