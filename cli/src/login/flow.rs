//! Interactive login flow orchestration.
//!
//! [`start`] binds the callback server and returns a [`PendingLogin`] so the
//! caller can show the verification URL (and open a browser) before blocking
//! in [`PendingLogin::wait`]. Exactly one store write happens per flow, on
//! the completed path only; every terminal path tears the server down and
//! releases the port before `wait` returns.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::accounts::{AccountStore, SecretBackend};
use crate::login::error::LoginError;
use crate::login::server::{router, AppState};
use crate::login::session::{generate_session_token, LoginResult, Outcome, Session, SessionState};

/// Default ceiling on how long a login waits for a submission.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;

/// Options for one login attempt.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Account name to suggest on the entry page. The submitted form value
    /// wins; `"default"` is used when neither is present.
    pub account_name: Option<String>,
    /// How long to wait for a valid submission before giving up.
    pub timeout: Duration,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            account_name: None,
            timeout: Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS),
        }
    }
}

/// Starts the login flow: binds an ephemeral loopback port, generates the
/// single-use session token and spawns the callback server.
///
/// # Errors
///
/// Returns [`LoginError::PortBindFailed`] if no loopback port can be bound.
pub async fn start<B: SecretBackend + 'static>(
    store: Arc<AccountStore<B>>,
    options: LoginOptions,
) -> Result<PendingLogin, LoginError> {
    let (tx, rx) = oneshot::channel();
    let session = Arc::new(Session::new(generate_session_token(), tx));

    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|e| LoginError::PortBindFailed(e.to_string()))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| LoginError::PortBindFailed(e.to_string()))?;
    session.mark_listening();

    let app = router(AppState {
        session: Arc::clone(&session),
        store,
        preset_name: options.account_name,
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = serve.await {
            tracing::error!("login callback server error: {e}");
        }
    });

    tracing::debug!("login callback server listening on {local_addr}");

    Ok(PendingLogin {
        url: format!("http://{local_addr}/"),
        local_addr,
        session,
        rx,
        shutdown_tx,
        server,
        timeout: options.timeout,
    })
}

/// Opens the verification URL in the default browser.
///
/// Returns `true` if the browser was opened successfully.
pub fn open_browser(pending: &PendingLogin) -> bool {
    open::that(pending.verification_url()).is_ok()
}

/// A login flow whose callback server is up and waiting.
pub struct PendingLogin {
    url: String,
    local_addr: SocketAddr,
    session: Arc<Session>,
    rx: oneshot::Receiver<Outcome>,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<()>,
    timeout: Duration,
}

impl PendingLogin {
    /// The local URL the operator must visit.
    #[must_use]
    pub fn verification_url(&self) -> &str {
        &self.url
    }

    /// The bound loopback address.
    #[must_use]
    #[allow(dead_code)]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[cfg(test)]
    pub(crate) fn session_token(&self) -> &str {
        self.session.token()
    }

    /// Blocks until the session reaches a terminal state, then tears the
    /// server down.
    ///
    /// # Errors
    ///
    /// - [`LoginError::TimedOut`] if no valid submission arrived in time.
    /// - [`LoginError::Cancelled`] if `cancel` fired first; the store is
    ///   untouched on this path.
    /// - [`LoginError::InvalidSubmission`] / [`LoginError::Store`] when a
    ///   valid-token submission failed.
    pub async fn wait(mut self, cancel: CancellationToken) -> Result<LoginResult, LoginError> {
        enum Wake {
            Outcome(Result<Outcome, oneshot::error::RecvError>),
            TimedOut,
            Cancelled,
        }

        let wake = tokio::select! {
            biased;
            res = &mut self.rx => Wake::Outcome(res),
            () = cancel.cancelled() => Wake::Cancelled,
            () = tokio::time::sleep(self.timeout) => Wake::TimedOut,
        };

        let outcome = match wake {
            Wake::Outcome(Ok(outcome)) => outcome,
            Wake::Outcome(Err(_)) => Err(LoginError::ServerClosed),
            Wake::TimedOut => {
                if self.session.finish(SessionState::TimedOut) {
                    Err(LoginError::TimedOut(self.timeout.as_secs()))
                } else {
                    // A submission won the race; take its outcome instead.
                    recv_outcome(&mut self.rx).await
                }
            }
            Wake::Cancelled => {
                if self.session.finish(SessionState::Cancelled) {
                    Err(LoginError::Cancelled)
                } else {
                    recv_outcome(&mut self.rx).await
                }
            }
        };

        // Terminal either way: stop accepting connections and release the
        // port before returning to the caller.
        let _ = self.shutdown_tx.send(());
        let _ = self.server.await;

        outcome
    }
}

async fn recv_outcome(rx: &mut oneshot::Receiver<Outcome>) -> Outcome {
    match rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(LoginError::ServerClosed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::backend::MemoryBackend;
    use crate::accounts::AccountError;

    fn test_store() -> Arc<AccountStore<MemoryBackend>> {
        Arc::new(AccountStore::new(MemoryBackend::new()))
    }

    fn options(timeout: Duration) -> LoginOptions {
        LoginOptions {
            account_name: None,
            timeout,
        }
    }

    async fn submit(
        url: &str,
        token: &str,
        credential: &str,
        name: &str,
    ) -> reqwest::Response {
        reqwest::Client::new()
            .post(url)
            .form(&[
                ("session_token", token),
                ("credential", credential),
                ("account_name", name),
            ])
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn entry_page_serves_form_with_token() {
        let store = test_store();
        let pending = start(store, options(Duration::from_secs(5))).await.unwrap();
        let token = pending.session_token().to_string();

        let body = reqwest::get(pending.verification_url())
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains(&token));
        assert!(body.contains("default"));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pending.wait(cancel).await.unwrap_err();
        assert!(matches!(err, LoginError::Cancelled));
    }

    #[tokio::test]
    async fn valid_submission_completes_and_writes_once() {
        let store = test_store();
        let pending = start(Arc::clone(&store), options(Duration::from_secs(5)))
            .await
            .unwrap();
        let token = pending.session_token().to_string();
        let submit_url = format!("http://{}/submit", pending.local_addr());

        let first = submit(&submit_url, &token, "tok-A", "work").await;
        assert_eq!(first.status(), 200);

        // A duplicate browser resubmission is acknowledged without a second
        // store write.
        let second = submit(&submit_url, &token, "tok-OTHER", "work").await;
        assert_eq!(second.status(), 200);

        let result = pending.wait(CancellationToken::new()).await.unwrap();
        assert_eq!(result.account, "work");
        assert_eq!(result.credential, "tok-A");

        let rec = store.get("work").unwrap();
        assert_eq!(rec.credential, "tok-A");
        assert!(rec.is_primary);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected_and_session_stays_open() {
        let store = test_store();
        let pending = start(Arc::clone(&store), options(Duration::from_secs(5)))
            .await
            .unwrap();
        let token = pending.session_token().to_string();
        let submit_url = format!("http://{}/submit", pending.local_addr());

        let rejected = submit(&submit_url, "forged-token", "tok-A", "").await;
        assert_eq!(rejected.status(), 400);
        assert!(store.list().unwrap().is_empty());

        // The legitimate submission still goes through afterwards.
        let accepted = submit(&submit_url, &token, "tok-A", "").await;
        assert_eq!(accepted.status(), 200);

        let result = pending.wait(CancellationToken::new()).await.unwrap();
        assert_eq!(result.account, "default");
        assert_eq!(store.get("default").unwrap().credential, "tok-A");
    }

    #[tokio::test]
    async fn empty_credential_fails_distinctly() {
        let store = test_store();
        let pending = start(Arc::clone(&store), options(Duration::from_secs(5)))
            .await
            .unwrap();
        let token = pending.session_token().to_string();
        let submit_url = format!("http://{}/submit", pending.local_addr());

        let resp = submit(&submit_url, &token, "", "").await;
        assert_eq!(resp.status(), 400);

        let err = pending.wait(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidSubmission));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeout_reports_and_releases_port() {
        let store = test_store();
        let pending = start(store, options(Duration::from_millis(50)))
            .await
            .unwrap();
        let addr = pending.local_addr();

        let err = pending.wait(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, LoginError::TimedOut(_)));

        // The port is free again once wait has returned.
        std::net::TcpListener::bind(addr).unwrap();
    }

    #[tokio::test]
    async fn cancellation_leaves_store_untouched_and_releases_port() {
        let store = test_store();
        let pending = start(Arc::clone(&store), options(Duration::from_secs(60)))
            .await
            .unwrap();
        let addr = pending.local_addr();

        let cancel = CancellationToken::new();
        let waiter = tokio::spawn(pending.wait(cancel.clone()));
        cancel.cancel();

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, LoginError::Cancelled));
        assert!(store.list().unwrap().is_empty());
        std::net::TcpListener::bind(addr).unwrap();
    }

    #[tokio::test]
    async fn store_failure_surfaces_through_wait() {
        use crate::accounts::backend::MockSecretBackend;

        let mut backend = MockSecretBackend::new();
        backend
            .expect_get()
            .returning(|_| Err(AccountError::Unavailable("keyring locked".to_string())));
        let store = Arc::new(AccountStore::new(backend));

        let pending = start(store, options(Duration::from_secs(5))).await.unwrap();
        let token = pending.session_token().to_string();
        let submit_url = format!("http://{}/submit", pending.local_addr());

        let resp = submit(&submit_url, &token, "tok-A", "").await;
        assert_eq!(resp.status(), 500);

        let err = pending.wait(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, LoginError::Store(AccountError::Unavailable(_))));
    }
}
