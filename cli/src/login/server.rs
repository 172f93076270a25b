//! Loopback HTTP surface for the interactive login.
//!
//! Two routes, bound to an ephemeral loopback port for the lifetime of one
//! session: `GET /` serves the credential-entry page with the session token
//! embedded, `POST /submit` accepts the submission. Everything else about the
//! session lives in [`crate::login::session`].

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::accounts::{AccountStore, SecretBackend, DEFAULT_ACCOUNT_NAME};
use crate::login::session::{Session, SubmitVerdict};

pub(crate) struct AppState<B: SecretBackend> {
    pub session: Arc<Session>,
    pub store: Arc<AccountStore<B>>,
    pub preset_name: Option<String>,
}

impl<B: SecretBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            store: Arc::clone(&self.store),
            preset_name: self.preset_name.clone(),
        }
    }
}

pub(crate) fn router<B: SecretBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/", get(entry_page::<B>))
        .route("/submit", post(submit::<B>))
        .with_state(state)
}

async fn entry_page<B: SecretBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Html<String> {
    state.session.mark_awaiting();
    let name = state.preset_name.as_deref().unwrap_or(DEFAULT_ACCOUNT_NAME);
    Html(render_entry_page(state.session.token(), name))
}

#[derive(Deserialize)]
struct SubmitForm {
    #[serde(default)]
    session_token: String,
    #[serde(default)]
    credential: String,
    #[serde(default)]
    account_name: String,
}

async fn submit<B: SecretBackend + 'static>(
    State(state): State<AppState<B>>,
    Form(form): Form<SubmitForm>,
) -> (StatusCode, Html<String>) {
    let name = if form.account_name.trim().is_empty() {
        state
            .preset_name
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCOUNT_NAME.to_string())
    } else {
        form.account_name.trim().to_string()
    };
    let credential = form.credential.trim().to_string();

    let store = Arc::clone(&state.store);
    let verdict = state
        .session
        .try_submit(&form.session_token, &name, &credential, || {
            store.set(&name, &credential, "")
        });

    match verdict {
        SubmitVerdict::Completed => (
            StatusCode::OK,
            Html(result_page(
                "Login complete",
                &format!(
                    "Credential saved for account '{}'. You can close this window and return to the terminal.",
                    escape_html(&name)
                ),
            )),
        ),
        SubmitVerdict::AlreadyDone => (
            StatusCode::OK,
            Html(result_page(
                "Login already completed",
                "This login session has already finished. You can close this window.",
            )),
        ),
        SubmitVerdict::TokenMismatch => {
            tracing::warn!("rejected login submission with invalid session token");
            (
                StatusCode::BAD_REQUEST,
                Html(result_page(
                    "Invalid session",
                    "This submission does not belong to the current login session. \
                     Return to the tab opened by the CLI, or re-run 'courier auth login'.",
                )),
            )
        }
        SubmitVerdict::EmptyCredential => (
            StatusCode::BAD_REQUEST,
            Html(result_page(
                "Empty credential",
                "No token was entered. Re-run 'courier auth login' and paste your bot token.",
            )),
        ),
        SubmitVerdict::StoreFailed(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(result_page(
                "Could not save credential",
                &format!(
                    "The credential could not be written to secure storage: {}. Check the terminal for details.",
                    escape_html(&detail)
                ),
            )),
        ),
    }
}

fn render_entry_page(session_token: &str, account_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Courier CLI Login</title>
  <style>
    body {{ font-family: sans-serif; max-width: 28rem; margin: 4rem auto; }}
    label {{ display: block; margin-top: 1rem; }}
    input {{ width: 100%; padding: 0.4rem; }}
    button {{ margin-top: 1.5rem; padding: 0.5rem 1.5rem; }}
  </style>
</head>
<body>
  <h1>Connect a bot account</h1>
  <p>Paste the access token for your Courier bot. The token is sent only to
  the CLI running on this machine.</p>
  <form method="post" action="/submit">
    <input type="hidden" name="session_token" value="{token}">
    <label>Account name
      <input type="text" name="account_name" value="{name}">
    </label>
    <label>Access token
      <input type="password" name="credential" autofocus>
    </label>
    <button type="submit">Save credential</button>
  </form>
</body>
</html>
"#,
        token = escape_html(session_token),
        name = escape_html(account_name),
    )
}

fn result_page(title: &str, message: &str) -> String {
    format!(
        r"<!DOCTYPE html>
<html>
<head><title>Courier CLI</title></head>
<body>
  <h1>{title}</h1>
  <p>{message}</p>
</body>
</html>
"
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_page_embeds_token_and_name() {
        let page = render_entry_page("tok-123", "work");
        assert!(page.contains(r#"value="tok-123""#));
        assert!(page.contains(r#"value="work""#));
        assert!(page.contains(r#"action="/submit""#));
    }

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<b a="x">&"#),
            "&lt;b a=&quot;x&quot;&gt;&amp;"
        );
    }
}
