//! Auth service: register, login, logout, and session queries.
//!
//! SYSTEM CONTEXT
//! ==============
//! Login and register forms call this service. It talks to the
//! `/Authentication` endpoints through the intercepted pipeline, updates the
//! `SessionStore` on login success, and returns `ClassifiedError`s for the
//! UI to display. Clearing the session on 401/403 is the interceptor's job,
//! not this service's.
//!
//! TRADE-OFFS
//! ==========
//! Overlapping logins are resolved by sequence number: only the most recently
//! issued login (and no login issued before a logout) may install a session.
//! A slow earlier response is reported as `Superseded` instead of
//! overwriting newer state.

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::nav::{Navigator, Route};
use crate::net::error::ClassifiedError;
use crate::net::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::session::{Credentials, Session, SessionStore, SessionSubscription, SessionUser, StorageError, UserId};

const REGISTER_PATH: &str = "/Authentication/register";
const LOGIN_PATH: &str = "/Authentication/login";

const MSG_MISSING_TOKEN: &str = "Login response did not include a session token.";
const MSG_MISSING_USER_ID: &str = "Login response did not include a user id.";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The server (or the network) refused the request.
    #[error(transparent)]
    Rejected(#[from] ClassifiedError),
    /// Login succeeded but the session could not be persisted.
    #[error("could not save the session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    #[must_use]
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Rejected(err) => Some(err),
            Self::Storage(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The returned session is now current.
    LoggedIn(Session),
    /// A newer login or a logout happened while this one was in flight;
    /// the session was left untouched.
    Superseded,
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    emailaddress: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: Option<String>,
    user_id: Option<UserId>,
    emailaddress: Option<String>,
}

pub struct AuthService {
    http: Arc<dyn HttpTransport>,
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    api_base: String,
    login_generation: AtomicU64,
}

impl AuthService {
    /// `http` must be the intercepted pipeline; `api_base` is the API base path.
    #[must_use]
    pub fn new(
        http: Arc<dyn HttpTransport>,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
        api_base: impl Into<String>,
    ) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_owned();
        Self { http, store, navigator, api_base, login_generation: AtomicU64::new(0) }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn auth_request(&self, path: &str, credentials: &Credentials) -> ApiRequest {
        let payload = AuthRequest { emailaddress: &credentials.email, password: &credentials.password };
        // Two borrowed strings always serialize.
        let body = serde_json::to_value(payload).unwrap_or_default();
        ApiRequest::post(self.endpoint(path), body)
    }

    /// Create an account. Does not log the user in.
    ///
    /// # Errors
    ///
    /// Returns the [`ClassifiedError`] for any failed exchange.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), ClassifiedError> {
        let request = self.auth_request(REGISTER_PATH, credentials);
        match self.http.send(request).await {
            Ok(response) => {
                tracing::info!(email = %credentials.email, status = response.status, "registration accepted");
                Ok(())
            }
            Err(failure) => {
                let err = ClassifiedError::from(failure);
                tracing::warn!(code = err.kind.error_code(), status = err.cause.status, "registration failed");
                Err(err)
            }
        }
    }

    /// Log in and install the returned session.
    ///
    /// On failure any existing session is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] for failed exchanges or responses
    /// without a token, and [`AuthError::Storage`] if the session could not
    /// be persisted.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        let generation = self.login_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.auth_request(LOGIN_PATH, credentials);

        let response = self.http.send(request).await.map_err(|failure| {
            let err = ClassifiedError::from(failure);
            tracing::warn!(code = err.kind.error_code(), status = err.cause.status, "login failed");
            err
        })?;
        let session = parse_login_response(&response, &credentials.email)?;

        if self.login_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded login response");
            return Ok(LoginOutcome::Superseded);
        }

        self.store
            .set_session(session.token.clone(), session.user.clone())?;
        Ok(LoginOutcome::LoggedIn(session))
    }

    /// Drop the session and show the login view. Purely local.
    pub fn logout(&self) {
        // Any login still in flight must not resurrect the session.
        self.login_generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.store.clear_session() {
            tracing::warn!(error = %e, "failed to remove session from storage");
        }
        self.navigator.navigate(Route::Login);
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.store.is_present()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.store.current()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.store.current().map(|session| session.token)
    }

    #[must_use]
    pub fn current_user(&self) -> Option<SessionUser> {
        self.store.current().map(|session| session.user)
    }

    /// Session changes, starting with the current value.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        self.store.subscribe()
    }
}

/// Extract the session from a 2xx login body. A missing `emailaddress`
/// falls back to the email the user logged in with.
fn parse_login_response(response: &ApiResponse, submitted_email: &str) -> Result<Session, ClassifiedError> {
    let missing = |message: &str| ClassifiedError::unexpected_response(response.status, response.body.clone(), message);

    let parsed = response
        .json_value()
        .and_then(|value| serde_json::from_value::<LoginResponse>(value).ok())
        .ok_or_else(|| missing(MSG_MISSING_TOKEN))?;

    let token = parsed
        .token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| missing(MSG_MISSING_TOKEN))?;
    let user_id = parsed.user_id.ok_or_else(|| missing(MSG_MISSING_USER_ID))?;
    let email = parsed
        .emailaddress
        .unwrap_or_else(|| submitted_email.to_owned());

    Ok(Session::new(token, SessionUser { user_id, email }))
}
