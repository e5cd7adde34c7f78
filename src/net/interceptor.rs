//! Request interceptor: credential injection and reactive session invalidation.
//!
//! ARCHITECTURE
//! ============
//! `AuthInterceptor` is a pipeline layer wrapping any `HttpTransport`.
//!
//! - Outgoing: requests aimed at the API base get `Authorization: Bearer
//!   <token>` when the store holds a session. Other destinations pass
//!   through untouched.
//! - Incoming: a 401/403 from the API clears the session and asks the
//!   navigator for the login view, then hands the original failure back to
//!   the caller unchanged. The layer taps failures; it never replaces them.
//!
//! Two rejections leave the session alone:
//! - Anything under `{base}/Authentication/`: a refused login or register
//!   leaves the existing session in place.
//! - A rejection of a token that is no longer current. A login that
//!   completed while the request was in flight keeps its session.

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod tests;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};

use super::error::HttpFailure;
use super::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::nav::{Navigator, Route};
use crate::session::SessionStore;

/// Credential endpoints whose 401/403 answers never end the session.
const AUTH_ENDPOINT_PREFIX: &str = "/Authentication/";

pub struct AuthInterceptor<T> {
    inner: T,
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    api_base: String,
}

impl<T: HttpTransport> AuthInterceptor<T> {
    #[must_use]
    pub fn new(inner: T, store: Arc<SessionStore>, navigator: Arc<dyn Navigator>, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_owned();
        Self { inner, store, navigator, api_base }
    }

    /// True when `url` is the API base or lies beneath it.
    #[must_use]
    pub fn targets_api(&self, url: &str) -> bool {
        let Some(rest) = url.strip_prefix(&self.api_base) else {
            return false;
        };
        rest.is_empty() || rest.starts_with(['/', '?', '#'])
    }

    fn is_auth_endpoint(&self, url: &str) -> bool {
        url.strip_prefix(&self.api_base)
            .is_some_and(|rest| rest.starts_with(AUTH_ENDPOINT_PREFIX))
    }

    /// Attach the current token, returning the token actually sent.
    fn attach_credentials(&self, request: &mut ApiRequest) -> Option<String> {
        let session = self.store.current()?;
        match HeaderValue::from_str(&format!("Bearer {}", session.token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
                tracing::debug!(url = %request.url, "attached bearer credential");
                Some(session.token)
            }
            Err(_) => {
                tracing::warn!(url = %request.url, "session token is not a valid header value; sending without it");
                None
            }
        }
    }

    fn invalidate_session(&self, url: &str, sent_token: Option<&str>, failure: &HttpFailure) {
        match self.store.clear_rejected_session(sent_token) {
            Ok(false) => {
                tracing::debug!(status = failure.status, %url, "rejected credential is no longer current; keeping session");
                return;
            }
            Ok(true) => {
                tracing::warn!(status = failure.status, %url, "api rejected credentials; session cleared");
            }
            Err(e) => {
                tracing::warn!(status = failure.status, %url, error = %e, "api rejected credentials; failed to remove session from storage");
            }
        }
        self.navigator.navigate(Route::Login);
    }
}

#[async_trait::async_trait]
impl<T: HttpTransport> HttpTransport for AuthInterceptor<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, HttpFailure> {
        if !self.targets_api(&request.url) {
            return self.inner.send(request).await;
        }

        let sent_token = self.attach_credentials(&mut request);
        let url = request.url.clone();
        let result = self.inner.send(request).await;
        if let Err(failure) = &result {
            if failure.is_auth_rejection() && !self.is_auth_endpoint(&url) {
                self.invalidate_session(&url, sent_token.as_deref(), failure);
            }
        }
        result
    }
}
