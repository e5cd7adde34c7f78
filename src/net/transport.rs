//! Outgoing HTTP pipeline.
//!
//! DESIGN
//! ======
//! `HttpTransport` is the seam every API call goes through. Layers such as
//! `AuthInterceptor` implement it by wrapping another transport, and tests
//! substitute scripted transports. A non-2xx status is reported as
//! `Err(HttpFailure)` so layers can observe failures without inspecting
//! successful responses.

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ClassifiedError, HttpFailure, ResponseBody};
use crate::config::Timeouts;

const UNEXPECTED_RESPONSE: &str = "Unexpected response from the server.";

/// A request travelling down the pipeline.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self { method, url: url.into(), headers, body: None }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).with_json(body)
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(body);
        self
    }

    /// Header value as a string, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Body as JSON, whether it arrived with a JSON content type or as text.
    #[must_use]
    pub fn json_value(&self) -> Option<Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value.clone()),
            ResponseBody::Text(text) => serde_json::from_str(text).ok(),
            ResponseBody::Absent => None,
        }
    }

    /// Decode the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns an `Unknown`-kind [`ClassifiedError`] when the body is missing
    /// or does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ClassifiedError> {
        self.json_value()
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or_else(|| ClassifiedError::unexpected_response(self.status, self.body.clone(), UNEXPECTED_RESPONSE))
    }
}

/// One stage of the outgoing request pipeline.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpFailure`] for non-2xx statuses, and one with status 0
    /// when no response was received.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpFailure>;
}

#[async_trait::async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpFailure> {
        (**self).send(request).await
    }
}

// =============================================================================
// REQWEST
// =============================================================================

/// Terminal pipeline stage backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(timeouts: Timeouts) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpFailure> {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpFailure::unreachable(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let raw = response
            .text()
            .await
            .map_err(|e| HttpFailure::unreachable(e.to_string()))?;
        let body = ResponseBody::from_raw(content_type.as_deref(), raw);

        if (200..300).contains(&status) {
            Ok(ApiResponse { status, body })
        } else {
            Err(HttpFailure::new(status, body))
        }
    }
}
