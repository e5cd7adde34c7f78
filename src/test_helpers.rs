//! Shared fakes for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::nav::{Navigator, Route};
use crate::net::error::{HttpFailure, ResponseBody};
use crate::net::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::session::{MemoryStorage, SessionStore, SessionUser, UserId};

/// Transport that replays queued results and records every request it sees.
/// An empty queue answers `200` with no body.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, HttpFailure>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<ApiResponse, HttpFailure>>) -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(responses.into()), requests: Mutex::default() })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpFailure> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ApiResponse { status: 200, body: ResponseBody::Absent }))
    }
}

/// Navigator that remembers every route it was asked for.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

pub fn json_ok(value: Value) -> Result<ApiResponse, HttpFailure> {
    Ok(ApiResponse { status: 200, body: ResponseBody::Json(value) })
}

pub fn text_ok(text: &str) -> Result<ApiResponse, HttpFailure> {
    Ok(ApiResponse { status: 200, body: ResponseBody::Text(text.to_owned()) })
}

pub fn fail(status: u16, body: ResponseBody) -> Result<ApiResponse, HttpFailure> {
    Err(HttpFailure::new(status, body))
}

pub fn memory_store() -> (Arc<MemoryStorage>, Arc<SessionStore>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(SessionStore::new(storage.clone()));
    (storage, store)
}

pub fn user(id: i64, email: &str) -> SessionUser {
    SessionUser { user_id: UserId::Number(id), email: email.to_owned() }
}
